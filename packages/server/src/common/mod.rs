// Common types and utilities shared across the application

pub mod validation;

pub use validation::{is_valid_email, FieldErrors};
