pub mod job;
pub mod status;

pub use job::*;
pub use status::*;
