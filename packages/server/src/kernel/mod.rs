//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod job_store;
pub mod test_dependencies;
pub mod traits;

/// Default chat model (served through Gemini's OpenAI-compatible endpoint).
pub const GEMINI_2_FLASH: &str = "gemini-2.0-flash";

pub use deps::{OpenAIAdapter, ResendAdapter, ServerDeps, YouTubeAdapter, DEFAULT_MAX_VIDEOS};
pub use job_store::{InMemoryJobStore, JobStore, JOB_COLLECTION};
pub use test_dependencies::TestDependencies;
pub use traits::*;
