//! Jobs domain - the shared job record and its status lifecycle

pub mod models;

pub use models::{EnhancedTitle, Job, JobError, JobPatch, JobRecord, JobStatus, VideoItem};
