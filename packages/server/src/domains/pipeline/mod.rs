//! Title enhancement pipeline.
//!
//! ```text
//! submit ─► ResolveChannel ─► channel.resolved ─► FetchItems ─► fetched.items
//!                │                                    │
//!                ▼                                    ▼
//!          channel.error                     fetched.items.error
//!
//! fetched.items ─► EnhanceContent ─► enhanced.content ─► Notify ─► email.sent
//!                       │
//!                       ▼
//!             enhanced.content.error
//!
//! *.error ─► ErrorNotifier ─► error.notified
//! ```

pub mod actions;
pub mod effects;
pub mod payloads;
pub mod stage;
pub mod topics;

pub use actions::{submit_job, SubmitError, Submission};
pub use effects::register_pipeline;
pub use stage::{run_stage, Stage, StageOutcome};
