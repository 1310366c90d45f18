//! Structured errors surfaced by the engine handle.

use std::time::Duration;

use thiserror::Error;

use crate::core::CorrelationId;

#[derive(Debug, Error)]
pub enum BusError {
    /// Work for a correlation did not settle in time.
    #[error("correlation {cid} did not settle within {duration:?}")]
    Timeout {
        cid: CorrelationId,
        duration: Duration,
    },
}
