//! Message taps - observe every routed message without acting on it.
//!
//! | Role    | Can publish? | Can mutate deps? |
//! |---------|--------------|------------------|
//! | Handler | ✅           | ✅               |
//! | Tap     | ❌           | ❌               |
//!
//! Taps run in the dispatch loop **before** handlers are spawned, so by the
//! time a correlation settles every message it produced has been observed.
//! Keep them cheap; a slow tap delays routing.

use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::{CorrelationId, Message};

/// Context provided to taps.
pub struct TapContext {
    /// Correlation ID of the observed message.
    pub correlation_id: CorrelationId,
    /// When this tap execution started.
    pub timestamp: Instant,
}

impl TapContext {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            timestamp: Instant::now(),
        }
    }
}

/// Observer of routed messages.
///
/// Errors are logged but never affect routing.
#[async_trait]
pub trait MessageTap: Send + Sync + 'static {
    async fn on_message(&self, message: &Message, ctx: &TapContext) -> Result<()>;
}

/// Tap that logs each routed message at debug level.
pub struct TracingTap;

#[async_trait]
impl MessageTap for TracingTap {
    async fn on_message(&self, message: &Message, ctx: &TapContext) -> Result<()> {
        tracing::debug!(
            topic = %message.topic,
            cid = %ctx.correlation_id,
            job_id = message.str_field("jobId").unwrap_or("-"),
            "message routed"
        );
        Ok(())
    }
}
