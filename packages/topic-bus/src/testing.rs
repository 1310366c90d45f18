//! Testing utilities for topic bus pipelines.
//!
//! # Feature Flag
//!
//! This module is only available with the `testing` feature:
//!
//! ```toml
//! [dev-dependencies]
//! topic-bus = { path = "../topic-bus", features = ["testing"] }
//! ```
//!
//! # Recording what was published
//!
//! ```ignore
//! use topic_bus::testing::RecordingTap;
//!
//! let tap = RecordingTap::new();
//! let handle = EngineBuilder::new(deps)
//!     .with_tap(tap.clone())
//!     .build()
//!     .start();
//!
//! handle.publish_and_settle("submit", payload).await?;
//!
//! assert_eq!(tap.topics(), vec!["submit", "channel.resolved"]);
//! ```
//!
//! Taps run before handlers are spawned, so once `publish_and_settle`
//! returns every message in the cascade has been recorded.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::core::{CorrelationId, Message};
use crate::tap::{MessageTap, TapContext};

// =============================================================================
// Recorded Message
// =============================================================================

/// A message captured by [`RecordingTap`].
#[derive(Debug, Clone)]
pub struct RecordedMessage {
    pub topic: String,
    pub payload: serde_json::Value,
    pub cid: CorrelationId,
}

// =============================================================================
// Recording Tap
// =============================================================================

/// Tap that keeps every routed message in arrival order.
#[derive(Default)]
pub struct RecordingTap {
    messages: Mutex<Vec<RecordedMessage>>,
    notify: Notify,
}

impl RecordingTap {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All recorded messages, oldest first.
    pub fn messages(&self) -> Vec<RecordedMessage> {
        self.lock().clone()
    }

    /// Topics of all recorded messages, oldest first.
    pub fn topics(&self) -> Vec<String> {
        self.lock().iter().map(|m| m.topic.clone()).collect()
    }

    /// Recorded messages on a single topic.
    pub fn on_topic(&self, topic: &str) -> Vec<RecordedMessage> {
        self.lock()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Number of messages recorded on a topic.
    pub fn count(&self, topic: &str) -> usize {
        self.lock().iter().filter(|m| m.topic == topic).count()
    }

    /// Whether anything was published on a topic.
    pub fn saw(&self, topic: &str) -> bool {
        self.count(topic) > 0
    }

    /// Wait until at least `n` messages have been recorded on `topic`.
    ///
    /// Wrap in `tokio::time::timeout` for tests that could hang.
    pub async fn wait_for(&self, topic: &str, n: usize) {
        loop {
            // Register for notification BEFORE checking
            let notified = self.notify.notified();

            if self.count(topic) >= n {
                return;
            }

            notified.await;
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedMessage>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl MessageTap for Arc<RecordingTap> {
    async fn on_message(&self, message: &Message, ctx: &TapContext) -> Result<()> {
        self.lock().push(RecordedMessage {
            topic: message.topic.clone(),
            payload: message.payload.clone(),
            cid: ctx.correlation_id,
        });
        self.notify.notify_waiters();
        Ok(())
    }
}
