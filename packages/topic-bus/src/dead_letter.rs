//! Dead-letter log for messages a handler dropped without acting on them.
//!
//! A handler that receives a payload it cannot use (missing context fields,
//! unknown job) records it here instead of publishing or writing state.
//! The log keeps the most recent entries only.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::core::CorrelationId;

/// Default number of entries retained.
const DEFAULT_RETAINED: usize = 1000;

/// A message dropped by a handler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub topic: String,
    pub payload: serde_json::Value,
    pub reason: String,
    pub cid: CorrelationId,
    pub recorded_at: DateTime<Utc>,
}

/// Shared, bounded, in-memory dead-letter log.
#[derive(Clone)]
pub struct DeadLetterLog {
    entries: Arc<Mutex<VecDeque<DeadLetter>>>,
    retained: usize,
}

impl DeadLetterLog {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETAINED)
    }

    pub fn with_retention(retained: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            retained: retained.max(1),
        }
    }

    /// Record a dropped message.
    pub fn record(
        &self,
        topic: &str,
        payload: serde_json::Value,
        reason: impl Into<String>,
        cid: CorrelationId,
    ) {
        let reason = reason.into();
        warn!(topic = %topic, cid = %cid, reason = %reason, "message dead-lettered");

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.retained {
            entries.pop_front();
        }
        entries.push_back(DeadLetter {
            topic: topic.to_string(),
            payload,
            reason,
            cid,
            recorded_at: Utc::now(),
        });
    }

    /// Snapshot of the retained entries, oldest first.
    pub fn entries(&self) -> Vec<DeadLetter> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Entries recorded for a topic.
    pub fn for_topic(&self, topic: &str) -> Vec<DeadLetter> {
        self.entries()
            .into_iter()
            .filter(|d| d.topic == topic)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DeadLetterLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeadLetterLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadLetterLog")
            .field("len", &self.len())
            .field("retained", &self.retained)
            .finish()
    }
}
