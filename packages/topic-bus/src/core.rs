//! Core transport types for the topic bus.
//!
//! A [`Message`] is a topic name plus a JSON payload. It travels inside an
//! [`Envelope`] that carries a [`CorrelationId`] so that all work triggered
//! by one publish can be tracked and awaited.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID for tracking related messages.
///
/// Every publish from outside the engine generates a fresh correlation ID.
/// Handlers that publish while processing a message propagate the ID of the
/// message they are handling, so the whole cascade shares one ID.
///
/// # Example
///
/// ```ignore
/// use topic_bus::CorrelationId;
///
/// let cid = CorrelationId::new();
/// assert!(cid.is_some());
/// assert!(CorrelationId::NONE.is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Sentinel value for uncorrelated messages.
    ///
    /// Uses nil UUID (`00000000-0000-0000-0000-000000000000`).
    pub const NONE: Self = Self(Uuid::nil());

    /// Create a new random correlation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Check if this is the NONE sentinel value.
    pub fn is_none(&self) -> bool {
        self.0.is_nil()
    }

    /// Check if this is a real correlation ID (not NONE).
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Get the inner UUID value.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A published message: a topic name and its payload.
///
/// Payloads are plain JSON objects. Subscribers must treat them as untrusted
/// and validate the fields they need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub topic: String,
    pub payload: serde_json::Value,
    pub published_at: DateTime<Utc>,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
            published_at: Utc::now(),
        }
    }

    /// Read a string field from the payload, if present and a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

/// Envelope wrapping a message with correlation metadata.
///
/// The message is shared behind an `Arc` so that fanning out to many
/// subscribers does not copy the payload per receiver.
#[derive(Clone)]
pub struct Envelope {
    /// Correlation ID for tracking related work
    pub cid: CorrelationId,
    /// The message itself
    pub message: Arc<Message>,
}

impl Envelope {
    pub fn new(cid: CorrelationId, message: Message) -> Self {
        Self {
            cid,
            message: Arc::new(message),
        }
    }

    pub fn topic(&self) -> &str {
        &self.message.topic
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("cid", &self.cid)
            .field("topic", &self.message.topic)
            .finish_non_exhaustive()
    }
}
