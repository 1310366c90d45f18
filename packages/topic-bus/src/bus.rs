//! Broadcast channel carrying every published message.
//!
//! # Guarantees
//!
//! - **At-most-once delivery**: Slow receivers may miss messages
//! - **In-memory only**: Messages are not persisted
//! - **No replay**: Lagged receivers get `RecvError::Lagged`
//!
//! Durable progress lives in the job store, not on the bus.

use tokio::sync::broadcast;

use crate::core::{CorrelationId, Envelope, Message};

/// Default channel capacity for the event bus.
const DEFAULT_CAPACITY: usize = 10000;

/// Broadcast bus for topic-addressed messages.
///
/// The bus itself does not route by topic: every receiver sees every
/// envelope. Topic routing is done by the [`Engine`](crate::Engine) that
/// owns the subscription table.
///
/// # Example
///
/// ```ignore
/// let bus = EventBus::new();
/// let mut receiver = bus.subscribe();
///
/// bus.publish("submit", json!({"jobId": "abc"}));
///
/// let envelope = receiver.recv().await?;
/// assert_eq!(envelope.topic(), "submit");
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Envelope>,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with the specified capacity.
    ///
    /// The capacity determines how many messages can be buffered before
    /// slow receivers start lagging.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a message with a fresh correlation ID (fire-and-forget).
    ///
    /// Returns the number of receivers. Zero receivers is a no-op.
    pub fn publish(&self, topic: impl Into<String>, payload: serde_json::Value) -> usize {
        self.publish_with_correlation(topic, payload, CorrelationId::new())
    }

    /// Publish a message with a specific correlation ID.
    ///
    /// Returns the number of receivers.
    pub fn publish_with_correlation(
        &self,
        topic: impl Into<String>,
        payload: serde_json::Value,
        cid: CorrelationId,
    ) -> usize {
        self.publish_envelope(Envelope::new(cid, Message::new(topic, payload)))
    }

    /// Publish an envelope directly.
    pub fn publish_envelope(&self, envelope: Envelope) -> usize {
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to every message published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    /// Returns the number of active receivers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
