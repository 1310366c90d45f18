//! Handlers and the context passed to them.
//!
//! A handler is invoked once per message delivered on a topic it subscribed
//! to. It may publish follow-up messages through its [`HandlerContext`];
//! those carry the same correlation ID as the message being handled.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::bus::EventBus;
use crate::core::{CorrelationId, Message};
use crate::dead_letter::DeadLetterLog;
use crate::pending::PendingWork;

/// A subscriber to one or more topics.
///
/// Implemented automatically for async closures of the shape
/// `|message, ctx| async move { ... }`.
pub trait Handler<D>: Send + Sync + 'static {
    fn call(&self, message: Message, ctx: HandlerContext<D>) -> BoxFuture<'static, Result<()>>;
}

impl<D, F, Fut> Handler<D> for F
where
    D: Send + Sync + 'static,
    F: Fn(Message, HandlerContext<D>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn call(&self, message: Message, ctx: HandlerContext<D>) -> BoxFuture<'static, Result<()>> {
        (self)(message, ctx).boxed()
    }
}

/// Context passed to handlers.
///
/// Cheap to clone. Clones share the same correlation and dependencies.
pub struct HandlerContext<D> {
    deps: Arc<D>,
    bus: EventBus,
    pending: Arc<PendingWork>,
    dead_letters: DeadLetterLog,
    topic: String,
    cid: CorrelationId,
}

impl<D> Clone for HandlerContext<D> {
    fn clone(&self) -> Self {
        Self {
            deps: self.deps.clone(),
            bus: self.bus.clone(),
            pending: self.pending.clone(),
            dead_letters: self.dead_letters.clone(),
            topic: self.topic.clone(),
            cid: self.cid,
        }
    }
}

impl<D> HandlerContext<D> {
    pub(crate) fn new(
        deps: Arc<D>,
        bus: EventBus,
        pending: Arc<PendingWork>,
        dead_letters: DeadLetterLog,
        topic: String,
        cid: CorrelationId,
    ) -> Self {
        Self {
            deps,
            bus,
            pending,
            dead_letters,
            topic,
            cid,
        }
    }

    /// Shared dependencies.
    pub fn deps(&self) -> &D {
        &self.deps
    }

    /// Topic of the message being handled.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Correlation ID of the message being handled.
    pub fn correlation_id(&self) -> CorrelationId {
        self.cid
    }

    /// Publish a follow-up message with this handler's correlation ID.
    ///
    /// Pending work is counted before the send, so the cascade
    /// cannot be considered settled until the new message has been routed.
    /// Returns the number of bus receivers.
    pub fn publish(&self, topic: &str, payload: serde_json::Value) -> usize {
        self.pending.add(self.cid, 1);
        let receivers = self.bus.publish_with_correlation(topic, payload, self.cid);
        if receivers == 0 {
            // Nobody will route it
            self.pending.complete(self.cid, 1);
        }
        receivers
    }

    /// Record the current message as dropped.
    pub fn dead_letter(&self, payload: serde_json::Value, reason: impl Into<String>) {
        self.dead_letters
            .record(&self.topic, payload, reason, self.cid);
    }
}

impl<D> std::fmt::Debug for HandlerContext<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("topic", &self.topic)
            .field("cid", &self.cid)
            .finish_non_exhaustive()
    }
}
