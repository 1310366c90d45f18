//! Engine - routes published messages to topic subscribers.
//!
//! ```text
//! publish(topic) ─► EventBus ─► dispatch loop ─► taps
//!        ▲                            │
//!        │                            ├─► handler A (task)
//!        │                            └─► handler B (task)
//!        │                                    │
//!        └──────── ctx.publish(topic) ◄───────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use topic_bus::EngineBuilder;
//!
//! let handle = EngineBuilder::new(deps)
//!     .subscribe("submit", |message, ctx| async move {
//!         ctx.publish("submitted", message.payload);
//!         Ok(())
//!     })
//!     .build()
//!     .start();
//!
//! // Fire-and-forget
//! let cid = handle.publish("submit", json!({"jobId": "abc"}));
//!
//! // Or wait until every cascading handler has finished
//! handle.publish_and_settle("submit", json!({"jobId": "abc"})).await?;
//! ```
//!
//! # Ordering
//!
//! Messages are routed in the order the dispatch loop receives them.
//! Handlers run as independent tasks, so handlers for the same message (or
//! for different topics) complete in no particular order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bus::EventBus;
use crate::core::{CorrelationId, Envelope, Message};
use crate::dead_letter::DeadLetterLog;
use crate::error::BusError;
use crate::handler::{Handler, HandlerContext};
use crate::pending::{PendingGuard, PendingWork};
use crate::tap::{MessageTap, TapContext};

/// Default time `publish_and_settle` waits for a cascade to finish.
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

type ErrorHook = Arc<dyn Fn(&anyhow::Error, &Message) + Send + Sync>;

// =============================================================================
// Engine
// =============================================================================

/// A configured, not yet running, engine.
pub struct Engine<D> {
    deps: Arc<D>,
    bus: EventBus,
    pending: Arc<PendingWork>,
    dead_letters: DeadLetterLog,
    routes: HashMap<String, Vec<Arc<dyn Handler<D>>>>,
    taps: Vec<Arc<dyn MessageTap>>,
    on_error: Option<ErrorHook>,
}

impl<D: Send + Sync + 'static> Engine<D> {
    pub fn builder(deps: D) -> EngineBuilder<D> {
        EngineBuilder::new(deps)
    }

    /// Topics with at least one handler.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        topics.sort_unstable();
        topics
    }

    /// Start the dispatch loop in the background.
    pub fn start(self) -> EngineHandle<D> {
        info!(
            topics = self.routes.len(),
            taps = self.taps.len(),
            "starting topic bus engine"
        );

        // Subscribe before spawning so nothing published after start() is missed
        let receiver = self.bus.subscribe();

        EngineHandle {
            deps: self.deps.clone(),
            bus: self.bus.clone(),
            pending: self.pending.clone(),
            dead_letters: self.dead_letters.clone(),
            task: Arc::new(tokio::spawn(Dispatcher::from(self).run(receiver))),
        }
    }
}

// =============================================================================
// Dispatch loop
// =============================================================================

struct Dispatcher<D> {
    deps: Arc<D>,
    bus: EventBus,
    pending: Arc<PendingWork>,
    dead_letters: DeadLetterLog,
    routes: HashMap<String, Vec<Arc<dyn Handler<D>>>>,
    taps: Vec<Arc<dyn MessageTap>>,
    on_error: Option<ErrorHook>,
}

impl<D> From<Engine<D>> for Dispatcher<D> {
    fn from(engine: Engine<D>) -> Self {
        Self {
            deps: engine.deps,
            bus: engine.bus,
            pending: engine.pending,
            dead_letters: engine.dead_letters,
            routes: engine.routes,
            taps: engine.taps,
            on_error: engine.on_error,
        }
    }
}

impl<D: Send + Sync + 'static> Dispatcher<D> {
    async fn run(self, mut receiver: Receiver<Envelope>) {
        loop {
            match receiver.recv().await {
                Ok(envelope) => self.route(envelope).await,
                Err(RecvError::Lagged(n)) => {
                    warn!(missed = n, "event bus lagged, missed messages");
                }
                Err(RecvError::Closed) => {
                    info!("event bus closed, dispatch loop shutting down");
                    break;
                }
            }
        }
    }

    async fn route(&self, envelope: Envelope) {
        let cid = envelope.cid;
        let message = envelope.message;

        // Releases the message's own count once routing is done. Messages
        // published straight onto the bus were never counted, so skip them.
        let _message_guard = self
            .pending
            .is_pending(cid)
            .then(|| PendingGuard::new(self.pending.clone(), cid));

        for tap in &self.taps {
            if let Err(e) = tap.on_message(&message, &TapContext::new(cid)).await {
                warn!(topic = %message.topic, error = %e, "tap failed");
            }
        }

        let Some(handlers) = self.routes.get(&message.topic) else {
            debug!(topic = %message.topic, "no subscribers, dropping message");
            return;
        };

        // Count every handler before the message guard releases
        self.pending.add(cid, handlers.len());

        for handler in handlers {
            let handler = handler.clone();
            let pending = self.pending.clone();
            let on_error = self.on_error.clone();
            let message = (*message).clone();
            let ctx = HandlerContext::new(
                self.deps.clone(),
                self.bus.clone(),
                self.pending.clone(),
                self.dead_letters.clone(),
                message.topic.clone(),
                cid,
            );

            tokio::spawn(async move {
                let _guard = PendingGuard::new(pending, cid);
                let observed = message.clone();

                if let Err(e) = handler.call(message, ctx).await {
                    error!(topic = %observed.topic, cid = %cid, error = %e, "handler failed");
                    if let Some(hook) = on_error {
                        hook(&e, &observed);
                    }
                }
            });
        }
    }
}

// =============================================================================
// Engine Handle
// =============================================================================

/// Handle to a running engine.
///
/// - `publish()`: fire-and-forget, returns the correlation ID.
/// - `publish_and_settle()`: waits until every handler triggered by the
///   message (directly or through follow-up publishes) has finished.
pub struct EngineHandle<D> {
    deps: Arc<D>,
    bus: EventBus,
    pending: Arc<PendingWork>,
    dead_letters: DeadLetterLog,
    task: Arc<JoinHandle<()>>,
}

impl<D> Clone for EngineHandle<D> {
    fn clone(&self) -> Self {
        Self {
            deps: self.deps.clone(),
            bus: self.bus.clone(),
            pending: self.pending.clone(),
            dead_letters: self.dead_letters.clone(),
            task: self.task.clone(),
        }
    }
}

impl<D> EngineHandle<D> {
    pub fn deps(&self) -> &D {
        &self.deps
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn pending(&self) -> &Arc<PendingWork> {
        &self.pending
    }

    pub fn dead_letters(&self) -> &DeadLetterLog {
        &self.dead_letters
    }

    /// Publish a message with a fresh correlation ID.
    pub fn publish(&self, topic: &str, payload: serde_json::Value) -> CorrelationId {
        let cid = CorrelationId::new();
        self.publish_with_correlation(topic, payload, cid);
        cid
    }

    fn publish_with_correlation(&self, topic: &str, payload: serde_json::Value, cid: CorrelationId) {
        // Increment before send so the dispatch loop can never see zero first
        self.pending.add(cid, 1);
        if self.bus.publish_with_correlation(topic, payload, cid) == 0 {
            self.pending.complete(cid, 1);
        }
    }

    /// Wait for a previously published correlation to settle.
    ///
    /// Settling means every handler has finished, whatever it returned.
    /// Handler errors go to the `on_error` hook.
    pub async fn settled(&self, cid: CorrelationId) -> Result<()> {
        self.settled_timeout(cid, DEFAULT_SETTLE_TIMEOUT).await
    }

    pub async fn settled_timeout(&self, cid: CorrelationId, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.pending.drained(cid)).await {
            Ok(()) => Ok(()),
            Err(_) => {
                self.pending.forget(cid);
                Err(BusError::Timeout {
                    cid,
                    duration: timeout,
                }
                .into())
            }
        }
    }

    /// Publish and wait for the whole cascade to finish.
    ///
    /// Fails only when the cascade does not settle in time.
    pub async fn publish_and_settle(
        &self,
        topic: &str,
        payload: serde_json::Value,
    ) -> Result<CorrelationId> {
        let cid = self.publish(topic, payload);
        self.settled(cid).await?;
        Ok(cid)
    }

    /// Stop the dispatch loop. Used during test teardown.
    pub fn abort(&self) {
        self.task.abort();
    }
}

impl<D> std::fmt::Debug for EngineHandle<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("pending", &self.pending)
            .field("dead_letters", &self.dead_letters)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Engine Builder
// =============================================================================

/// Builder for an [`Engine`].
///
/// ```ignore
/// let engine = EngineBuilder::new(deps)
///     .subscribe("submit", resolve_channel)
///     .subscribe_all(&["a.error", "b.error"], notify_error)
///     .with_tap(TracingTap)
///     .on_error(|error, message| tracing::error!(%error, topic = %message.topic, "handler failed"))
///     .build();
/// ```
pub struct EngineBuilder<D> {
    deps: Arc<D>,
    bus: EventBus,
    pending: Arc<PendingWork>,
    dead_letters: DeadLetterLog,
    routes: HashMap<String, Vec<Arc<dyn Handler<D>>>>,
    taps: Vec<Arc<dyn MessageTap>>,
    on_error: Option<ErrorHook>,
}

impl<D: Send + Sync + 'static> EngineBuilder<D> {
    pub fn new(deps: D) -> Self {
        Self::with_arc(Arc::new(deps))
    }

    /// Use this when the deps are shared with other parts of the system.
    pub fn with_arc(deps: Arc<D>) -> Self {
        Self {
            deps,
            bus: EventBus::new(),
            pending: Arc::new(PendingWork::new()),
            dead_letters: DeadLetterLog::new(),
            routes: HashMap::new(),
            taps: Vec::new(),
            on_error: None,
        }
    }

    /// Use an existing event bus instead of creating a new one.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_dead_letters(mut self, dead_letters: DeadLetterLog) -> Self {
        self.dead_letters = dead_letters;
        self
    }

    /// Register a handler for a topic.
    ///
    /// A topic may have any number of handlers; each is invoked once per
    /// message.
    pub fn subscribe<H>(mut self, topic: impl Into<String>, handler: H) -> Self
    where
        H: Handler<D>,
    {
        self.routes
            .entry(topic.into())
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// Register one handler for several topics.
    pub fn subscribe_all<H>(mut self, topics: &[&str], handler: H) -> Self
    where
        H: Handler<D>,
    {
        let handler: Arc<dyn Handler<D>> = Arc::new(handler);
        for topic in topics {
            self.routes
                .entry((*topic).to_string())
                .or_default()
                .push(handler.clone());
        }
        self
    }

    /// Register a tap observing every routed message.
    pub fn with_tap<T: MessageTap>(mut self, tap: T) -> Self {
        self.taps.push(Arc::new(tap));
        self
    }

    /// Register a shared tap (useful when the caller keeps a reference).
    pub fn with_shared_tap(mut self, tap: Arc<dyn MessageTap>) -> Self {
        self.taps.push(tap);
        self
    }

    /// Hook invoked whenever a handler returns an error.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&anyhow::Error, &Message) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Engine<D> {
        Engine {
            deps: self.deps,
            bus: self.bus,
            pending: self.pending,
            dead_letters: self.dead_letters,
            routes: self.routes,
            taps: self.taps,
            on_error: self.on_error,
        }
    }
}
