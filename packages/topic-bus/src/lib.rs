//! # Topic Bus
//!
//! An in-process, topic-addressed publish/subscribe engine. Handlers
//! subscribe to named topics; publishing a JSON payload on a topic invokes
//! every handler subscribed to it.
//!
//! ## Architecture
//!
//! ```text
//! Edge (HTTP)
//!     │
//!     ▼ publish()
//! EventBus ─────────────────────────────────────┐
//!     │                                         │
//!     ▼ subscribe()                             │
//! Dispatch loop                                 │
//!     │                                         │
//!     ├─► taps (observe only)                   │
//!     │                                         │
//!     ├─► handler for topic A ─► ctx.publish() ─┤
//!     │                                         │
//!     └─► handler for topic A ─► ctx.publish() ─┘
//! ```
//!
//! ## Guarantees
//!
//! - **At-most-once delivery**: Lagged receivers miss messages
//! - **In-memory only**: Messages are not persisted
//! - **Correlated cascades**: Follow-up messages published by a handler share
//!   the correlation ID of the message being handled, so callers can await
//!   the end of a cascade with [`EngineHandle::publish_and_settle`]
//! - **Visible drops**: Handlers record unusable messages in the
//!   [`DeadLetterLog`] instead of discarding them silently
//!
//! Durable workflow state belongs in the caller's own store.
//!
//! ## Example
//!
//! ```ignore
//! use topic_bus::{EngineBuilder, HandlerContext, Message};
//!
//! let handle = EngineBuilder::new(deps)
//!     .subscribe("submit", |message: Message, ctx: HandlerContext<Deps>| async move {
//!         ctx.publish("channel.resolved", message.payload);
//!         Ok(())
//!     })
//!     .build()
//!     .start();
//!
//! handle.publish("submit", json!({"jobId": "abc"}));
//! ```

mod bus;
mod core;
mod dead_letter;
mod engine;
mod error;
mod handler;
mod pending;
mod tap;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export transport types
pub use crate::core::{CorrelationId, Envelope, Message};

// Re-export bus types
pub use bus::EventBus;

// Re-export engine types (primary entry point)
pub use engine::{Engine, EngineBuilder, EngineHandle, DEFAULT_SETTLE_TIMEOUT};

// Re-export handler types
pub use handler::{Handler, HandlerContext};

// Re-export pending-work tracking
pub use pending::{PendingGuard, PendingWork};

// Re-export dead-letter types
pub use dead_letter::{DeadLetter, DeadLetterLog};

// Re-export tap types (message observation)
pub use tap::{MessageTap, TapContext, TracingTap};

// Re-export error types
pub use error::BusError;

// Re-export commonly used external types
pub use async_trait::async_trait;
