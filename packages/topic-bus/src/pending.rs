//! Outstanding work per correlation ID.
//!
//! A correlation is pending while any of its messages are waiting to be
//! routed or any handler invocation it triggered is still running. Counts
//! live in a `watch` channel so settling is just waiting for the value to
//! read zero.
//!
//! Publishers increment before sending and the router counts every handler
//! before releasing the message itself, so a cascade never reads zero
//! while a descendant message is in flight.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::core::CorrelationId;

/// Pending-work counters keyed by correlation ID.
#[derive(Default)]
pub struct PendingWork {
    counts: DashMap<CorrelationId, watch::Sender<usize>>,
}

impl PendingWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` units of work to a correlation.
    pub fn add(&self, cid: CorrelationId, n: usize) {
        self.counts
            .entry(cid)
            .or_insert_with(|| watch::channel(0).0)
            .send_modify(|count| *count += n);
    }

    /// Complete `n` units of work. The entry goes away once nothing is left.
    pub fn complete(&self, cid: CorrelationId, n: usize) {
        let drained = match self.counts.get(&cid) {
            Some(count) => {
                count.send_modify(|count| *count = count.saturating_sub(n));
                *count.borrow() == 0
            }
            None => false,
        };

        if drained {
            self.counts.remove_if(&cid, |_, count| *count.borrow() == 0);
        }
    }

    /// Resolve once the correlation has no outstanding work.
    ///
    /// Returns immediately for correlations that were never counted or have
    /// already drained.
    pub async fn drained(&self, cid: CorrelationId) {
        let Some(mut receiver) = self.counts.get(&cid).map(|count| count.subscribe()) else {
            return;
        };
        // Closed means the entry was forgotten; nothing left to wait for
        let _ = receiver.wait_for(|count| *count == 0).await;
    }

    /// Stop tracking a correlation (after a timed-out wait).
    pub fn forget(&self, cid: CorrelationId) {
        self.counts.remove(&cid);
    }

    pub fn is_pending(&self, cid: CorrelationId) -> bool {
        self.counts
            .get(&cid)
            .map(|count| *count.borrow() > 0)
            .unwrap_or(false)
    }

    /// Number of correlations with outstanding work.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl std::fmt::Debug for PendingWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingWork")
            .field("correlations", &self.counts.len())
            .finish()
    }
}

/// Completes one unit of already-counted work when dropped, so a panicking
/// handler still releases its share.
pub struct PendingGuard {
    pending: Arc<PendingWork>,
    cid: CorrelationId,
}

impl PendingGuard {
    pub fn new(pending: Arc<PendingWork>, cid: CorrelationId) -> Self {
        Self { pending, cid }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.complete(self.cid, 1);
    }
}
