//! Key-value job store.
//!
//! Records are opaque JSON objects addressed by `(collection, id)`. The store
//! has no schema knowledge; the typed layer lives in
//! `domains::jobs::models::Job`.
//!
//! A `set` overwrites the whole record. There are no cross-key transactions
//! and no expiry.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

/// Collection holding job records.
pub const JOB_COLLECTION: &str = "job";

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch a record, `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Store a record, replacing any previous value.
    async fn set(&self, collection: &str, id: &str, record: Value) -> Result<()>;
}

/// In-memory store backed by a concurrent map.
///
/// Cloneable; clones share the same map.
#[derive(Clone, Default)]
pub struct InMemoryJobStore {
    records: Arc<DashMap<(String, String), Value>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all collections.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .records
            .get(&(collection.to_string(), id.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn set(&self, collection: &str, id: &str, record: Value) -> Result<()> {
        self.records
            .insert((collection.to_string(), id.to_string()), record);
        Ok(())
    }
}
