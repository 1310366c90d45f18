use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::status::JobStatus;
use crate::kernel::job_store::{JobStore, JOB_COLLECTION};

/// A video as fetched from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub published_at: String,
    #[serde(default)]
    pub thumbnail: String,
}

/// An improved title, aligned with the input video at the same index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedTitle {
    pub original: String,
    pub improved: String,
    pub rationale: String,
    /// Watch URL of the source video
    pub url: String,
}

/// Job record - the shared state every pipeline stage reads and merge-writes.
///
/// Fields accumulate as the job moves through the pipeline and are never
/// pruned. Keys nobody here knows about are carried in `extra` so a typed
/// read-modify-write never drops them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub channel_requested: String,
    pub email: String,
    pub created_at: DateTime<Utc>,

    // Written by ResolveChannel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,

    // Written by FetchItems
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<VideoItem>>,

    // Written by EnhanceContent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_items: Option<Vec<EnhancedTitle>>,

    // Written by Notify
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobRecord {
    /// Fresh record as written at intake.
    pub fn queued(job_id: impl Into<String>, channel: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Queued,
            channel_requested: channel.into(),
            email: email.into(),
            created_at: Utc::now(),
            channel_id: None,
            channel_title: None,
            items: None,
            enhanced_items: None,
            notification_id: None,
            completed_at: None,
            error: None,
            extra: Map::new(),
        }
    }
}

// =============================================================================
// Patch
// =============================================================================

/// A partial update: only the keys present are overwritten.
///
/// ```ignore
/// let patch = JobPatch::status(JobStatus::ChannelResolved)
///     .channel("UC123", "Some Channel")
///     .clear_error();
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    fields: Map<String, Value>,
}

impl JobPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch starting with a status change.
    pub fn status(status: JobStatus) -> Self {
        Self::new().set("status", json!(status))
    }

    /// Set an arbitrary key.
    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn channel(self, channel_id: &str, channel_title: &str) -> Self {
        self.set("channelId", json!(channel_id))
            .set("channelTitle", json!(channel_title))
    }

    pub fn items(self, items: &[VideoItem]) -> Self {
        self.set("items", json!(items))
    }

    pub fn enhanced_items(self, enhanced: &[EnhancedTitle]) -> Self {
        self.set("enhancedItems", json!(enhanced))
    }

    pub fn notification_id(self, id: &str) -> Self {
        self.set("notificationId", json!(id))
    }

    pub fn completed_at(self, at: DateTime<Utc>) -> Self {
        self.set("completedAt", json!(at))
    }

    pub fn error(self, message: impl Into<String>) -> Self {
        self.set("error", Value::String(message.into()))
    }

    /// Write an explicit `null` error.
    pub fn clear_error(self) -> Self {
        self.set("error", Value::Null)
    }

    /// Status this patch moves the record to, if any.
    pub fn target_status(&self) -> Option<JobStatus> {
        self.fields
            .get("status")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Overwrite the patched keys in `record`, leaving every other key as is.
    pub fn apply_to(&self, record: &mut Map<String, Value>) {
        for (key, value) in &self.fields {
            record.insert(key.clone(), value.clone());
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {job_id} not found")]
    NotFound { job_id: String },

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("job {job_id} is unreadable: {reason}")]
    Corrupt { job_id: String, reason: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

// =============================================================================
// Store operations
// =============================================================================

/// Typed access to job records in a [`JobStore`].
pub struct Job;

impl Job {
    /// Write a new record.
    pub async fn create(record: &JobRecord, store: &dyn JobStore) -> anyhow::Result<()> {
        let value = serde_json::to_value(record).context("Failed to serialize job record")?;
        store
            .set(JOB_COLLECTION, &record.job_id, value)
            .await
            .with_context(|| format!("Failed to store job {}", record.job_id))
    }

    /// Stored record exactly as written, including unknown keys.
    pub async fn find_raw(job_id: &str, store: &dyn JobStore) -> anyhow::Result<Option<Value>> {
        store.get(JOB_COLLECTION, job_id).await
    }

    /// Typed view of a stored record.
    pub async fn find(job_id: &str, store: &dyn JobStore) -> Result<Option<JobRecord>, JobError> {
        let Some(raw) = Self::find_raw(job_id, store).await? else {
            return Ok(None);
        };

        serde_json::from_value(raw)
            .map(Some)
            .map_err(|e| JobError::Corrupt {
                job_id: job_id.to_string(),
                reason: e.to_string(),
            })
    }

    /// Read-merge-write: overwrite only the keys in `patch`.
    ///
    /// A status change is validated against the current status first; an
    /// invalid transition writes nothing. Applying the same patch twice
    /// yields the same record. Returns the merged record.
    pub async fn merge_write(
        job_id: &str,
        patch: &JobPatch,
        store: &dyn JobStore,
    ) -> Result<Value, JobError> {
        let current = Self::find_raw(job_id, store)
            .await?
            .ok_or_else(|| JobError::NotFound {
                job_id: job_id.to_string(),
            })?;

        let Value::Object(mut record) = current else {
            return Err(JobError::Corrupt {
                job_id: job_id.to_string(),
                reason: "record is not an object".to_string(),
            });
        };

        if let Some(to) = patch.target_status() {
            if let Some(from) = Self::current_status(job_id, &record)? {
                if !from.can_transition_to(to) {
                    return Err(JobError::InvalidTransition { from, to });
                }
            }
        }

        patch.apply_to(&mut record);
        let merged = Value::Object(record);

        store
            .set(JOB_COLLECTION, job_id, merged.clone())
            .await
            .with_context(|| format!("Failed to write job {}", job_id))?;

        Ok(merged)
    }

    fn current_status(
        job_id: &str,
        record: &Map<String, Value>,
    ) -> Result<Option<JobStatus>, JobError> {
        match record.get("status") {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|_| JobError::Corrupt {
                    job_id: job_id.to_string(),
                    reason: format!("unknown status {}", value),
                }),
        }
    }
}
