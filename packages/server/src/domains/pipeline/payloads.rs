//! Typed payloads for every pipeline topic.
//!
//! Inbound payloads are untrusted JSON. Each payload type reads its fields
//! one by one and reports every required field that is absent, empty or of
//! the wrong shape, instead of failing on the first one.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domains::jobs::{EnhancedTitle, VideoItem};

/// Channel name used when a payload carries none.
pub const FALLBACK_CHANNEL_NAME: &str = "your channel";

/// Required fields that were missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing or invalid fields: {}", .0.join(", "))]
pub struct MissingFields(pub Vec<&'static str>);

/// Validated construction from an untrusted payload.
pub trait FromPayload: Sized {
    fn from_payload(payload: &Value) -> Result<Self, MissingFields>;
}

// =============================================================================
// Field reader
// =============================================================================

/// Reads fields from a payload, collecting the names of the bad ones.
struct Fields<'a> {
    payload: &'a Value,
    missing: Vec<&'static str>,
}

impl<'a> Fields<'a> {
    fn new(payload: &'a Value) -> Self {
        Self {
            payload,
            missing: Vec::new(),
        }
    }

    /// Required non-blank string.
    fn string(&mut self, key: &'static str) -> String {
        match self.optional_string(key) {
            Some(value) => value,
            None => {
                self.missing.push(key);
                String::new()
            }
        }
    }

    fn optional_string(&self, key: &str) -> Option<String> {
        self.payload
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    }

    /// Required non-empty list.
    fn list<T: DeserializeOwned>(&mut self, key: &'static str) -> Vec<T> {
        let parsed = self
            .payload
            .get(key)
            .filter(|v| v.is_array())
            .and_then(|v| serde_json::from_value::<Vec<T>>(v.clone()).ok())
            .filter(|list| !list.is_empty());

        match parsed {
            Some(list) => list,
            None => {
                self.missing.push(key);
                Vec::new()
            }
        }
    }

    fn finish<T>(self, value: T) -> Result<T, MissingFields> {
        if self.missing.is_empty() {
            Ok(value)
        } else {
            Err(MissingFields(self.missing))
        }
    }
}

// =============================================================================
// Stage inputs and outputs
// =============================================================================

/// `submit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPayload {
    pub job_id: String,
    pub channel: String,
    pub email: String,
}

impl FromPayload for SubmitPayload {
    fn from_payload(payload: &Value) -> Result<Self, MissingFields> {
        let mut fields = Fields::new(payload);
        let value = Self {
            job_id: fields.string("jobId"),
            channel: fields.string("channel"),
            email: fields.string("email"),
        };
        fields.finish(value)
    }
}

/// `channel.resolved`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResolvedPayload {
    pub job_id: String,
    pub email: String,
    pub channel_id: String,
    pub channel_title: String,
}

impl FromPayload for ChannelResolvedPayload {
    fn from_payload(payload: &Value) -> Result<Self, MissingFields> {
        let mut fields = Fields::new(payload);
        let value = Self {
            job_id: fields.string("jobId"),
            email: fields.string("email"),
            channel_id: fields.string("channelId"),
            channel_title: fields.string("channelTitle"),
        };
        fields.finish(value)
    }
}

/// `fetched.items`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedItemsPayload {
    pub job_id: String,
    pub email: String,
    pub channel_id: String,
    pub channel_name: String,
    pub items: Vec<VideoItem>,
}

impl FromPayload for FetchedItemsPayload {
    fn from_payload(payload: &Value) -> Result<Self, MissingFields> {
        let mut fields = Fields::new(payload);
        let value = Self {
            job_id: fields.string("jobId"),
            email: fields.string("email"),
            // Only carried through to the failure context
            channel_id: fields.optional_string("channelId").unwrap_or_default(),
            channel_name: fields.string("channelName"),
            items: fields.list("items"),
        };
        fields.finish(value)
    }
}

/// `enhanced.content`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedContentPayload {
    pub job_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    pub enhanced_items: Vec<EnhancedTitle>,
}

impl EnhancedContentPayload {
    pub fn channel_name_or_fallback(&self) -> &str {
        self.channel_name.as_deref().unwrap_or(FALLBACK_CHANNEL_NAME)
    }
}

impl FromPayload for EnhancedContentPayload {
    fn from_payload(payload: &Value) -> Result<Self, MissingFields> {
        let mut fields = Fields::new(payload);
        let value = Self {
            job_id: fields.string("jobId"),
            email: fields.string("email"),
            channel_name: fields.optional_string("channelName"),
            enhanced_items: fields.list("enhancedItems"),
        };
        fields.finish(value)
    }
}

/// `email.sent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSentPayload {
    pub job_id: String,
    pub email: String,
    pub notification_id: String,
}

// =============================================================================
// Error topics
// =============================================================================

/// Payload of `channel.error`, `fetched.items.error` and
/// `enhanced.content.error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageErrorPayload {
    pub job_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageErrorPayload {
    pub fn new(job_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn channel_name(mut self, channel_name: impl Into<String>) -> Self {
        self.channel_name = Some(channel_name.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Best name for the channel: `channelName`, then `channel`, then a
    /// generic fallback.
    pub fn display_channel(&self) -> &str {
        self.channel_name
            .as_deref()
            .or(self.channel.as_deref())
            .unwrap_or(FALLBACK_CHANNEL_NAME)
    }
}

impl FromPayload for StageErrorPayload {
    fn from_payload(payload: &Value) -> Result<Self, MissingFields> {
        let mut fields = Fields::new(payload);
        let value = Self {
            job_id: fields.string("jobId"),
            email: fields.string("email"),
            channel: fields.optional_string("channel"),
            channel_id: fields.optional_string("channelId"),
            channel_name: fields.optional_string("channelName"),
            error: fields.optional_string("error"),
        };
        fields.finish(value)
    }
}

/// `error.notified`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotifiedPayload {
    pub job_id: String,
    pub email: String,
    pub channel_name: String,
    pub notification_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submit_payload_reports_every_missing_field() {
        let err = SubmitPayload::from_payload(&json!({"channel": "@chan"})).unwrap_err();
        assert_eq!(err, MissingFields(vec!["jobId", "email"]));
        assert_eq!(err.to_string(), "missing or invalid fields: jobId, email");
    }

    #[test]
    fn test_blank_and_mistyped_strings_count_as_missing() {
        let err = ChannelResolvedPayload::from_payload(&json!({
            "jobId": "j1",
            "email": "   ",
            "channelId": 42,
            "channelTitle": "Chan"
        }))
        .unwrap_err();

        assert_eq!(err.0, vec!["email", "channelId"]);
    }

    #[test]
    fn test_non_object_payload() {
        let err = SubmitPayload::from_payload(&json!("not an object")).unwrap_err();
        assert_eq!(err.0.len(), 3);
    }

    #[test]
    fn test_fetched_items_requires_non_empty_items() {
        let payload = json!({
            "jobId": "j1",
            "email": "a@b.co",
            "channelId": "UC1",
            "channelName": "Chan",
            "items": []
        });

        let err = FetchedItemsPayload::from_payload(&payload).unwrap_err();
        assert_eq!(err.0, vec!["items"]);
    }

    #[test]
    fn test_fetched_items_rejects_malformed_items() {
        let payload = json!({
            "jobId": "j1",
            "email": "a@b.co",
            "channelName": "Chan",
            "items": [{"title": "no id"}]
        });

        let err = FetchedItemsPayload::from_payload(&payload).unwrap_err();
        assert_eq!(err.0, vec!["items"]);
    }

    #[test]
    fn test_enhanced_content_channel_name_is_optional() {
        let payload = json!({
            "jobId": "j1",
            "email": "a@b.co",
            "enhancedItems": [{
                "original": "a",
                "improved": "b",
                "rationale": "c",
                "url": "https://www.youtube.com/watch?v=1"
            }]
        });

        let parsed = EnhancedContentPayload::from_payload(&payload).unwrap();
        assert_eq!(parsed.channel_name, None);
        assert_eq!(parsed.channel_name_or_fallback(), "your channel");
    }

    #[test]
    fn test_error_payload_display_channel_preference() {
        let base = StageErrorPayload::new("j1", "a@b.co");
        assert_eq!(base.display_channel(), "your channel");

        let with_channel = base.clone().channel("@chan");
        assert_eq!(with_channel.display_channel(), "@chan");

        let with_name = with_channel.channel_name("The Channel");
        assert_eq!(with_name.display_channel(), "The Channel");
    }

    #[test]
    fn test_error_payload_serializes_only_present_fields() {
        let payload = StageErrorPayload::new("j1", "a@b.co")
            .channel("@chan")
            .error("boom");

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"jobId": "j1", "email": "a@b.co", "channel": "@chan", "error": "boom"})
        );
    }
}
