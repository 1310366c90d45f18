//! YouTube Data API v3 response types.
//!
//! Only the fields the client reads are modelled; everything else in the
//! API responses is ignored.

use serde::Deserialize;

// =============================================================================
// Public results
// =============================================================================

/// A channel found through `search?type=channel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSearchHit {
    pub channel_id: String,
    pub channel_title: String,
}

/// A channel returned by `channels?forUsername=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub id: String,
    pub title: String,
}

/// A video returned by `search?type=video&order=date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSummary {
    pub video_id: String,
    pub title: String,
    /// RFC 3339 publish timestamp as reported by the API
    pub published_at: String,
    /// "high" thumbnail URL, empty when the API omits it
    pub thumbnail: String,
}

impl VideoSummary {
    /// Public watch URL for the video.
    pub fn watch_url(&self) -> String {
        watch_url(&self.video_id)
    }
}

/// Public watch URL for a video ID.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

// =============================================================================
// Raw API shapes (internal)
// =============================================================================

/// Envelope shared by list endpoints. `items` is absent when nothing matched.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchItem {
    #[serde(default)]
    pub id: SearchItemId,
    pub snippet: SearchSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchItemId {
    pub channel_id: Option<String>,
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchSnippet {
    pub channel_id: Option<String>,
    pub channel_title: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Thumbnails {
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelItem {
    pub id: String,
    pub snippet: ChannelSnippet,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelSnippet {
    #[serde(default)]
    pub title: String,
}

/// Error envelope: `{"error": {"code": 403, "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_items_is_empty_list() {
        let list: ListResponse<ChannelItem> =
            serde_json::from_value(json!({"kind": "youtube#channelListResponse"})).unwrap();
        assert!(list.items.is_empty());
    }

    #[test]
    fn test_video_search_item_without_thumbnails() {
        let item: SearchItem = serde_json::from_value(json!({
            "id": {"kind": "youtube#video", "videoId": "abc"},
            "snippet": {"title": "T", "publishedAt": "2024-01-01T00:00:00Z"}
        }))
        .unwrap();

        assert_eq!(item.id.video_id.as_deref(), Some("abc"));
        assert!(item.snippet.thumbnails.high.is_none());
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("dQw4w9WgXcQ"), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }
}
