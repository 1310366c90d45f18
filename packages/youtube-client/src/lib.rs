//! Minimal YouTube Data API v3 client
//!
//! Covers the three read-only lookups needed to go from a channel name to
//! its latest uploads:
//!
//! - [`YouTubeClient::search_channels`]: free-text channel search (handles)
//! - [`YouTubeClient::channels_by_username`]: legacy username lookup
//! - [`YouTubeClient::recent_videos`]: most recent videos of a channel
//!
//! # Example
//!
//! ```rust,ignore
//! use youtube_client::YouTubeClient;
//!
//! let client = YouTubeClient::new(api_key);
//! let hits = client.search_channels("mkbhd").await?;
//! let videos = client.recent_videos(&hits[0].channel_id, 20).await?;
//! ```

pub mod error;
pub mod types;

pub use error::{Result, YouTubeError};
pub use types::{watch_url, ChannelSearchHit, ChannelSummary, VideoSummary};

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{ApiErrorEnvelope, ChannelItem, ListResponse, SearchItem};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// The API caps `maxResults` at 50.
pub const MAX_RESULTS_LIMIT: u32 = 50;

/// YouTube Data API client.
#[derive(Clone)]
pub struct YouTubeClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from environment variable `YOUTUBE_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("YOUTUBE_API_KEY")
            .map_err(|_| YouTubeError::Config("YOUTUBE_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (tests, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search channels by free text, best match first.
    pub async fn search_channels(&self, query: &str) -> Result<Vec<ChannelSearchHit>> {
        let list: ListResponse<SearchItem> = self
            .get(
                "search",
                &[("part", "snippet"), ("type", "channel"), ("q", query)],
            )
            .await?;

        let hits = list
            .items
            .into_iter()
            .filter_map(|item| {
                let channel_id = item.snippet.channel_id.or(item.id.channel_id)?;
                Some(ChannelSearchHit {
                    channel_id,
                    channel_title: item.snippet.channel_title.unwrap_or_default(),
                })
            })
            .collect::<Vec<_>>();

        debug!(query = %query, hits = hits.len(), "channel search");
        Ok(hits)
    }

    /// Look up channels by legacy username.
    pub async fn channels_by_username(&self, username: &str) -> Result<Vec<ChannelSummary>> {
        let list: ListResponse<ChannelItem> = self
            .get("channels", &[("part", "snippet"), ("forUsername", username)])
            .await?;

        let channels = list
            .items
            .into_iter()
            .map(|item| ChannelSummary {
                id: item.id,
                title: item.snippet.title,
            })
            .collect::<Vec<_>>();

        debug!(username = %username, hits = channels.len(), "channel lookup by username");
        Ok(channels)
    }

    /// Most recent videos of a channel, newest first.
    ///
    /// `max_results` is clamped to `1..=50`.
    pub async fn recent_videos(
        &self,
        channel_id: &str,
        max_results: u32,
    ) -> Result<Vec<VideoSummary>> {
        let max = max_results.clamp(1, MAX_RESULTS_LIMIT).to_string();
        let list: ListResponse<SearchItem> = self
            .get(
                "search",
                &[
                    ("part", "snippet"),
                    ("channelId", channel_id),
                    ("maxResults", max.as_str()),
                    ("order", "date"),
                    ("type", "video"),
                ],
            )
            .await?;

        let videos = list
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(VideoSummary {
                    video_id,
                    title: item.snippet.title,
                    published_at: item.snippet.published_at,
                    thumbnail: item
                        .snippet
                        .thumbnails
                        .high
                        .map(|t| t.url)
                        .unwrap_or_default(),
                })
            })
            .collect::<Vec<_>>();

        debug!(channel_id = %channel_id, videos = videos.len(), "recent videos");
        Ok(videos)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .http_client
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = %endpoint, error = %e, "YouTube request failed");
                YouTubeError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            warn!(endpoint = %endpoint, status = %status, error = %message, "YouTube API error");
            return Err(YouTubeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| YouTubeError::Parse(e.to_string()))
    }
}
