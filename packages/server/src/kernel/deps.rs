//! Server dependencies for pipeline stages (using traits for testability)
//!
//! This module provides the central dependency container used by every stage.
//! All external services use trait abstractions to enable testing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient};
use resend::ResendService;
use std::sync::Arc;
use youtube_client::YouTubeClient;

use crate::domains::jobs::VideoItem;
use crate::kernel::{
    BaseAI, BaseEmailService, BaseVideoPlatform, ChannelMatch, JobStore,
};

// =============================================================================
// YouTubeClient Adapter (implements BaseVideoPlatform trait)
// =============================================================================

/// Wrapper around YouTubeClient that implements BaseVideoPlatform trait
pub struct YouTubeAdapter(pub Arc<YouTubeClient>);

impl YouTubeAdapter {
    pub fn new(client: Arc<YouTubeClient>) -> Self {
        Self(client)
    }
}

#[async_trait]
impl BaseVideoPlatform for YouTubeAdapter {
    async fn search_channels(&self, query: &str) -> Result<Vec<ChannelMatch>> {
        let hits = self.0.search_channels(query).await?;
        Ok(hits
            .into_iter()
            .map(|hit| ChannelMatch {
                id: hit.channel_id,
                title: hit.channel_title,
            })
            .collect())
    }

    async fn channels_by_username(&self, username: &str) -> Result<Vec<ChannelMatch>> {
        let channels = self.0.channels_by_username(username).await?;
        Ok(channels
            .into_iter()
            .map(|c| ChannelMatch {
                id: c.id,
                title: c.title,
            })
            .collect())
    }

    async fn recent_videos(&self, channel_id: &str, max_results: u32) -> Result<Vec<VideoItem>> {
        let videos = self.0.recent_videos(channel_id, max_results).await?;
        Ok(videos
            .into_iter()
            .map(|v| VideoItem {
                url: v.watch_url(),
                video_id: v.video_id,
                title: v.title,
                published_at: v.published_at,
                thumbnail: v.thumbnail,
            })
            .collect())
    }
}

// =============================================================================
// OpenAIClient Adapter (implements BaseAI trait)
// =============================================================================

/// Chat-completion backed BaseAI. Works with any OpenAI-compatible endpoint.
pub struct OpenAIAdapter {
    client: Arc<OpenAIClient>,
    model: String,
    temperature: f32,
}

impl OpenAIAdapter {
    pub fn new(client: Arc<OpenAIClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl BaseAI for OpenAIAdapter {
    async fn complete_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest::new(self.model.clone())
            .message(Message::system(system_prompt))
            .message(Message::user(user_prompt))
            .temperature(self.temperature)
            .json_object();

        let response = self
            .client
            .chat_completion(request)
            .await
            .context("Inference request failed")?;

        Ok(openai_client::strip_code_blocks(&response.content).to_string())
    }
}

// =============================================================================
// ResendService Adapter (implements BaseEmailService trait)
// =============================================================================

/// Wrapper around ResendService that implements BaseEmailService trait
pub struct ResendAdapter(pub Arc<ResendService>);

impl ResendAdapter {
    pub fn new(service: Arc<ResendService>) -> Self {
        Self(service)
    }
}

#[async_trait]
impl BaseEmailService for ResendAdapter {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<String> {
        let sent = self.0.send_email(to, subject, body).await?;
        Ok(sent.id)
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Default number of recent videos fetched per job.
pub const DEFAULT_MAX_VIDEOS: u32 = 20;

/// Server dependencies accessible to stages (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub job_store: Arc<dyn JobStore>,
    pub videos: Arc<dyn BaseVideoPlatform>,
    pub ai: Arc<dyn BaseAI>,
    pub email: Arc<dyn BaseEmailService>,
    /// How many recent videos FetchItems asks for
    pub max_videos: u32,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    pub fn new(
        job_store: Arc<dyn JobStore>,
        videos: Arc<dyn BaseVideoPlatform>,
        ai: Arc<dyn BaseAI>,
        email: Arc<dyn BaseEmailService>,
    ) -> Self {
        Self {
            job_store,
            videos,
            ai,
            email,
            max_videos: DEFAULT_MAX_VIDEOS,
        }
    }

    pub fn with_max_videos(mut self, max_videos: u32) -> Self {
        self.max_videos = max_videos;
        self
    }
}
