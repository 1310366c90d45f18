// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "improve these titles") lives in domain actions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseAI, BaseEmailService)

use anyhow::Result;
use async_trait::async_trait;

use crate::domains::jobs::VideoItem;

// =============================================================================
// Video Platform Trait (Infrastructure - channel lookup and uploads)
// =============================================================================

/// A channel returned by a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMatch {
    pub id: String,
    pub title: String,
}

#[async_trait]
pub trait BaseVideoPlatform: Send + Sync {
    /// Free-text channel search, best match first
    async fn search_channels(&self, query: &str) -> Result<Vec<ChannelMatch>>;

    /// Legacy username lookup
    async fn channels_by_username(&self, username: &str) -> Result<Vec<ChannelMatch>>;

    /// Most recent videos of a channel, newest first
    async fn recent_videos(&self, channel_id: &str, max_results: u32) -> Result<Vec<VideoItem>>;
}

// =============================================================================
// AI Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Complete a system + user prompt expecting a JSON object back.
    /// Returns the raw JSON string; parse with serde_json::from_str in calling code.
    async fn complete_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

// =============================================================================
// Email Service Trait (Infrastructure - transactional email)
// =============================================================================

#[async_trait]
pub trait BaseEmailService: Send + Sync {
    /// Send a plain-text email. Returns the provider's message ID.
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<String>;
}
