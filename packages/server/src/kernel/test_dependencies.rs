// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    BaseAI, BaseEmailService, BaseVideoPlatform, ChannelMatch, InMemoryJobStore, ServerDeps,
    DEFAULT_MAX_VIDEOS,
};
use crate::domains::jobs::VideoItem;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Mock Video Platform
// =============================================================================

/// Arguments captured from a recent_videos call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCallArgs {
    pub channel_id: String,
    pub max_results: u32,
}

/// Video platform with canned lookups. Unknown queries return no results.
#[derive(Default)]
pub struct MockVideoPlatform {
    search_hits: Mutex<HashMap<String, Vec<ChannelMatch>>>,
    usernames: Mutex<HashMap<String, Vec<ChannelMatch>>>,
    videos: Mutex<HashMap<String, Vec<VideoItem>>>,
    failure: Mutex<Option<String>>,
    search_calls: Mutex<Vec<String>>,
    username_calls: Mutex<Vec<String>>,
    video_calls: Mutex<Vec<VideoCallArgs>>,
}

impl MockVideoPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer a channel search for `query` with one channel
    pub fn with_search_hit(self, query: &str, channel_id: &str, title: &str) -> Self {
        lock(&self.search_hits)
            .entry(query.to_string())
            .or_default()
            .push(ChannelMatch {
                id: channel_id.to_string(),
                title: title.to_string(),
            });
        self
    }

    /// Answer a username lookup for `username` with one channel
    pub fn with_username(self, username: &str, channel_id: &str, title: &str) -> Self {
        lock(&self.usernames)
            .entry(username.to_string())
            .or_default()
            .push(ChannelMatch {
                id: channel_id.to_string(),
                title: title.to_string(),
            });
        self
    }

    /// Uploads returned for a channel (newest first)
    pub fn with_videos(self, channel_id: &str, videos: Vec<VideoItem>) -> Self {
        lock(&self.videos).insert(channel_id.to_string(), videos);
        self
    }

    /// Make every call fail with `message`
    pub fn failing(self, message: &str) -> Self {
        *lock(&self.failure) = Some(message.to_string());
        self
    }

    /// Get all channel search queries
    pub fn search_calls(&self) -> Vec<String> {
        lock(&self.search_calls).clone()
    }

    /// Get all username lookups
    pub fn username_calls(&self) -> Vec<String> {
        lock(&self.username_calls).clone()
    }

    /// Get all recent_videos calls with their arguments
    pub fn video_calls(&self) -> Vec<VideoCallArgs> {
        lock(&self.video_calls).clone()
    }

    fn check_failure(&self) -> Result<()> {
        match lock(&self.failure).as_ref() {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BaseVideoPlatform for MockVideoPlatform {
    async fn search_channels(&self, query: &str) -> Result<Vec<ChannelMatch>> {
        lock(&self.search_calls).push(query.to_string());
        self.check_failure()?;
        Ok(lock(&self.search_hits).get(query).cloned().unwrap_or_default())
    }

    async fn channels_by_username(&self, username: &str) -> Result<Vec<ChannelMatch>> {
        lock(&self.username_calls).push(username.to_string());
        self.check_failure()?;
        Ok(lock(&self.usernames).get(username).cloned().unwrap_or_default())
    }

    async fn recent_videos(&self, channel_id: &str, max_results: u32) -> Result<Vec<VideoItem>> {
        lock(&self.video_calls).push(VideoCallArgs {
            channel_id: channel_id.to_string(),
            max_results,
        });
        self.check_failure()?;
        Ok(lock(&self.videos)
            .get(channel_id)
            .map(|videos| videos.iter().take(max_results as usize).cloned().collect())
            .unwrap_or_default())
    }
}

/// Build a video item with a conventional watch URL.
pub fn mock_video(video_id: &str, title: &str) -> VideoItem {
    VideoItem {
        video_id: video_id.to_string(),
        title: title.to_string(),
        url: format!("https://www.youtube.com/watch?v={}", video_id),
        published_at: "2024-01-01T00:00:00Z".to_string(),
        thumbnail: String::new(),
    }
}

// =============================================================================
// Mock AI (Generic LLM capabilities)
// =============================================================================

/// Arguments captured from a complete_json call
#[derive(Debug, Clone)]
pub struct AiCall {
    pub system_prompt: String,
    pub user_prompt: String,
}

enum MockAiResponse {
    Text(String),
    Failure(String),
}

/// Scripted AI. Queued responses are returned in order; with nothing
/// queued it improves every numbered title found in the user prompt.
pub struct MockAI {
    responses: Mutex<Vec<MockAiResponse>>,
    calls: Mutex<Vec<AiCall>>,
}

impl MockAI {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Add a raw text response to the queue
    pub fn with_response(self, response: impl Into<String>) -> Self {
        lock(&self.responses).push(MockAiResponse::Text(response.into()));
        self
    }

    /// Add a JSON response to the queue (will be serialized)
    pub fn with_json_response(self, data: &serde_json::Value) -> Self {
        self.with_response(data.to_string())
    }

    /// Queue a failed call
    pub fn with_error(self, message: impl Into<String>) -> Self {
        lock(&self.responses).push(MockAiResponse::Failure(message.into()));
        self
    }

    /// Get all calls that were sent to the AI
    pub fn calls(&self) -> Vec<AiCall> {
        lock(&self.calls).clone()
    }

    /// Get the last user prompt sent to the AI
    pub fn last_prompt(&self) -> Option<String> {
        lock(&self.calls).last().map(|c| c.user_prompt.clone())
    }

    /// Get the number of times the AI was called
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Improved-title response for every `N. "title"` line of the prompt.
    fn default_response(user_prompt: &str) -> String {
        let titles: Vec<serde_json::Value> = user_prompt
            .lines()
            .filter_map(|line| {
                let (number, rest) = line.trim().split_once(". ")?;
                number.parse::<usize>().ok()?;
                let title = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
                Some(serde_json::json!({
                    "original": title,
                    "improved": format!("{} (Improved)", title),
                    "rationale": "Clearer promise to the viewer"
                }))
            })
            .collect();

        serde_json::json!({ "titles": titles }).to_string()
    }
}

impl Default for MockAI {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn complete_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        // Record the call
        lock(&self.calls).push(AiCall {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
        });

        let mut responses = lock(&self.responses);
        if responses.is_empty() {
            return Ok(Self::default_response(user_prompt));
        }

        match responses.remove(0) {
            MockAiResponse::Text(text) => Ok(text),
            MockAiResponse::Failure(message) => Err(anyhow!("{}", message)),
        }
    }
}

// =============================================================================
// Mock Email Service
// =============================================================================

/// An email captured by MockEmailService
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub id: String,
}

#[derive(Default)]
pub struct MockEmailService {
    sent: Mutex<Vec<SentEmail>>,
    failure: Mutex<Option<String>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail with `message`
    pub fn failing(self, message: &str) -> Self {
        *lock(&self.failure) = Some(message.to_string());
        self
    }

    /// Get all successfully sent emails
    pub fn sent(&self) -> Vec<SentEmail> {
        lock(&self.sent).clone()
    }

    /// Get sent emails whose subject contains `text`
    pub fn sent_with_subject(&self, text: &str) -> Vec<SentEmail> {
        lock(&self.sent)
            .iter()
            .filter(|e| e.subject.contains(text))
            .cloned()
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        lock(&self.sent).len()
    }
}

#[async_trait]
impl BaseEmailService for MockEmailService {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<String> {
        if let Some(message) = lock(&self.failure).as_ref() {
            return Err(anyhow!("{}", message));
        }

        let mut sent = lock(&self.sent);
        let id = format!("mock-email-{}", sent.len() + 1);
        sent.push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            id: id.clone(),
        });
        Ok(id)
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub job_store: InMemoryJobStore,
    pub videos: Arc<MockVideoPlatform>,
    pub ai: Arc<MockAI>,
    pub email: Arc<MockEmailService>,
    pub max_videos: u32,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            job_store: InMemoryJobStore::new(),
            videos: Arc::new(MockVideoPlatform::new()),
            ai: Arc::new(MockAI::new()),
            email: Arc::new(MockEmailService::new()),
            max_videos: DEFAULT_MAX_VIDEOS,
        }
    }

    /// Set a mock video platform
    pub fn mock_videos(mut self, videos: MockVideoPlatform) -> Self {
        self.videos = Arc::new(videos);
        self
    }

    /// Set a mock AI
    pub fn mock_ai(mut self, ai: MockAI) -> Self {
        self.ai = Arc::new(ai);
        self
    }

    /// Set a mock email service
    pub fn mock_email(mut self, email: MockEmailService) -> Self {
        self.email = Arc::new(email);
        self
    }

    pub fn max_videos(mut self, max_videos: u32) -> Self {
        self.max_videos = max_videos;
        self
    }

    /// Convert into ServerDeps for testing. Mocks stay shared with `self`.
    pub fn into_server_deps(self) -> ServerDeps {
        ServerDeps::new(
            Arc::new(self.job_store),
            self.videos,
            self.ai,
            self.email,
        )
        .with_max_videos(self.max_videos)
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
