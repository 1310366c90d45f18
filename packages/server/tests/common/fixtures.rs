//! Test fixtures for building mock services and seeding jobs.

use anyhow::Result;
use server_core::domains::jobs::{Job, JobRecord, VideoItem};
use server_core::kernel::test_dependencies::{mock_video, MockVideoPlatform};
use server_core::kernel::ServerDeps;

pub const TEST_EMAIL: &str = "creator@example.com";
pub const TEST_CHANNEL_ID: &str = "UC_test_channel";
pub const TEST_CHANNEL_TITLE: &str = "Test Channel";

/// `count` videos titled "Video 1", "Video 2", ...
pub fn test_videos(count: usize) -> Vec<VideoItem> {
    (1..=count)
        .map(|i| mock_video(&format!("vid{}", i), &format!("Video {}", i)))
        .collect()
}

/// A platform where `@testchannel` resolves and has `count` uploads.
pub fn channel_with_videos(count: usize) -> MockVideoPlatform {
    MockVideoPlatform::new()
        .with_search_hit("testchannel", TEST_CHANNEL_ID, TEST_CHANNEL_TITLE)
        .with_videos(TEST_CHANNEL_ID, test_videos(count))
}

/// Seed a queued job directly in the store.
pub async fn create_test_job(deps: &ServerDeps, job_id: &str, channel: &str) -> Result<JobRecord> {
    let record = JobRecord::queued(job_id, channel, TEST_EMAIL);
    Job::create(&record, deps.job_store.as_ref()).await?;
    Ok(record)
}
