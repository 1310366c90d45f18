use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::domains::jobs::{JobPatch, JobStatus};
use crate::domains::pipeline::payloads::{
    ChannelResolvedPayload, FetchedItemsPayload, StageErrorPayload,
};
use crate::domains::pipeline::stage::{Stage, StageOutcome};
use crate::domains::pipeline::topics;
use crate::kernel::ServerDeps;

/// Fetches the channel's most recent uploads.
pub struct FetchItems;

#[async_trait]
impl Stage for FetchItems {
    const NAME: &'static str = "FetchItems";
    const INPUT_TOPIC: &'static str = topics::CHANNEL_RESOLVED;
    const SUCCESS_TOPIC: &'static str = topics::FETCHED_ITEMS;
    const ERROR_TOPIC: Option<&'static str> = Some(topics::FETCHED_ITEMS_ERROR);
    const IN_PROGRESS: JobStatus = JobStatus::FetchingVideos;

    type Input = ChannelResolvedPayload;

    fn job_id(input: &ChannelResolvedPayload) -> &str {
        &input.job_id
    }

    fn failure_context(input: &ChannelResolvedPayload) -> StageErrorPayload {
        StageErrorPayload::new(&input.job_id, &input.email)
            .channel_id(&input.channel_id)
            .channel_name(&input.channel_title)
    }

    async fn run(&self, input: &ChannelResolvedPayload, deps: &ServerDeps) -> Result<StageOutcome> {
        let items = deps
            .videos
            .recent_videos(&input.channel_id, deps.max_videos)
            .await
            .with_context(|| format!("Failed to fetch videos for channel {}", input.channel_id))?;

        if items.is_empty() {
            return Ok(StageOutcome::Reject {
                reason: "No videos found for the specified channel.".to_string(),
            });
        }

        tracing::info!(
            job_id = %input.job_id,
            channel_id = %input.channel_id,
            count = items.len(),
            "Fetched videos"
        );

        let patch = JobPatch::status(JobStatus::VideosFetched).items(&items);
        let payload = FetchedItemsPayload {
            job_id: input.job_id.clone(),
            email: input.email.clone(),
            channel_id: input.channel_id.clone(),
            channel_name: input.channel_title.clone(),
            items,
        };

        Ok(StageOutcome::Advance {
            patch,
            payload: serde_json::to_value(payload)?,
        })
    }
}
