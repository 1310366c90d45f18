use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::domains::jobs::{JobPatch, JobStatus};
use crate::domains::pipeline::payloads::{ChannelResolvedPayload, StageErrorPayload, SubmitPayload};
use crate::domains::pipeline::stage::{Stage, StageOutcome};
use crate::domains::pipeline::topics;
use crate::kernel::{BaseVideoPlatform, ChannelMatch, ServerDeps};

/// Turns the requested channel into a canonical channel id and title.
pub struct ResolveChannel;

/// `@handle` is searched by query; anything else is looked up as a legacy
/// username. The first match wins.
pub async fn resolve_channel(
    channel: &str,
    videos: &dyn BaseVideoPlatform,
) -> Result<Option<ChannelMatch>> {
    let matches = match channel.strip_prefix('@') {
        Some(handle) => videos
            .search_channels(handle)
            .await
            .with_context(|| format!("Channel search for {} failed", handle))?,
        None => videos
            .channels_by_username(channel)
            .await
            .with_context(|| format!("Username lookup for {} failed", channel))?,
    };

    Ok(matches.into_iter().next())
}

#[async_trait]
impl Stage for ResolveChannel {
    const NAME: &'static str = "ResolveChannel";
    const INPUT_TOPIC: &'static str = topics::SUBMIT;
    const SUCCESS_TOPIC: &'static str = topics::CHANNEL_RESOLVED;
    const ERROR_TOPIC: Option<&'static str> = Some(topics::CHANNEL_ERROR);
    const IN_PROGRESS: JobStatus = JobStatus::ResolvingChannel;

    type Input = SubmitPayload;

    fn job_id(input: &SubmitPayload) -> &str {
        &input.job_id
    }

    fn failure_context(input: &SubmitPayload) -> StageErrorPayload {
        StageErrorPayload::new(&input.job_id, &input.email).channel(&input.channel)
    }

    async fn run(&self, input: &SubmitPayload, deps: &ServerDeps) -> Result<StageOutcome> {
        let Some(found) = resolve_channel(&input.channel, deps.videos.as_ref()).await? else {
            return Ok(StageOutcome::Reject {
                reason: format!("Could not resolve channel ID for channel: {}", input.channel),
            });
        };

        tracing::info!(
            job_id = %input.job_id,
            channel_id = %found.id,
            channel_title = %found.title,
            "Resolved channel"
        );

        let payload = ChannelResolvedPayload {
            job_id: input.job_id.clone(),
            email: input.email.clone(),
            channel_id: found.id.clone(),
            channel_title: found.title.clone(),
        };

        Ok(StageOutcome::Advance {
            patch: JobPatch::status(JobStatus::ChannelResolved)
                .channel(&found.id, &found.title)
                .clear_error(),
            payload: serde_json::to_value(payload)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::MockVideoPlatform;
    use crate::kernel::TestDependencies;
    use serde_json::json;

    fn submit(channel: &str) -> SubmitPayload {
        SubmitPayload {
            job_id: "job-1".into(),
            channel: channel.into(),
            email: "a@b.co".into(),
        }
    }

    #[tokio::test]
    async fn test_handle_is_searched_without_at_sign() {
        let videos = MockVideoPlatform::new().with_search_hit("mkbhd", "UC1", "MKBHD");

        let found = resolve_channel("@mkbhd", &videos).await.unwrap().unwrap();

        assert_eq!(found.id, "UC1");
        assert_eq!(videos.search_calls(), vec!["mkbhd"]);
        assert!(videos.username_calls().is_empty());
    }

    #[tokio::test]
    async fn test_plain_name_uses_username_lookup() {
        let videos = MockVideoPlatform::new().with_username("oldschool", "UC2", "Old School");

        let found = resolve_channel("oldschool", &videos).await.unwrap().unwrap();

        assert_eq!(found.title, "Old School");
        assert!(videos.search_calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_channel_is_rejected() {
        let deps = TestDependencies::new().into_server_deps();

        let outcome = ResolveChannel.run(&submit("@nobody"), &deps).await.unwrap();

        assert_eq!(
            outcome,
            StageOutcome::Reject {
                reason: "Could not resolve channel ID for channel: @nobody".into()
            }
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_is_a_fault() {
        let deps = TestDependencies::new()
            .mock_videos(MockVideoPlatform::new().failing("quota exceeded"))
            .into_server_deps();

        let err = ResolveChannel.run(&submit("@chan"), &deps).await.unwrap_err();

        assert!(format!("{:#}", err).contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_success_patch_clears_error() {
        let deps = TestDependencies::new()
            .mock_videos(MockVideoPlatform::new().with_search_hit("chan", "UC1", "Chan"))
            .into_server_deps();

        let outcome = ResolveChannel.run(&submit("@chan"), &deps).await.unwrap();

        let StageOutcome::Advance { patch, payload } = outcome else {
            panic!("expected advance");
        };
        assert_eq!(patch.fields()["error"], json!(null));
        assert_eq!(patch.target_status(), Some(JobStatus::ChannelResolved));
        assert_eq!(
            payload,
            json!({"jobId": "job-1", "email": "a@b.co", "channelId": "UC1", "channelTitle": "Chan"})
        );
    }
}
