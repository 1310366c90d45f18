//! End-to-end pipeline runs against mock services.

mod common;

use std::collections::HashSet;

use common::*;
use serde_json::json;
use server_core::domains::jobs::{Job, JobPatch, JobStatus};
use server_core::domains::pipeline::topics;
use server_core::kernel::test_dependencies::{MockAI, MockEmailService, MockVideoPlatform};
use server_core::kernel::TestDependencies;
use test_context::test_context;

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn successful_run_completes_and_emails_titles() {
    let ctx = TestHarness::with_deps(TestDependencies::new().mock_videos(channel_with_videos(3)));

    let submission = ctx.submit("@testchannel", TEST_EMAIL).await;
    let job = ctx.job(&submission.job_id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.channel_id.as_deref(), Some(TEST_CHANNEL_ID));
    assert_eq!(job.channel_title.as_deref(), Some(TEST_CHANNEL_TITLE));
    assert_eq!(job.items.as_ref().map(Vec::len), Some(3));
    assert_eq!(job.notification_id.as_deref(), Some("mock-email-1"));
    assert!(job.completed_at.is_some());
    assert!(job.error.is_none());

    let enhanced = job.enhanced_items.unwrap();
    assert_eq!(enhanced.len(), 3);
    assert_eq!(enhanced[1].original, "Video 2");
    assert_eq!(enhanced[1].improved, "Video 2 (Improved)");
    assert_eq!(enhanced[1].url, "https://www.youtube.com/watch?v=vid2");

    let sent = ctx.deps.email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, TEST_EMAIL);
    assert_eq!(sent[0].subject, "New titles for Test Channel");
    assert!(sent[0].body.contains("Video 3:\n"));
    assert!(sent[0].body.contains("Improved: Video 1 (Improved)\n"));

    assert_eq!(
        ctx.tap.topics(),
        vec![
            topics::SUBMIT,
            topics::CHANNEL_RESOLVED,
            topics::FETCHED_ITEMS,
            topics::ENHANCED_CONTENT,
            topics::EMAIL_SENT,
        ]
    );
    assert!(ctx.engine.dead_letters().is_empty());
}

#[tokio::test]
async fn twenty_videos_are_enhanced_in_order() {
    let ctx = TestHarness::with_deps(
        TestDependencies::new()
            .mock_videos(channel_with_videos(25))
            .max_videos(20),
    );

    let submission = ctx.submit("@testchannel", TEST_EMAIL).await;
    let job = ctx.job(&submission.job_id).await;

    assert_eq!(job.status, JobStatus::Completed);
    let items = job.items.unwrap();
    let enhanced = job.enhanced_items.unwrap();
    assert_eq!(items.len(), 20);
    assert_eq!(enhanced.len(), 20);

    for (i, (item, suggestion)) in items.iter().zip(&enhanced).enumerate() {
        assert_eq!(suggestion.url, item.url, "reference link at index {}", i);
        assert_eq!(suggestion.original, item.title, "original title at index {}", i);
        assert_eq!(suggestion.improved, format!("{} (Improved)", item.title));
    }
}

#[tokio::test]
async fn every_message_of_a_run_shares_the_correlation() {
    let ctx = TestHarness::with_deps(TestDependencies::new().mock_videos(channel_with_videos(1)));

    let submission = ctx.submit("@testchannel", TEST_EMAIL).await;

    let messages = ctx.tap.messages();
    assert_eq!(messages.len(), 5);
    assert!(messages
        .iter()
        .all(|m| m.cid == submission.correlation_id));
    assert!(messages
        .iter()
        .all(|m| m.payload["jobId"] == submission.job_id.as_str()));
}

#[tokio::test]
async fn fetches_the_configured_number_of_videos() {
    let ctx = TestHarness::with_deps(
        TestDependencies::new()
            .mock_videos(channel_with_videos(8))
            .max_videos(5),
    );

    let submission = ctx.submit("@testchannel", TEST_EMAIL).await;

    let job = ctx.job(&submission.job_id).await;
    assert_eq!(job.items.unwrap().len(), 5);
    assert_eq!(ctx.deps.videos.video_calls()[0].max_results, 5);
    assert!(ctx
        .deps
        .ai
        .last_prompt()
        .unwrap()
        .contains("Below are 5 video titles from the channel \"Test Channel\"."));
}

#[tokio::test]
async fn plain_channel_name_uses_username_lookup() {
    let videos = MockVideoPlatform::new()
        .with_username("legacyname", TEST_CHANNEL_ID, TEST_CHANNEL_TITLE)
        .with_videos(TEST_CHANNEL_ID, test_videos(2));
    let ctx = TestHarness::with_deps(TestDependencies::new().mock_videos(videos));

    let submission = ctx.submit("legacyname", TEST_EMAIL).await;

    assert_eq!(ctx.job(&submission.job_id).await.status, JobStatus::Completed);
    assert_eq!(ctx.deps.videos.username_calls(), vec!["legacyname"]);
    assert!(ctx.deps.videos.search_calls().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn job_ids_are_unique(ctx: &TestHarness) {
    let mut ids = HashSet::new();
    for _ in 0..20 {
        let submission = ctx.submit("@nobody", TEST_EMAIL).await;
        ids.insert(submission.job_id);
    }

    assert_eq!(ids.len(), 20);
}

// =============================================================================
// Business failures
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn unresolvable_channel_fails_and_notifies(ctx: &TestHarness) {
    let submission = ctx.submit("@unknown", TEST_EMAIL).await;
    let job = ctx.job(&submission.job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error.as_deref(),
        Some("Could not resolve channel ID for channel: @unknown")
    );
    assert!(job.channel_id.is_none());

    let errors = ctx.tap.on_topic(topics::CHANNEL_ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].payload["jobId"], submission.job_id.as_str());
    assert_eq!(errors[0].payload["email"], TEST_EMAIL);
    assert_eq!(errors[0].payload["channel"], "@unknown");
    assert_eq!(
        errors[0].payload["error"],
        "Could not resolve channel ID for channel: @unknown"
    );

    let sent = ctx.deps.email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Request failed for youtube title doctor");
    assert_eq!(
        sent[0].body,
        "We are facing some issue in generating better titles for your channel: @unknown"
    );

    let notified = ctx.tap.on_topic(topics::ERROR_NOTIFIED);
    assert_eq!(notified.len(), 1);
    assert_eq!(notified[0].payload["jobId"], submission.job_id.as_str());
    assert_eq!(notified[0].payload["email"], TEST_EMAIL);
    assert_eq!(notified[0].payload["notificationId"], "mock-email-1");
    assert!(!ctx.tap.saw(topics::FETCHED_ITEMS));
}

#[tokio::test]
async fn channel_without_videos_fails() {
    let videos = MockVideoPlatform::new().with_search_hit("empty", "UC_empty", "Empty Channel");
    let ctx = TestHarness::with_deps(TestDependencies::new().mock_videos(videos));

    let submission = ctx.submit("@empty", TEST_EMAIL).await;
    let job = ctx.job(&submission.job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error.as_deref(),
        Some("No videos found for the specified channel.")
    );

    let errors = ctx.tap.on_topic(topics::FETCHED_ITEMS_ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].payload["jobId"], submission.job_id.as_str());
    assert_eq!(errors[0].payload["email"], TEST_EMAIL);
    assert_eq!(
        errors[0].payload["error"],
        "No videos found for the specified channel."
    );

    assert!(!ctx.tap.saw(topics::ENHANCED_CONTENT));
    assert_eq!(ctx.tap.count(topics::ERROR_NOTIFIED), 1);
    assert!(ctx.deps.email.sent()[0].body.ends_with(": Empty Channel"));
    assert_eq!(ctx.deps.ai.call_count(), 0);
}

// =============================================================================
// Faults
// =============================================================================

#[tokio::test]
async fn inference_failure_marks_error_and_notifies() {
    let ctx = TestHarness::with_deps(
        TestDependencies::new()
            .mock_videos(channel_with_videos(2))
            .mock_ai(MockAI::new().with_error("quota exhausted")),
    );

    let submission = ctx.submit("@testchannel", TEST_EMAIL).await;
    let job = ctx.job(&submission.job_id).await;

    assert_eq!(job.status, JobStatus::Error);
    let error = job.error.unwrap();
    assert!(error.starts_with("EnhanceContent step failed:"));
    assert!(error.contains("quota exhausted"));
    // Earlier results are kept
    assert_eq!(job.items.unwrap().len(), 2);
    assert!(job.enhanced_items.is_none());

    let errors = ctx.tap.on_topic(topics::ENHANCED_CONTENT_ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].payload["channelName"], TEST_CHANNEL_TITLE);

    let sent = ctx.deps.email.sent_with_subject("Request failed");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.ends_with(": Test Channel"));
    assert!(!ctx.tap.saw(topics::EMAIL_SENT));
}

#[tokio::test]
async fn title_count_mismatch_is_a_fault() {
    let ctx = TestHarness::with_deps(
        TestDependencies::new()
            .mock_videos(channel_with_videos(2))
            .mock_ai(MockAI::new().with_json_response(&json!({
                "titles": [{"original": "Video 1", "improved": "Better", "rationale": "r"}]
            }))),
    );

    let submission = ctx.submit("@testchannel", TEST_EMAIL).await;
    let job = ctx.job(&submission.job_id).await;

    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(
        job.error.as_deref(),
        Some("EnhanceContent step failed: Inference returned 1 titles for 2 videos")
    );
}

#[tokio::test]
async fn lookup_outage_marks_error() {
    let ctx = TestHarness::with_deps(
        TestDependencies::new().mock_videos(MockVideoPlatform::new().failing("503 from upstream")),
    );

    let submission = ctx.submit("@testchannel", TEST_EMAIL).await;
    let job = ctx.job(&submission.job_id).await;

    assert_eq!(job.status, JobStatus::Error);
    assert!(job.error.unwrap().starts_with("ResolveChannel step failed:"));
    assert_eq!(ctx.tap.count(topics::CHANNEL_ERROR), 1);
    assert_eq!(ctx.tap.count(topics::ERROR_NOTIFIED), 1);
}

#[tokio::test]
async fn delivery_failure_records_error_without_publishing() {
    let ctx = TestHarness::with_deps(
        TestDependencies::new()
            .mock_videos(channel_with_videos(1))
            .mock_email(MockEmailService::new().failing("mailbox full")),
    );

    let submission = ctx.submit("@testchannel", TEST_EMAIL).await;
    let job = ctx.job(&submission.job_id).await;

    assert_eq!(job.status, JobStatus::Error);
    assert!(job.error.unwrap().starts_with("Notify step failed:"));
    assert!(job.enhanced_items.is_some());
    assert_eq!(
        ctx.tap.topics().last().map(String::as_str),
        Some(topics::ENHANCED_CONTENT)
    );
}

// =============================================================================
// Dropped messages
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn malformed_payload_stalls_the_job(ctx: &TestHarness) {
    create_test_job(ctx.server_deps(), "job-stall", "@testchannel")
        .await
        .unwrap();

    ctx.publish(
        topics::FETCHED_ITEMS,
        json!({"jobId": "job-stall", "email": TEST_EMAIL, "items": []}),
    )
    .await;

    let job = ctx.job("job-stall").await;
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.error.is_none());
    assert_eq!(ctx.tap.topics(), vec![topics::FETCHED_ITEMS]);
    assert_eq!(ctx.deps.ai.call_count(), 0);

    let dead = ctx.engine.dead_letters().for_topic(topics::FETCHED_ITEMS);
    assert_eq!(dead.len(), 1);
    assert!(dead[0].reason.contains("channelName"));
    assert!(dead[0].reason.contains("items"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn message_for_unknown_job_is_dead_lettered(ctx: &TestHarness) {
    ctx.publish(
        topics::SUBMIT,
        json!({"jobId": "ghost", "channel": "@testchannel", "email": TEST_EMAIL}),
    )
    .await;

    assert_eq!(ctx.deps.videos.search_calls().len(), 0);
    let dead = ctx.engine.dead_letters().entries();
    assert_eq!(dead.len(), 1);
    assert!(dead[0].reason.contains("not found"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn error_without_recipient_is_dead_lettered(ctx: &TestHarness) {
    ctx.publish(topics::CHANNEL_ERROR, json!({"jobId": "j1", "error": "boom"}))
        .await;

    assert_eq!(ctx.deps.email.sent_count(), 0);
    assert!(!ctx.tap.saw(topics::ERROR_NOTIFIED));
    assert_eq!(ctx.engine.dead_letters().for_topic(topics::CHANNEL_ERROR).len(), 1);
}

#[tokio::test]
async fn completed_job_ignores_replayed_messages() {
    let ctx = TestHarness::with_deps(TestDependencies::new().mock_videos(channel_with_videos(1)));
    let submission = ctx.submit("@testchannel", TEST_EMAIL).await;
    let before = ctx.raw_job(&submission.job_id).await;

    let replay = ctx.tap.on_topic(topics::CHANNEL_RESOLVED)[0].payload.clone();
    ctx.publish(topics::CHANNEL_RESOLVED, replay).await;

    assert_eq!(ctx.raw_job(&submission.job_id).await, before);
    assert_eq!(ctx.deps.videos.video_calls().len(), 1);
    assert_eq!(ctx.deps.email.sent_count(), 1);
    assert_eq!(ctx.engine.dead_letters().len(), 1);
}

// =============================================================================
// Store semantics
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn merge_write_keeps_fields_from_earlier_stages(ctx: &TestHarness) {
    let store = ctx.server_deps().job_store.as_ref();
    create_test_job(ctx.server_deps(), "job-merge", "@testchannel")
        .await
        .unwrap();

    Job::merge_write("job-merge", &JobPatch::status(JobStatus::ResolvingChannel), store)
        .await
        .unwrap();
    let patch = JobPatch::status(JobStatus::ChannelResolved)
        .channel(TEST_CHANNEL_ID, TEST_CHANNEL_TITLE)
        .clear_error();
    let once = Job::merge_write("job-merge", &patch, store).await.unwrap();
    let twice = Job::merge_write("job-merge", &patch, store).await.unwrap();

    assert_eq!(once, twice);
    assert_eq!(twice["email"], TEST_EMAIL);
    assert_eq!(twice["channelRequested"], "@testchannel");
    assert_eq!(twice["channelId"], TEST_CHANNEL_ID);
}
