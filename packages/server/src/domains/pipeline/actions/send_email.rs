use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::domains::jobs::{EnhancedTitle, JobPatch, JobStatus};
use crate::domains::pipeline::payloads::{
    EmailSentPayload, EnhancedContentPayload, StageErrorPayload,
};
use crate::domains::pipeline::stage::{Stage, StageOutcome};
use crate::domains::pipeline::topics;
use crate::kernel::ServerDeps;

const RULER_WIDTH: usize = 60;

/// Emails the improved titles to the requester.
pub struct Notify;

pub fn email_subject(channel_name: &str) -> String {
    format!("New titles for {}", channel_name)
}

/// Plain-text body listing every title between two rulers.
pub fn render_email(channel_name: &str, titles: &[EnhancedTitle]) -> String {
    let ruler = "=".repeat(RULER_WIDTH);
    let mut text = format!(
        "Youtube Title Doctor - Improved Titles for {}\n{}\n\n",
        channel_name, ruler
    );

    for (i, title) in titles.iter().enumerate() {
        text.push_str(&format!(
            "Video {}:\n-----------------\nOriginal: {}\nImproved: {}\nWhy: {}\nWatch: {}\n\n",
            i + 1,
            title.original,
            title.improved,
            title.rationale,
            title.url
        ));
    }

    text.push_str(&ruler);
    text.push('\n');
    text
}

#[async_trait]
impl Stage for Notify {
    const NAME: &'static str = "Notify";
    const INPUT_TOPIC: &'static str = topics::ENHANCED_CONTENT;
    const SUCCESS_TOPIC: &'static str = topics::EMAIL_SENT;
    const ERROR_TOPIC: Option<&'static str> = None;
    const IN_PROGRESS: JobStatus = JobStatus::SendingEmail;

    type Input = EnhancedContentPayload;

    fn job_id(input: &EnhancedContentPayload) -> &str {
        &input.job_id
    }

    fn failure_context(input: &EnhancedContentPayload) -> StageErrorPayload {
        let context = StageErrorPayload::new(&input.job_id, &input.email);
        match &input.channel_name {
            Some(name) => context.channel_name(name),
            None => context,
        }
    }

    async fn run(&self, input: &EnhancedContentPayload, deps: &ServerDeps) -> Result<StageOutcome> {
        let channel_name = input.channel_name_or_fallback();
        let body = render_email(channel_name, &input.enhanced_items);

        let notification_id = deps
            .email
            .send_email(&input.email, &email_subject(channel_name), &body)
            .await
            .context("Failed to send titles email")?;

        tracing::info!(
            job_id = %input.job_id,
            notification_id = %notification_id,
            "Sent titles email"
        );

        let patch = JobPatch::status(JobStatus::Completed)
            .notification_id(&notification_id)
            .completed_at(Utc::now());
        let payload = EmailSentPayload {
            job_id: input.job_id.clone(),
            email: input.email.clone(),
            notification_id,
        };

        Ok(StageOutcome::Advance {
            patch,
            payload: serde_json::to_value(payload)?,
        })
    }
}
