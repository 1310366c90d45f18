use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::domains::pipeline::payloads::{ErrorNotifiedPayload, FromPayload, StageErrorPayload};
use crate::kernel::BaseEmailService;

pub const FAILURE_SUBJECT: &str = "Request failed for youtube title doctor";

pub fn failure_body(channel_name: &str) -> String {
    format!(
        "We are facing some issue in generating better titles for your channel: {}",
        channel_name
    )
}

/// Outcome of handling one error-topic message.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorNotice {
    /// The requester was told; publish this on `error.notified`.
    Notified(ErrorNotifiedPayload),
    /// Not enough context to reach anyone.
    Dropped(String),
    /// Delivery failed. Logged and otherwise ignored.
    Failed(String),
}

/// Tell the requester their job failed.
///
/// Never touches the job store: the failing stage already wrote the
/// terminal status.
pub async fn notify_error(payload: &serde_json::Value, email: &dyn BaseEmailService) -> ErrorNotice {
    let failure = match StageErrorPayload::from_payload(payload) {
        Ok(failure) => failure,
        Err(missing) => {
            warn!(missing = ?missing.0, "Cannot send failure email");
            return ErrorNotice::Dropped(format!("ErrorNotifier: {}", missing));
        }
    };

    info!(
        job_id = %failure.job_id,
        error = failure.error.as_deref().unwrap_or_default(),
        "Notifying requester of failure"
    );

    match deliver(&failure, email).await {
        Ok(notice) => ErrorNotice::Notified(notice),
        Err(e) => {
            error!(job_id = %failure.job_id, error = %format!("{:#}", e), "Failed to send failure email");
            ErrorNotice::Failed(format!("{:#}", e))
        }
    }
}

async fn deliver(failure: &StageErrorPayload, email: &dyn BaseEmailService) -> Result<ErrorNotifiedPayload> {
    let channel_name = failure.display_channel();
    let notification_id = email
        .send_email(&failure.email, FAILURE_SUBJECT, &failure_body(channel_name))
        .await
        .context("Failed to send failure email")?;

    info!(
        job_id = %failure.job_id,
        notification_id = %notification_id,
        "Failure email sent"
    );

    Ok(ErrorNotifiedPayload {
        job_id: failure.job_id.clone(),
        email: failure.email.clone(),
        channel_name: channel_name.to_string(),
        notification_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::MockEmailService;
    use serde_json::json;

    #[tokio::test]
    async fn test_prefers_channel_name_over_requested_channel() {
        let email = MockEmailService::new();
        let payload = json!({
            "jobId": "job-1",
            "email": "a@b.co",
            "channel": "@chan",
            "channelName": "The Channel",
            "error": "boom"
        });

        let notice = notify_error(&payload, &email).await;

        let sent = email.sent();
        assert_eq!(sent[0].subject, FAILURE_SUBJECT);
        assert_eq!(
            sent[0].body,
            "We are facing some issue in generating better titles for your channel: The Channel"
        );
        assert_eq!(
            notice,
            ErrorNotice::Notified(ErrorNotifiedPayload {
                job_id: "job-1".into(),
                email: "a@b.co".into(),
                channel_name: "The Channel".into(),
                notification_id: "mock-email-1".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_requested_channel_then_generic_name() {
        let email = MockEmailService::new();

        notify_error(&json!({"jobId": "j1", "email": "a@b.co", "channel": "@chan"}), &email).await;
        notify_error(&json!({"jobId": "j2", "email": "a@b.co"}), &email).await;

        let sent = email.sent();
        assert!(sent[0].body.ends_with(": @chan"));
        assert!(sent[1].body.ends_with(": your channel"));
    }

    #[tokio::test]
    async fn test_missing_recipient_is_dropped() {
        let email = MockEmailService::new();

        let notice = notify_error(&json!({"jobId": "j1", "error": "boom"}), &email).await;

        assert!(matches!(notice, ErrorNotice::Dropped(reason) if reason.contains("email")));
        assert_eq!(email.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let email = MockEmailService::new().failing("smtp down");

        let notice = notify_error(&json!({"jobId": "j1", "email": "a@b.co"}), &email).await;

        assert!(matches!(notice, ErrorNotice::Failed(reason) if reason.contains("smtp down")));
    }
}
