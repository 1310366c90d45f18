use serde_json::json;
use thiserror::Error;
use topic_bus::{CorrelationId, EngineHandle};
use tracing::info;
use uuid::Uuid;

use crate::common::{is_valid_email, FieldErrors};
use crate::domains::jobs::{Job, JobRecord};
use crate::domains::pipeline::topics;
use crate::kernel::ServerDeps;

pub const QUEUED_MESSAGE: &str = "Your request has been queued for processing. You will receive an email once it's completed with improved suggestions for your YouTube videos.";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid submission: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// An accepted submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub job_id: String,
    pub message: &'static str,
    /// Correlation of the pipeline run started by this submission
    pub correlation_id: CorrelationId,
}

/// Collect every field problem at once.
pub fn validate_submission(channel: Option<&str>, email: Option<&str>) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if channel.map(str::trim).unwrap_or_default().is_empty() {
        errors.add("channel", "Channel name is required");
    }

    if !email.map(str::trim).is_some_and(is_valid_email) {
        errors.add("email", "A valid email is required");
    }

    errors
}

/// Validate, create the job record and start the pipeline.
pub async fn submit_job(
    channel: Option<&str>,
    email: Option<&str>,
    engine: &EngineHandle<ServerDeps>,
) -> Result<Submission, SubmitError> {
    let errors = validate_submission(channel, email);
    if !errors.is_empty() {
        return Err(SubmitError::Validation(errors));
    }

    let channel = channel.unwrap_or_default().trim();
    let email = email.unwrap_or_default().trim();
    let job_id = Uuid::new_v4().to_string();

    let record = JobRecord::queued(&job_id, channel, email);
    Job::create(&record, engine.deps().job_store.as_ref()).await?;

    let correlation_id = engine.publish(
        topics::SUBMIT,
        json!({
            "jobId": job_id,
            "channel": channel,
            "email": email,
        }),
    );

    info!(job_id = %job_id, channel = %channel, "Job queued");

    Ok(Submission {
        job_id,
        message: QUEUED_MESSAGE,
        correlation_id,
    })
}
