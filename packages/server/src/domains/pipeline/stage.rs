//! Generic stage wrapper.
//!
//! Every pipeline stage follows the same policy: validate the payload, mark
//! the job in progress, do the work, then either advance the job and publish
//! the success topic or record the failure and publish the error topic.
//! Stages only describe the work; [`run_stage`] owns the policy.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use topic_bus::{HandlerContext, Message};
use tracing::{error, info, warn};

use super::payloads::{FromPayload, MissingFields, StageErrorPayload};
use crate::domains::jobs::{Job, JobError, JobPatch, JobStatus};
use crate::kernel::ServerDeps;

/// What a stage decided.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// Merge `patch` into the job and publish `payload` on the success topic.
    Advance { patch: JobPatch, payload: Value },
    /// Business failure: the job is marked `Failed` with `reason`.
    Reject { reason: String },
}

#[async_trait]
pub trait Stage: Send + Sync + 'static {
    const NAME: &'static str;
    const INPUT_TOPIC: &'static str;
    const SUCCESS_TOPIC: &'static str;
    /// Where failures are announced. `None` records them on the job only.
    const ERROR_TOPIC: Option<&'static str>;
    /// Status written before the work starts.
    const IN_PROGRESS: JobStatus;

    type Input: FromPayload + Send + Sync;

    fn parse(payload: &Value) -> Result<Self::Input, MissingFields> {
        Self::Input::from_payload(payload)
    }

    fn job_id(input: &Self::Input) -> &str;

    /// Context published on the error topic alongside the error message.
    fn failure_context(input: &Self::Input) -> StageErrorPayload;

    async fn run(&self, input: &Self::Input, deps: &ServerDeps) -> Result<StageOutcome>;
}

/// Handle one message for `stage`. Always returns `Ok`; failures are
/// recorded on the job, on the error topic, or in the dead-letter log.
pub async fn run_stage<S: Stage>(
    stage: &S,
    message: Message,
    ctx: HandlerContext<ServerDeps>,
) -> Result<()> {
    let input = match S::parse(&message.payload) {
        Ok(input) => input,
        Err(missing) => {
            warn!(
                stage = S::NAME,
                topic = %message.topic,
                missing = ?missing.0,
                "Dropping malformed payload"
            );
            ctx.dead_letter(message.payload, format!("{}: {}", S::NAME, missing));
            return Ok(());
        }
    };

    let job_id = S::job_id(&input);
    let deps = ctx.deps();
    let store = deps.job_store.as_ref();

    match Job::merge_write(job_id, &JobPatch::status(S::IN_PROGRESS), store).await {
        Ok(_) => {}
        Err(JobError::Store(e)) => {
            fault::<S>(&input, &ctx, e).await;
            return Ok(());
        }
        Err(e) => {
            warn!(stage = S::NAME, job_id = %job_id, error = %e, "Dropping message for unusable job");
            ctx.dead_letter(message.payload, format!("{}: {}", S::NAME, e));
            return Ok(());
        }
    }

    info!(stage = S::NAME, job_id = %job_id, "Stage started");

    match stage.run(&input, deps).await {
        Ok(StageOutcome::Advance { patch, payload }) => {
            match Job::merge_write(job_id, &patch, store).await {
                Ok(_) => {
                    ctx.publish(S::SUCCESS_TOPIC, payload);
                    info!(
                        stage = S::NAME,
                        job_id = %job_id,
                        topic = S::SUCCESS_TOPIC,
                        "Stage completed"
                    );
                }
                Err(e) => fault::<S>(&input, &ctx, e.into()).await,
            }
        }
        Ok(StageOutcome::Reject { reason }) => reject::<S>(&input, &ctx, reason).await,
        Err(e) => fault::<S>(&input, &ctx, e).await,
    }

    Ok(())
}

/// Business failure: `Failed` plus the reason, announced on the error topic.
async fn reject<S: Stage>(input: &S::Input, ctx: &HandlerContext<ServerDeps>, reason: String) {
    let job_id = S::job_id(input);
    warn!(stage = S::NAME, job_id = %job_id, reason = %reason, "Stage rejected job");

    let patch = JobPatch::status(JobStatus::Failed).error(reason.clone());
    if let Err(e) = Job::merge_write(job_id, &patch, ctx.deps().job_store.as_ref()).await {
        error!(stage = S::NAME, job_id = %job_id, error = %e, "Failed to record rejection");
    }

    announce_failure::<S>(input, ctx, reason);
}

/// Transient failure: `Error` plus the cause, announced on the error topic
/// when the stage has one.
async fn fault<S: Stage>(
    input: &S::Input,
    ctx: &HandlerContext<ServerDeps>,
    cause: anyhow::Error,
) {
    let job_id = S::job_id(input);
    let message = format!("{} step failed: {:#}", S::NAME, cause);
    error!(stage = S::NAME, job_id = %job_id, error = %message, "Stage failed");

    let patch = JobPatch::status(JobStatus::Error).error(message.clone());
    if let Err(e) = Job::merge_write(job_id, &patch, ctx.deps().job_store.as_ref()).await {
        error!(stage = S::NAME, job_id = %job_id, error = %e, "Failed to record stage error");
    }

    announce_failure::<S>(input, ctx, message);
}

fn announce_failure<S: Stage>(input: &S::Input, ctx: &HandlerContext<ServerDeps>, error: String) {
    let Some(topic) = S::ERROR_TOPIC else {
        return;
    };

    let payload = S::failure_context(input).error(error);
    match serde_json::to_value(&payload) {
        Ok(payload) => {
            ctx.publish(topic, payload);
        }
        Err(e) => error!(stage = S::NAME, error = %e, "Failed to encode error payload"),
    }
}
