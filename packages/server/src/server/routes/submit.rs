use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::common::FieldErrors;
use crate::domains::pipeline::{submit_job, SubmitError};
use crate::server::app::AppState;

pub const INVALID_SUBMISSION: &str = "All fields are required and must be valid.";

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub channel: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    success: bool,
    job_id: String,
    message: String,
}

fn invalid(details: &FieldErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": INVALID_SUBMISSION, "details": details })),
    )
        .into_response()
}

/// Accept a channel + email and queue a job.
pub async fn submit_handler(
    Extension(state): Extension<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected malformed submission");
            let mut details = FieldErrors::new();
            details.add("body", rejection.body_text());
            return invalid(&details);
        }
    };

    match submit_job(
        request.channel.as_deref(),
        request.email.as_deref(),
        &state.engine,
    )
    .await
    {
        Ok(submission) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                success: true,
                job_id: submission.job_id,
                message: submission.message.to_string(),
            }),
        )
            .into_response(),
        Err(SubmitError::Validation(details)) => invalid(&details),
        Err(SubmitError::Internal(e)) => {
            tracing::error!(error = %format!("{:#}", e), "Failed to queue job");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal Server Error" })),
            )
                .into_response()
        }
    }
}
