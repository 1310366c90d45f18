use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domains::jobs::Job;
use crate::server::app::AppState;

/// Current state of a job, exactly as the pipeline stored it.
pub async fn get_job_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<String>,
) -> Response {
    match Job::find_raw(&job_id, state.deps().job_store.as_ref()).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Job not found" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Failed to read job");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal Server Error" })),
            )
                .into_response()
        }
    }
}
