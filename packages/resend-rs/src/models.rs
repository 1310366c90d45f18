use serde::{Deserialize, Serialize};

/// Body of `POST /emails`.
#[derive(Debug, Clone, Serialize)]
pub struct SendEmailRequest {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
}

/// Successful response of `POST /emails`.
#[derive(Debug, Clone, Deserialize)]
pub struct SendEmailResponse {
    /// Provider message ID
    pub id: String,
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}
