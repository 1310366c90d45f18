// https://resend.com/docs/api-reference/emails/send-email

pub mod models;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{ApiErrorBody, SendEmailRequest, SendEmailResponse};

const DEFAULT_BASE_URL: &str = "https://api.resend.com";

#[derive(Debug, Error)]
pub enum ResendError {
    #[error("Resend request failed: {0}")]
    Network(String),

    #[error("Resend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Error parsing Resend response: {0}")]
    Parse(String),
}

#[derive(Debug, Clone)]
pub struct ResendOptions {
    pub api_key: String,
    /// Sender address, e.g. `Title Doctor <doctor@example.com>`
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct ResendService {
    options: ResendOptions,
    base_url: String,
    client: Client,
}

impl ResendService {
    pub fn new(options: ResendOptions) -> Self {
        Self {
            options,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Point at a different API host (tests, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_address(&self) -> &str {
        &self.options.from
    }

    /// Send a plain-text email to a single recipient.
    pub async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text: &str,
    ) -> Result<SendEmailResponse, ResendError> {
        let body = SendEmailRequest {
            from: self.options.from.clone(),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            text: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.options.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "request to Resend failed");
                ResendError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&raw)
                .ok()
                .and_then(|b| b.message.or(b.name))
                .unwrap_or(raw);
            warn!(status = %status, error = %message, "Resend returned an error");
            return Err(ResendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let sent = response
            .json::<SendEmailResponse>()
            .await
            .map_err(|e| ResendError::Parse(e.to_string()))?;

        debug!(email_id = %sent.id, "email accepted by Resend");
        Ok(sent)
    }
}
