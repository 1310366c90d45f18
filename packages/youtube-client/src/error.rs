//! Error types for the YouTube client.

use thiserror::Error;

/// Result type for YouTube client operations.
pub type Result<T> = std::result::Result<T, YouTubeError>;

#[derive(Debug, Error)]
pub enum YouTubeError {
    /// Configuration error (missing API key)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// API error (quota exceeded, invalid key, bad request)
    #[error("YouTube API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Parse error (unexpected response shape)
    #[error("Parse error: {0}")]
    Parse(String),
}
