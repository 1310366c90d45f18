use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::num::NonZeroU32;

use crate::kernel::{DEFAULT_MAX_VIDEOS, GEMINI_2_FLASH};

/// Gemini's OpenAI-compatible endpoint.
pub const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub youtube_api_key: String,
    pub ai_api_key: String,
    pub ai_base_url: String,
    pub ai_model: String,
    pub resend_api_key: String,
    pub resend_from_email: String,
    pub max_videos: u32,
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} must be set", key))
        };

        Ok(Self {
            port: lookup("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            youtube_api_key: required("YOUTUBE_API_KEY")?,
            ai_api_key: required("GEMINI_AI_API_KEY")?,
            ai_base_url: lookup("AI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_AI_BASE_URL.to_string()),
            ai_model: lookup("AI_MODEL").unwrap_or_else(|| GEMINI_2_FLASH.to_string()),
            resend_api_key: required("RESEND_API_KEY")?,
            resend_from_email: required("RESEND_FROM_EMAIL")?,
            max_videos: match lookup("MAX_VIDEOS") {
                Some(raw) => raw
                    .trim()
                    .parse::<NonZeroU32>()
                    .context("MAX_VIDEOS must be a positive number")?
                    .get(),
                None => DEFAULT_MAX_VIDEOS,
            },
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}
