//! Process configuration
//!
//! Built once at startup from the environment (after `.env` is loaded)
//! and handed to the components that need it.

use crate::error::AgentError;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_TRANSACTIONS_FILE: &str = "documents/transactions.csv";

const PLACEHOLDER_API_KEY: &str = "your_gemini_api_key_here";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub transactions_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub max_iterations: usize,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl AgentConfig {
    /// Configuration with every default filled in and the given credential.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            transactions_path: PathBuf::from(DEFAULT_TRANSACTIONS_FILE),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            max_iterations: 10,
            temperature: 0.0,
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = non_empty("GEMINI_API_KEY")
            .filter(|key| key != PLACEHOLDER_API_KEY)
            .ok_or_else(|| {
                AgentError::ConfigError(
                    "GEMINI_API_KEY not configured. Set it in the environment or a .env file"
                        .to_string(),
                )
            })?;

        let mut config = Self::new(api_key);

        if let Some(url) = non_empty("GEMINI_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = non_empty("GEMINI_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Some(model) = non_empty("GEMINI_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(path) = non_empty("TRANSACTIONS_FILE") {
            config.transactions_path = PathBuf::from(path);
        }

        Ok(config)
    }
}
