//! Error types for the transactions agent

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Startup Errors
    // =============================

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to read transactions file {}: {source}", .path.display())]
    DocumentError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =============================
    // External Service Errors
    // =============================

    #[error("Embedding service error: {0}")]
    EmbeddingServiceError(String),

    #[error("Model service error: {0}")]
    ModelServiceError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AgentError {
    /// Errors that stop the process before the interactive loop starts.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AgentError::ConfigError(_) | AgentError::DocumentError { .. }
        )
    }
}
