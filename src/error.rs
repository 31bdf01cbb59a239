//! Error types for Verbatim.

use crate::retry::RetryFailure;
use thiserror::Error;

/// Library-level error type for Verbatim operations.
#[derive(Error, Debug)]
pub enum VerbatimError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document source error: {0}")]
    Source(String),

    #[error("Guide parse error: {0}")]
    Guide(String),

    #[error("Task pool '{0}' is closed")]
    PoolClosed(String),

    #[error("{label} failed after {attempts} attempts: {message}")]
    RetryExhausted {
        label: String,
        attempts: u32,
        message: String,
    },

    #[error("Result store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl VerbatimError {
    /// Wrap an exhausted retry loop with the call label it belongs to.
    pub fn exhausted(label: &str, failure: RetryFailure) -> Self {
        VerbatimError::RetryExhausted {
            label: label.to_string(),
            attempts: failure.stats.attempts,
            message: failure.error.to_string(),
        }
    }
}

/// Result type alias for Verbatim operations.
pub type Result<T> = std::result::Result<T, VerbatimError>;
