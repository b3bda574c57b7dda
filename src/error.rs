//! Error types for learning-progress

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for ProgressError {
    fn from(e: rusqlite::Error) -> Self {
        ProgressError::Storage(e.to_string())
    }
}

impl ProgressError {
    /// Shorthand used by validators
    pub fn invalid(message: impl Into<String>) -> Self {
        ProgressError::InvalidInput(message.into())
    }
}
