//! Error types for model decoding.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while decoding model values.
#[derive(Debug, Error)]
pub enum ModelError {
    /// JSON could not be parsed into the expected shape.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A snapshot references data that does not line up.
    #[error("invalid snapshot: {message}")]
    InvalidSnapshot {
        /// Description of the problem.
        message: String,
    },
}

impl ModelError {
    /// Creates an invalid snapshot error.
    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            message: message.into(),
        }
    }
}
