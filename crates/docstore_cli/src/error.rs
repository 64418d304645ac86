//! CLI error types.

use docstore_core::StoreError;
use docstore_model::ModelError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// A file could not be read or written.
    #[error("{}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// Writing command output failed.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    /// A snapshot could not be decoded.
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] ModelError),

    /// An operations file could not be decoded.
    #[error("invalid operations in {}: {source}", path.display())]
    Operations {
        /// The operations file.
        path: PathBuf,
        /// The decoding error.
        source: serde_json::Error,
    },

    /// JSON encoding of a report failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store rejected the document.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The transaction failed and was rolled back.
    #[error("transaction failed ({code}): {message}")]
    TransactionFailed {
        /// Stable error code.
        code: String,
        /// Error description.
        message: String,
    },

    /// The integrity check found problems.
    #[error("verification failed with {issues} issue(s)")]
    VerificationFailed {
        /// Number of issues found.
        issues: usize,
    },
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;
