//! Error types for storage operations.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Attempted to delete the document root.
    #[error("node {id} is the document root and cannot be deleted")]
    ProtectedNode {
        /// The protected node.
        id: String,
    },
}
