//! Error types for docstore core.

use docstore_model::ModelError;
use docstore_storage::StorageError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or transacting on a document.
///
/// Every variant maps to a stable wire code via [`StoreError::code`]. The
/// codes are what collaboration adapters and the CLI report.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Payload or snapshot decoding error.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// The schema rejected attributes or content.
    #[error("validation failed: {}", .messages.join("; "))]
    Validation {
        /// Messages reported by the schema.
        messages: Vec<String>,
    },

    /// A referenced node or decorator does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was looked up (`node`, `decorator`, `child`).
        kind: &'static str,
        /// The missing identifier.
        id: String,
    },

    /// The operation would break the node graph (root deletion, cycles,
    /// leaf/container confusion, non-adjacent merges).
    #[error("structural violation: {message}")]
    StructuralViolation {
        /// Description of the violation.
        message: String,
    },

    /// Another transaction holds the store lock.
    #[error("lock contention: a transaction is already active")]
    LockContention,

    /// A text offset or child position lies outside its target.
    #[error("offset {offset} out of range for {node_id} (length {len})")]
    OutOfRange {
        /// The node addressed.
        node_id: String,
        /// The offending offset or position.
        offset: usize,
        /// The valid upper bound.
        len: usize,
    },

    /// The operation is malformed or not applicable.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of the problem.
        message: String,
    },

    /// Combinator expansion nested deeper than configured.
    #[error("combinator expansion exceeded depth {limit}")]
    ExpansionTooDeep {
        /// The configured limit.
        limit: usize,
    },

    /// An operation inside a transaction failed; the transaction was rolled
    /// back.
    #[error("operation {index} ({operation}) failed: {source}")]
    OperationFailed {
        /// Zero-based index in the submitted operation list.
        index: usize,
        /// Wire name of the failing operation.
        operation: &'static str,
        /// The underlying error.
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Creates a validation error from schema messages.
    pub fn validation(messages: Vec<String>) -> Self {
        Self::Validation { messages }
    }

    /// Creates a not-found error for a node.
    pub fn node_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "node",
            id: id.to_string(),
        }
    }

    /// Creates a not-found error for a decorator.
    pub fn decorator_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "decorator",
            id: id.to_string(),
        }
    }

    /// Creates a structural violation error.
    pub fn structural(message: impl Into<String>) -> Self {
        Self::StructuralViolation {
            message: message.into(),
        }
    }

    /// Creates an out-of-range error.
    pub fn out_of_range(node_id: impl ToString, offset: usize, len: usize) -> Self {
        Self::OutOfRange {
            node_id: node_id.to_string(),
            offset,
            len,
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the stable wire code for this error.
    ///
    /// [`StoreError::OperationFailed`] reports the code of its cause.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage(StorageError::ProtectedNode { .. }) => "STRUCTURAL_VIOLATION",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Model(_) | Self::InvalidOperation { .. } | Self::ExpansionTooDeep { .. } => {
                "INVALID_OPERATION"
            }
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::StructuralViolation { .. } => "STRUCTURAL_VIOLATION",
            Self::LockContention => "LOCK_CONTENTION",
            Self::OutOfRange { .. } => "OUT_OF_RANGE",
            Self::OperationFailed { source, .. } => source.code(),
        }
    }

    /// Returns the innermost error, unwrapping [`StoreError::OperationFailed`].
    #[must_use]
    pub fn root_cause(&self) -> &StoreError {
        match self {
            Self::OperationFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(StoreError::validation(vec![]).code(), "VALIDATION_ERROR");
        assert_eq!(StoreError::node_not_found("x").code(), "NOT_FOUND");
        assert_eq!(StoreError::structural("x").code(), "STRUCTURAL_VIOLATION");
        assert_eq!(StoreError::LockContention.code(), "LOCK_CONTENTION");
        assert_eq!(StoreError::out_of_range("t1", 9, 3).code(), "OUT_OF_RANGE");
        assert_eq!(StoreError::invalid_operation("x").code(), "INVALID_OPERATION");
    }

    #[test]
    fn operation_failed_reports_cause() {
        let err = StoreError::OperationFailed {
            index: 1,
            operation: "deleteTextRange",
            source: Box::new(StoreError::out_of_range("t1", 60, 11)),
        };
        assert_eq!(err.code(), "OUT_OF_RANGE");
        assert!(matches!(err.root_cause(), StoreError::OutOfRange { .. }));
        assert!(err.to_string().contains("deleteTextRange"));
    }

    #[test]
    fn validation_message_joins() {
        let err = StoreError::validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "validation failed: a; b");
    }

    #[test]
    fn protected_storage_error_is_structural() {
        let err = StoreError::from(StorageError::ProtectedNode { id: "root".into() });
        assert_eq!(err.code(), "STRUCTURAL_VIOLATION");
    }
}
