//! Transaction state and the records a transaction leaves behind.

use crate::error::StoreError;
use crate::types::{SequenceNumber, TransactionId};
use docstore_model::{Operation, Selection};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// State of a write transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can apply operations.
    Active,
    /// An operation failed. The overlay is unusable; only abort remains.
    Failed,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted.
    Aborted,
}

/// A committed transaction.
///
/// This is the record undo/redo history keeps: replaying
/// [`inverse_operations`](Self::inverse_operations) through a new
/// transaction undoes the commit, replaying
/// [`operations`](Self::operations) redoes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    id: TransactionId,
    sequence: SequenceNumber,
    operations: Vec<Operation>,
    inverse_operations: Vec<Operation>,
    selection_before: Option<Selection>,
    selection_after: Option<Selection>,
    results: Vec<Value>,
}

impl Transaction {
    pub(crate) fn new(
        id: TransactionId,
        sequence: SequenceNumber,
        operations: Vec<Operation>,
        inverse_operations: Vec<Operation>,
        selection_before: Option<Selection>,
        selection_after: Option<Selection>,
        results: Vec<Value>,
    ) -> Self {
        Self {
            id,
            sequence,
            operations,
            inverse_operations,
            selection_before,
            selection_after,
            results,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the commit sequence number.
    #[must_use]
    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    /// Returns the executed leaf operations, combinators resolved and
    /// generated identifiers filled in.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Returns the operations that undo this transaction, in execution
    /// order.
    #[must_use]
    pub fn inverse_operations(&self) -> &[Operation] {
        &self.inverse_operations
    }

    /// Returns the selection at begin.
    #[must_use]
    pub fn selection_before(&self) -> Option<&Selection> {
        self.selection_before.as_ref()
    }

    /// Returns the committed selection.
    #[must_use]
    pub fn selection_after(&self) -> Option<&Selection> {
        self.selection_after.as_ref()
    }

    /// Returns the per-operation result data, parallel to
    /// [`operations`](Self::operations).
    #[must_use]
    pub fn results(&self) -> &[Value] {
        &self.results
    }

    /// Returns true if the transaction changed nothing worth undoing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.inverse_operations.is_empty()
    }
}

/// The result shape returned to every external caller.
///
/// On failure the document and the selection are unchanged,
/// `selection_after` equals `selection_before` and both operation lists are
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    /// Whether the transaction committed.
    pub success: bool,
    /// Selection when the transaction began.
    pub selection_before: Option<Selection>,
    /// Selection after commit (or `selection_before` on failure).
    pub selection_after: Option<Selection>,
    /// Executed operations.
    pub operations: Vec<Operation>,
    /// Undo operations.
    pub inverse_operations: Vec<Operation>,
    /// Error description on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stable error code on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl TransactionResult {
    /// A failed result that leaves the selection where it was.
    #[must_use]
    pub fn failure(selection: Option<Selection>, error: &StoreError) -> Self {
        Self {
            success: false,
            selection_before: selection.clone(),
            selection_after: selection,
            operations: Vec::new(),
            inverse_operations: Vec::new(),
            error: Some(error.to_string()),
            error_code: Some(error.code().to_string()),
        }
    }
}

impl From<Transaction> for TransactionResult {
    fn from(txn: Transaction) -> Self {
        Self {
            success: true,
            selection_before: txn.selection_before,
            selection_after: txn.selection_after,
            operations: txn.operations,
            inverse_operations: txn.inverse_operations,
            error: None,
            error_code: None,
        }
    }
}
