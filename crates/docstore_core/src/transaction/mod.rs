//! All-or-nothing transactions over the document.
//!
//! A transaction:
//! - Holds the single store lock for its whole life (fail-fast, no nesting)
//! - Writes only to a copy-on-write overlay until commit
//! - Threads a live selection projection through every operation
//! - Records each operation's inverse for undo and redo

mod context;
mod manager;
mod state;

pub use context::TransactionContext;
pub use manager::{TransactionManager, WriteTransaction};
pub use state::{Transaction, TransactionResult, TransactionState};
