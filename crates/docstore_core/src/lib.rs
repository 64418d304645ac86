//! # Docstore Core
//!
//! Transactional document store engine.
//!
//! This crate provides:
//! - The committed [`NodeGraph`] and read helpers in [`traverse`]
//! - Range adjustment for marks, decorators and selections ([`ranges`])
//! - The operation library with exact-restore inverses
//! - All-or-nothing transactions with a live selection projection
//! - Combinator expansion (`forEachNode`, `when`, `deleteSpan`, `applyMarkSpan`)
//! - Undo/redo [`History`], a [`ChangeFeed`] of commits and [`StoreStats`]
//! - A structural [`check_integrity`] pass over snapshots
//!
//! [`DocumentStore`] ties these together.
//!
//! ## Example
//!
//! ```rust
//! use docstore_core::{DocumentStore, NodeReader, StoreConfig};
//! use docstore_model::{NodeInit, Operation};
//!
//! let store = DocumentStore::in_memory(StoreConfig::default()).unwrap();
//! let result = store.run(&[Operation::create_node(
//!     NodeInit::container("paragraph").child(NodeInit::text("Hi").with_id("t1")),
//!     None,
//!     None,
//! )]);
//! assert!(result.success);
//! assert!(store.has_node(&"t1".into()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_feed;
mod config;
mod error;
mod graph;
mod history;
mod integrity;
pub mod marks;
mod ops;
pub mod ranges;
mod schema;
pub mod selection;
mod stats;
mod store;
mod transaction;
pub mod traverse;
mod types;

pub use change_feed::{ChangeFeed, CommitEvent};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use graph::NodeGraph;
pub use history::History;
pub use integrity::{check_integrity, IntegrityIssue, IntegrityReport};
pub use ops::Applied;
pub use schema::{ContentModel, PermissiveSchema, RuleSchema, Schema, TypeRule};
pub use stats::{StatsSnapshot, StoreStats};
pub use store::DocumentStore;
pub use transaction::{
    Transaction, TransactionContext, TransactionManager, TransactionResult, TransactionState,
    WriteTransaction,
};
pub use traverse::NodeReader;
pub use types::{SequenceNumber, TransactionId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
