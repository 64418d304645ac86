//! # Docstore Storage
//!
//! Node graph storage and the copy-on-write overlay for docstore.
//!
//! This crate provides the lowest-level storage abstraction. Backends hold
//! committed ("base") nodes and decorators by identifier; they know nothing
//! about transactions, marks or selections.
//!
//! ## Design Principles
//!
//! - Backends are simple keyed stores (get, has, put, remove)
//! - A transaction never writes a backend directly: it writes an [`Overlay`]
//! - Committing turns the overlay into a [`ChangeSet`] applied in one call
//! - Aborting drops the overlay; the backend is untouched
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - HashMap-backed storage
//!
//! ## Example
//!
//! ```rust
//! use docstore_model::{Node, NodeId};
//! use docstore_storage::{GraphBackend, InMemoryBackend, Overlay};
//!
//! let mut base = InMemoryBackend::new();
//! base.put_node(Node::container("root", "doc")).unwrap();
//!
//! let mut overlay = Overlay::new(NodeId::from("root"));
//! overlay.put_node(Node::text("t1", "hi"));
//! assert!(overlay.read_node(&base, &NodeId::from("t1")).is_some());
//! assert!(!base.has_node(&NodeId::from("t1")));
//!
//! base.apply(overlay.into_change_set()).unwrap();
//! assert!(base.has_node(&NodeId::from("t1")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod change_set;
mod error;
mod memory;
mod overlay;

pub use backend::GraphBackend;
pub use change_set::ChangeSet;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryBackend;
pub use overlay::{Overlay, OverlayRecord, RecordTarget, Slot, WriteKind};
