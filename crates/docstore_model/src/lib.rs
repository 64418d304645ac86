//! # Docstore Model
//!
//! Data model and wire types for the docstore document store.
//!
//! This crate provides:
//! - [`Node`] graph records addressed by [`NodeId`]
//! - [`Mark`] ranges over leaf text and [`Decorator`] annotations
//! - [`Selection`] values threaded through transactions
//! - The closed [`Operation`] catalog with its `{type, payload}` wire shape
//! - [`DocumentSnapshot`] for JSON import/export
//!
//! Text offsets everywhere in this crate are counted in Unicode scalar values
//! (`char`s), never bytes. The [`text`] module holds the helpers that convert
//! between the two.
//!
//! ## Example
//!
//! ```rust
//! use docstore_model::{Operation, InsertTextPayload, NodeId};
//!
//! let op = Operation::InsertText(InsertTextPayload {
//!     node_id: NodeId::from("t1"),
//!     pos: 0,
//!     text: "Hi".to_string(),
//! });
//! let json = serde_json::to_value(&op).unwrap();
//! assert_eq!(json["type"], "insertText");
//! assert_eq!(json["payload"]["nodeId"], "t1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decorator;
mod error;
mod id;
mod mark;
mod node;
mod operation;
mod selection;
mod snapshot;
pub mod text;

pub use decorator::{Decorator, DecoratorCategory, DecoratorTarget};
pub use error::{ModelError, ModelResult};
pub use id::{DecoratorId, NodeId};
pub use mark::{Mark, Span};
pub use node::{Attrs, ChildInit, Node, NodeInit};
pub use operation::{
    AddChildPayload, AddDecoratorPayload, ApplyMarkSpanPayload, Condition, CreateNodePayload,
    DeleteNodePayload, DeleteSpanPayload, DeleteTextPayload, ForEachNodePayload,
    InsertTextPayload, MarkPayload, MergeNodesPayload, MoveNodePayload, NodeSelector,
    Operation, RemoveChildPayload, RemoveDecoratorPayload, ReorderChildrenPayload,
    ReplaceTextPayload, SetMarksPayload, SetSelectionPayload, SplitBlockPayload,
    SplitTextPayload, UpdateNodePayload, WhenPayload,
};
pub use selection::{RangeSelection, Selection};
pub use snapshot::DocumentSnapshot;
