//! Batched changes produced by committing an overlay.

use docstore_model::{Decorator, DecoratorId, Node, NodeId};

/// Every write of one committed transaction, ready to merge into a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Nodes to insert or overwrite.
    pub node_puts: Vec<Node>,
    /// Nodes to remove.
    pub node_deletes: Vec<NodeId>,
    /// Decorators to insert or overwrite.
    pub decorator_puts: Vec<Decorator>,
    /// Decorators to remove.
    pub decorator_deletes: Vec<DecoratorId>,
}

impl ChangeSet {
    /// Returns true if the set changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_puts.is_empty()
            && self.node_deletes.is_empty()
            && self.decorator_puts.is_empty()
            && self.decorator_deletes.is_empty()
    }

    /// Returns the total number of changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.node_puts.len()
            + self.node_deletes.len()
            + self.decorator_puts.len()
            + self.decorator_deletes.len()
    }
}
