//! Storage backend trait definition.

use crate::change_set::ChangeSet;
use crate::error::StorageResult;
use docstore_model::{Decorator, DecoratorId, Node, NodeId};

/// Committed storage for nodes and decorators.
///
/// Backends are keyed stores. They do not validate graph structure, marks
/// or decorator targets; the operation library owns those invariants.
///
/// # Invariants
///
/// - `get_node` returns exactly the node last passed to `put_node` for that id
/// - `apply` makes every change in the set visible at once to callers that
///   hold the backend behind a lock
/// - Backends must be `Send + Sync` so the store can share them
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - HashMap storage
pub trait GraphBackend: Send + Sync {
    /// Returns a copy of the node.
    fn get_node(&self, id: &NodeId) -> Option<Node>;

    /// Returns true if the node is stored.
    fn has_node(&self, id: &NodeId) -> bool;

    /// Inserts or replaces a node.
    ///
    /// # Errors
    ///
    /// Implementations may reject writes they cannot store.
    fn put_node(&mut self, node: Node) -> StorageResult<()>;

    /// Removes a node, returning it if it was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is protected (the document root).
    fn remove_node(&mut self, id: &NodeId) -> StorageResult<Option<Node>>;

    /// Returns every stored node identifier.
    fn node_ids(&self) -> Vec<NodeId>;

    /// Returns the number of stored nodes.
    fn node_count(&self) -> usize;

    /// Returns a copy of the decorator.
    fn get_decorator(&self, id: &DecoratorId) -> Option<Decorator>;

    /// Inserts or replaces a decorator.
    ///
    /// # Errors
    ///
    /// Implementations may reject writes they cannot store.
    fn put_decorator(&mut self, decorator: Decorator) -> StorageResult<()>;

    /// Removes a decorator, returning it if it was stored.
    ///
    /// # Errors
    ///
    /// Implementations may reject removals they cannot perform.
    fn remove_decorator(&mut self, id: &DecoratorId) -> StorageResult<Option<Decorator>>;

    /// Returns copies of every stored decorator.
    fn decorators(&self) -> Vec<Decorator>;

    /// Applies a change set.
    ///
    /// The default implementation checks every deletion first so a protected
    /// node aborts the set before anything is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the set deletes a protected node.
    fn apply(&mut self, changes: ChangeSet) -> StorageResult<()> {
        self.check_deletions(&changes)?;
        for node in changes.node_puts {
            self.put_node(node)?;
        }
        for id in &changes.node_deletes {
            self.remove_node(id)?;
        }
        for decorator in changes.decorator_puts {
            self.put_decorator(decorator)?;
        }
        for id in &changes.decorator_deletes {
            self.remove_decorator(id)?;
        }
        Ok(())
    }

    /// Validates the deletions in a change set without applying anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the set deletes a protected node.
    fn check_deletions(&self, changes: &ChangeSet) -> StorageResult<()> {
        let _ = changes;
        Ok(())
    }
}
