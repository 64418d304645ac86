//! In-memory storage backend.

use crate::backend::GraphBackend;
use crate::change_set::ChangeSet;
use crate::error::{StorageError, StorageResult};
use docstore_model::{Decorator, DecoratorId, Node, NodeId};
use std::collections::HashMap;

/// A HashMap-backed graph backend.
///
/// The backend itself is not synchronized; the store wraps it in a lock and
/// applies change sets under a single write guard.
///
/// # Example
///
/// ```rust
/// use docstore_model::{Node, NodeId};
/// use docstore_storage::{GraphBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::with_root(Node::container("root", "doc"));
/// assert!(backend.has_node(&NodeId::from("root")));
/// assert!(backend.remove_node(&NodeId::from("root")).is_err());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    nodes: HashMap<NodeId, Node>,
    decorators: HashMap<DecoratorId, Decorator>,
    protected: Option<NodeId>,
}

impl InMemoryBackend {
    /// Creates an empty backend with no protected root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding `root`, which can never be removed.
    #[must_use]
    pub fn with_root(root: Node) -> Self {
        let mut backend = Self {
            protected: Some(root.id.clone()),
            ..Self::default()
        };
        backend.nodes.insert(root.id.clone(), root);
        backend
    }

    /// Marks `id` as the protected root.
    pub fn protect(&mut self, id: NodeId) {
        self.protected = Some(id);
    }

    fn ensure_removable(&self, id: &NodeId) -> StorageResult<()> {
        if self.protected.as_ref() == Some(id) {
            return Err(StorageError::ProtectedNode { id: id.to_string() });
        }
        Ok(())
    }
}

impl GraphBackend for InMemoryBackend {
    fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.nodes.get(id).cloned()
    }

    fn has_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    fn put_node(&mut self, node: Node) -> StorageResult<()> {
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    fn remove_node(&mut self, id: &NodeId) -> StorageResult<Option<Node>> {
        self.ensure_removable(id)?;
        Ok(self.nodes.remove(id))
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn get_decorator(&self, id: &DecoratorId) -> Option<Decorator> {
        self.decorators.get(id).cloned()
    }

    fn put_decorator(&mut self, decorator: Decorator) -> StorageResult<()> {
        self.decorators.insert(decorator.id.clone(), decorator);
        Ok(())
    }

    fn remove_decorator(&mut self, id: &DecoratorId) -> StorageResult<Option<Decorator>> {
        Ok(self.decorators.remove(id))
    }

    fn decorators(&self) -> Vec<Decorator> {
        self.decorators.values().cloned().collect()
    }

    fn check_deletions(&self, changes: &ChangeSet) -> StorageResult<()> {
        changes
            .node_deletes
            .iter()
            .try_for_each(|id| self.ensure_removable(id))
    }
}
