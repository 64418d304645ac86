//! Committed node graph.

use crate::error::{StoreError, StoreResult};
use crate::traverse::NodeReader;
use docstore_model::{Decorator, DecoratorId, DocumentSnapshot, Node, NodeId, Selection};
use docstore_storage::{ChangeSet, GraphBackend};
use parking_lot::{RwLock, RwLockReadGuard};

/// The committed (base) state of a document.
///
/// Readers take a shared guard per call and therefore always observe a
/// whole commit: [`NodeGraph::commit`] applies a change set under a single
/// exclusive guard.
pub struct NodeGraph {
    backend: RwLock<Box<dyn GraphBackend>>,
    root_id: NodeId,
}

impl NodeGraph {
    /// Wraps a backend. The backend must already hold `root_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the root is missing.
    pub fn new(backend: Box<dyn GraphBackend>, root_id: NodeId) -> StoreResult<Self> {
        if !backend.has_node(&root_id) {
            return Err(StoreError::node_not_found(&root_id));
        }
        Ok(Self {
            backend: RwLock::new(backend),
            root_id,
        })
    }

    pub(crate) fn base(&self) -> RwLockReadGuard<'_, Box<dyn GraphBackend>> {
        self.backend.read()
    }

    /// Merges a transaction's change set into the base.
    pub(crate) fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        self.backend.write().apply(changes)?;
        Ok(())
    }

    /// Writes nodes and decorators straight into the base.
    pub(crate) fn load(&self, nodes: Vec<Node>, decorators: Vec<Decorator>) -> StoreResult<()> {
        let changes = ChangeSet {
            node_puts: nodes,
            decorator_puts: decorators,
            ..ChangeSet::default()
        };
        self.commit(changes)
    }

    /// Returns the number of committed nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.backend.read().node_count()
    }

    /// Returns every committed node identifier, sorted.
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids = self.backend.read().node_ids();
        ids.sort();
        ids
    }

    /// Returns every committed decorator, sorted by identifier.
    #[must_use]
    pub fn decorators(&self) -> Vec<Decorator> {
        let mut decorators = self.backend.read().decorators();
        decorators.sort_by(|a, b| a.id.cmp(&b.id));
        decorators
    }

    /// Returns the decorators anchored to `node_id`.
    #[must_use]
    pub fn decorators_for(&self, node_id: &NodeId) -> Vec<Decorator> {
        self.decorators()
            .into_iter()
            .filter(|d| d.target_node() == Some(node_id))
            .collect()
    }

    /// Copies the whole committed state into a snapshot.
    #[must_use]
    pub fn snapshot(&self, selection: Option<Selection>) -> DocumentSnapshot {
        let base = self.backend.read();
        let mut snapshot = DocumentSnapshot {
            root_id: self.root_id.clone(),
            nodes: base
                .node_ids()
                .iter()
                .filter_map(|id| base.get_node(id))
                .collect(),
            decorators: base.decorators(),
            selection,
        };
        snapshot.canonicalize();
        snapshot
    }
}

impl NodeReader for NodeGraph {
    fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.backend.read().get_node(id)
    }

    fn has_node(&self, id: &NodeId) -> bool {
        self.backend.read().has_node(id)
    }

    fn get_decorator(&self, id: &DecoratorId) -> Option<Decorator> {
        self.backend.read().get_decorator(id)
    }

    fn root_id(&self) -> &NodeId {
        &self.root_id
    }
}

impl std::fmt::Debug for NodeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeGraph")
            .field("root_id", &self.root_id)
            .field("nodes", &self.node_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_storage::InMemoryBackend;

    fn graph() -> NodeGraph {
        let backend = InMemoryBackend::with_root(Node::container("root", "doc"));
        NodeGraph::new(Box::new(backend), "root".into()).unwrap()
    }

    #[test]
    fn requires_root() {
        let result = NodeGraph::new(Box::new(InMemoryBackend::new()), "root".into());
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn commit_is_visible_to_readers() {
        let graph = graph();
        let changes = ChangeSet {
            node_puts: vec![Node::text("t1", "hi")],
            ..ChangeSet::default()
        };
        graph.commit(changes).unwrap();
        assert!(graph.has_node(&"t1".into()));
        assert_eq!(graph.node_ids().len(), 2);
    }

    #[test]
    fn root_deletion_is_rejected() {
        let graph = graph();
        let changes = ChangeSet {
            node_deletes: vec!["root".into()],
            ..ChangeSet::default()
        };
        let err = graph.commit(changes).unwrap_err();
        assert_eq!(err.code(), "STRUCTURAL_VIOLATION");
        assert!(graph.has_node(&"root".into()));
    }

    #[test]
    fn snapshot_is_canonical() {
        let graph = graph();
        graph
            .load(vec![Node::text("b", ""), Node::text("a", "")], Vec::new())
            .unwrap();
        let snapshot = graph.snapshot(None);
        let ids: Vec<_> = snapshot.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "root"]);
    }
}
