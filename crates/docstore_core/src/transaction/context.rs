//! Shared context handed to every operation of a transaction.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::graph::NodeGraph;
use crate::schema::Schema;
use crate::traverse::NodeReader;
use docstore_model::{Decorator, DecoratorId, Node, NodeId, Selection};
use docstore_storage::{Overlay, StorageError};

/// The view operations run against: committed base plus this transaction's
/// overlay, the selection (as it was at begin and as it is now), the schema
/// and the store configuration.
///
/// Reads through the context see the transaction's own writes. Nothing
/// outside the transaction does until commit.
pub struct TransactionContext<'a> {
    graph: &'a NodeGraph,
    overlay: Overlay,
    schema: &'a dyn Schema,
    config: &'a StoreConfig,
    selection_before: Option<Selection>,
    selection: Option<Selection>,
}

impl<'a> TransactionContext<'a> {
    pub(crate) fn new(
        graph: &'a NodeGraph,
        schema: &'a dyn Schema,
        config: &'a StoreConfig,
        selection: Option<Selection>,
    ) -> Self {
        Self {
            overlay: Overlay::new(graph.root_id().clone()),
            graph,
            schema,
            config,
            selection_before: selection.clone(),
            selection,
        }
    }

    /// Returns the schema in force.
    #[must_use]
    pub fn schema(&self) -> &dyn Schema {
        self.schema
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        self.config
    }

    /// Returns the selection as it was when the transaction began.
    #[must_use]
    pub fn selection_before(&self) -> Option<&Selection> {
        self.selection_before.as_ref()
    }

    /// Returns the current selection projection.
    #[must_use]
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub(crate) fn selection_mut(&mut self) -> &mut Option<Selection> {
        &mut self.selection
    }

    /// Replaces the selection projection, returning the previous one.
    pub(crate) fn replace_selection(&mut self, selection: Option<Selection>) -> Option<Selection> {
        std::mem::replace(&mut self.selection, selection)
    }

    /// Returns the overlay written so far.
    #[must_use]
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub(crate) fn begin_operation(&mut self, name: &'static str) {
        self.overlay.begin_operation(name);
    }

    pub(crate) fn into_parts(self) -> (Overlay, Option<Selection>) {
        (self.overlay, self.selection)
    }

    /// Returns the node or `NotFound`.
    pub(crate) fn node(&self, id: &NodeId) -> StoreResult<Node> {
        self.get_node(id).ok_or_else(|| StoreError::node_not_found(id))
    }

    /// Returns the node if it is a text leaf.
    pub(crate) fn text_node(&self, id: &NodeId) -> StoreResult<Node> {
        let node = self.node(id)?;
        if !node.is_text() {
            return Err(StoreError::structural(format!("{id} is not a text node")));
        }
        Ok(node)
    }

    pub(crate) fn put_node(&mut self, node: Node) {
        self.overlay.put_node(node);
    }

    pub(crate) fn remove_node(&mut self, id: &NodeId) -> StoreResult<()> {
        self.overlay.delete_node(id).map_err(|err| match err {
            StorageError::ProtectedNode { id } => {
                StoreError::structural(format!("cannot delete the root node {id}"))
            }
            other => StoreError::Storage(other),
        })
    }

    /// Returns every visible decorator, sorted by identifier.
    pub(crate) fn decorators(&self) -> Vec<Decorator> {
        let base = self.graph.base();
        self.overlay.visible_decorators(&**base)
    }

    /// Returns the visible decorators anchored to `node_id`.
    pub(crate) fn decorators_for(&self, node_id: &NodeId) -> Vec<Decorator> {
        self.decorators()
            .into_iter()
            .filter(|d| d.target_node() == Some(node_id))
            .collect()
    }

    pub(crate) fn put_decorator(&mut self, decorator: Decorator) {
        self.overlay.put_decorator(decorator);
    }

    pub(crate) fn remove_decorator(&mut self, id: &DecoratorId) {
        self.overlay.delete_decorator(id);
    }

    /// Runs the schema's attribute check for a node.
    pub(crate) fn check_attributes(&self, node: &Node) -> StoreResult<()> {
        self.schema
            .validate_attributes(&node.node_type, node.attrs.as_ref())
            .map_err(StoreError::validation)
    }

    /// Runs the schema's content check for a container, reading its
    /// children through the overlay.
    pub(crate) fn check_content(&self, node: &Node) -> StoreResult<()> {
        let children: Vec<Node> = node
            .children()
            .iter()
            .map(|id| self.node(id))
            .collect::<StoreResult<_>>()?;
        let types: Vec<&str> = children.iter().map(|c| c.node_type.as_str()).collect();
        self.schema
            .validate_content(&node.node_type, &types)
            .map_err(StoreError::validation)
    }
}

impl NodeReader for TransactionContext<'_> {
    fn get_node(&self, id: &NodeId) -> Option<Node> {
        let base = self.graph.base();
        self.overlay.read_node(&**base, id)
    }

    fn get_decorator(&self, id: &DecoratorId) -> Option<Decorator> {
        let base = self.graph.base();
        self.overlay.read_decorator(&**base, id)
    }

    fn root_id(&self) -> &NodeId {
        self.graph.root_id()
    }
}

impl std::fmt::Debug for TransactionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("writes", &self.overlay.records().len())
            .field("selection", &self.selection)
            .finish()
    }
}
