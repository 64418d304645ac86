//! Document store facade.

use crate::change_feed::{ChangeFeed, CommitEvent};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::graph::NodeGraph;
use crate::history::History;
use crate::integrity::{check_integrity, IntegrityReport};
use crate::schema::{PermissiveSchema, Schema};
use crate::stats::{StatsSnapshot, StoreStats};
use crate::transaction::{Transaction, TransactionManager, TransactionResult};
use crate::traverse::NodeReader;
use docstore_model::{
    Decorator, DecoratorId, DocumentSnapshot, Node, NodeId, Operation, Selection,
};
use docstore_storage::{GraphBackend, InMemoryBackend};
use parking_lot::Mutex;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, info};

/// The main document handle.
///
/// `DocumentStore` ties together:
/// - The committed node graph (read it through [`NodeReader`])
/// - The transaction manager (every write goes through it)
/// - Undo/redo history of the transactions it ran
/// - The change feed and statistics
///
/// # Example
///
/// ```rust
/// use docstore_core::{DocumentStore, NodeReader, StoreConfig};
/// use docstore_model::{NodeInit, Operation, Selection};
///
/// let store = DocumentStore::in_memory(StoreConfig::default()).unwrap();
/// store
///     .execute(&[
///         Operation::create_node(
///             NodeInit::container("paragraph").child(NodeInit::text("Hello").with_id("t1")),
///             None,
///             None,
///         ),
///         Operation::set_selection(Some(Selection::caret("t1", 5))),
///     ])
///     .unwrap();
/// store.execute(&[Operation::insert_text("t1", 5, " World")]).unwrap();
///
/// let t1 = store.get_node(&"t1".into()).unwrap();
/// assert_eq!(t1.text.as_deref(), Some("Hello World"));
/// assert_eq!(store.selection(), Some(Selection::caret("t1", 11)));
///
/// store.undo().unwrap();
/// assert_eq!(store.get_node(&"t1".into()).unwrap().text.as_deref(), Some("Hello"));
/// ```
pub struct DocumentStore {
    graph: Arc<NodeGraph>,
    transactions: TransactionManager,
    history: Mutex<History>,
    stats: Arc<StoreStats>,
    feed: Arc<ChangeFeed>,
}

impl DocumentStore {
    /// Opens a store over `backend`, creating the root if it is missing.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the root cannot be written.
    pub fn open(
        mut backend: Box<dyn GraphBackend>,
        schema: Arc<dyn Schema>,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        if !backend.has_node(&config.root_id) {
            backend.put_node(Node::container(config.root_id.clone(), config.root_type.clone()))?;
        }
        let graph = Arc::new(NodeGraph::new(backend, config.root_id.clone())?);
        let stats = Arc::new(StoreStats::new());
        let feed = Arc::new(ChangeFeed::with_max_history(config.feed_history));
        let history = Mutex::new(History::new(config.history_limit));
        debug!(root = %config.root_id, "opened document store");
        let transactions = TransactionManager::new(
            Arc::clone(&graph),
            schema,
            config,
            Arc::clone(&stats),
            Arc::clone(&feed),
        );
        Ok(Self {
            graph,
            transactions,
            history,
            stats,
            feed,
        })
    }

    /// Opens an empty in-memory store that accepts any node type.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn in_memory(config: StoreConfig) -> StoreResult<Self> {
        Self::with_schema(config, Arc::new(PermissiveSchema))
    }

    /// Opens an empty in-memory store validated by `schema`.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn with_schema(config: StoreConfig, schema: Arc<dyn Schema>) -> StoreResult<Self> {
        let root = Node::container(config.root_id.clone(), config.root_type.clone());
        Self::open(Box::new(InMemoryBackend::with_root(root)), schema, config)
    }

    /// Builds an in-memory store from a snapshot.
    ///
    /// The snapshot's root identifier replaces the configured one. With
    /// `verify_on_load` set, the snapshot is integrity-checked first.
    ///
    /// # Errors
    ///
    /// Returns `StructuralViolation` listing the issues if the check fails,
    /// or `NotFound` if the root is missing.
    pub fn from_snapshot(
        snapshot: DocumentSnapshot,
        schema: Arc<dyn Schema>,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        if config.verify_on_load {
            ensure_sound(&check_integrity(&snapshot))?;
        }
        let config = config.root_id(snapshot.root_id.clone());

        let mut backend = InMemoryBackend::new();
        for node in snapshot.nodes {
            backend.put_node(node)?;
        }
        for decorator in snapshot.decorators {
            backend.put_decorator(decorator)?;
        }
        backend.protect(snapshot.root_id.clone());
        if !backend.has_node(&snapshot.root_id) {
            return Err(StoreError::node_not_found(&snapshot.root_id));
        }

        let store = Self::open(Box::new(backend), schema, config)?;
        store.transactions.reset_selection(snapshot.selection);
        info!(nodes = store.graph.node_count(), "loaded document snapshot");
        Ok(store)
    }

    /// Writes nodes and decorators straight into the committed base.
    ///
    /// This bypasses operations (no inverse, no change event) and is meant
    /// for importing content. The undo history is cleared because its
    /// records may no longer apply.
    ///
    /// # Errors
    ///
    /// Returns `LockContention` while a transaction is active.
    pub fn load(&self, nodes: Vec<Node>, decorators: Vec<Decorator>) -> StoreResult<()> {
        let count = nodes.len();
        self.transactions
            .exclusive(|graph| graph.load(nodes, decorators))?;
        self.history.lock().clear();
        debug!(nodes = count, "loaded nodes into base");
        Ok(())
    }

    /// Writes one node straight into the committed base.
    ///
    /// # Errors
    ///
    /// Returns `LockContention` while a transaction is active.
    pub fn insert_base_node(&self, node: Node) -> StoreResult<()> {
        self.load(vec![node], Vec::new())
    }

    /// Runs operations as one transaction and records it for undo.
    ///
    /// # Errors
    ///
    /// See [`TransactionManager::execute`].
    pub fn execute(&self, operations: &[Operation]) -> StoreResult<Transaction> {
        let txn = self.transactions.execute(operations)?;
        self.history.lock().record(txn.clone());
        Ok(txn)
    }

    /// Runs operations and reports the outcome in the wire result shape.
    pub fn run(&self, operations: &[Operation]) -> TransactionResult {
        match self.transactions.try_execute(operations) {
            Ok(txn) => {
                self.history.lock().record(txn.clone());
                txn.into()
            }
            Err((before, err)) => TransactionResult::failure(before, &err),
        }
    }

    /// Undoes the last recorded transaction. Returns `Ok(None)` if there is
    /// nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns the replay error; the history is left unchanged.
    pub fn undo(&self) -> StoreResult<Option<Transaction>> {
        self.history.lock().undo(&self.transactions)
    }

    /// Redoes the last undone transaction.
    ///
    /// # Errors
    ///
    /// Returns the replay error; the history is left unchanged.
    pub fn redo(&self) -> StoreResult<Option<Transaction>> {
        self.history.lock().redo(&self.transactions)
    }

    /// Returns true if there is something to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.lock().can_undo()
    }

    /// Returns true if there is something to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.lock().can_redo()
    }

    /// Moves the committed selection. Not recorded for undo.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `OutOfRange` for targets that do not exist,
    /// `LockContention` while a transaction is active.
    pub fn set_selection(&self, selection: Option<Selection>) -> StoreResult<()> {
        self.transactions
            .execute(&[Operation::set_selection(selection)])
            .map(|_| ())
    }

    /// Returns the committed selection.
    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.transactions.selection()
    }

    /// Returns the transaction manager, for callers that drive transactions
    /// step by step.
    #[must_use]
    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    /// Returns the committed graph.
    #[must_use]
    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    /// Returns true while a transaction is active.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.transactions.is_active()
    }

    /// Copies the committed document and selection.
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        self.graph.snapshot(self.selection())
    }

    /// Checks the committed document for structural problems.
    #[must_use]
    pub fn verify(&self) -> IntegrityReport {
        check_integrity(&self.snapshot())
    }

    /// Subscribes to commit events.
    pub fn subscribe(&self) -> Receiver<CommitEvent> {
        self.feed.subscribe()
    }

    /// Returns commit events after `cursor`, up to `limit`.
    #[must_use]
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<CommitEvent> {
        self.feed.poll(cursor, limit)
    }

    /// Returns a snapshot of the store statistics.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl NodeReader for DocumentStore {
    fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.graph.get_node(id)
    }

    fn has_node(&self, id: &NodeId) -> bool {
        self.graph.has_node(id)
    }

    fn get_decorator(&self, id: &DecoratorId) -> Option<Decorator> {
        self.graph.get_decorator(id)
    }

    fn root_id(&self) -> &NodeId {
        self.graph.root_id()
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("graph", &self.graph)
            .field("transactions", &self.transactions)
            .finish_non_exhaustive()
    }
}

fn ensure_sound(report: &IntegrityReport) -> StoreResult<()> {
    if report.is_ok() {
        return Ok(());
    }
    let issues: Vec<String> = report.issues.iter().map(ToString::to_string).collect();
    Err(StoreError::structural(format!(
        "snapshot failed integrity check: {}",
        issues.join("; ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RuleSchema, TypeRule};
    use crate::traverse::children;
    use docstore_model::{Mark, NodeInit, RemoveChildPayload};

    fn store_with_paragraph() -> DocumentStore {
        let store = DocumentStore::in_memory(StoreConfig::default()).unwrap();
        store
            .execute(&[Operation::create_node(
                NodeInit::container("paragraph")
                    .with_id("p1")
                    .child(NodeInit::text("Hello World").with_id("t1")),
                None,
                None,
            )])
            .unwrap();
        store
    }

    #[test]
    fn in_memory_store_has_a_root() {
        let store = DocumentStore::in_memory(StoreConfig::default().root_type("page")).unwrap();
        let root = store.get_node(&"root".into()).unwrap();
        assert_eq!(root.node_type, "page");
        assert!(store.verify().is_ok());
    }

    #[test]
    fn execute_records_history() {
        let store = store_with_paragraph();
        store.execute(&[Operation::delete_text("t1", 5, 11)]).unwrap();
        assert!(store.can_undo());

        store.undo().unwrap();
        assert_eq!(store.get_node(&"t1".into()).unwrap().text.as_deref(), Some("Hello World"));
        store.undo().unwrap();
        assert!(!store.has_node(&"p1".into()));
        assert!(children(&store, &"root".into()).is_empty());

        store.redo().unwrap();
        assert!(store.has_node(&"t1".into()));
        assert!(store.can_redo());
    }

    #[test]
    fn selection_changes_are_not_undo_steps() {
        let store = store_with_paragraph();
        store.set_selection(Some(Selection::caret("t1", 2))).unwrap();
        assert_eq!(store.selection(), Some(Selection::caret("t1", 2)));

        store.undo().unwrap();
        assert!(!store.has_node(&"p1".into()));
        assert_eq!(store.selection(), None);
    }

    #[test]
    fn snapshot_round_trip() {
        let store = store_with_paragraph();
        store
            .execute(&[
                Operation::apply_mark("t1", "bold", 0, 5),
                Operation::set_selection(Some(Selection::caret("t1", 3))),
            ])
            .unwrap();
        let snapshot = store.snapshot();

        let copy = DocumentStore::from_snapshot(
            snapshot.clone(),
            Arc::new(PermissiveSchema),
            StoreConfig::default(),
        )
        .unwrap();
        assert_eq!(copy.snapshot(), snapshot);
        assert_eq!(
            copy.get_node(&"t1".into()).unwrap().marks(),
            [Mark::new("bold", 0, 5)]
        );
        assert_eq!(copy.selection(), Some(Selection::caret("t1", 3)));
    }

    #[test]
    fn detached_nodes_survive_a_reload() {
        let store = store_with_paragraph();
        store
            .execute(&[
                Operation::create_node(NodeInit::text("tail").with_id("t2"), Some("p1".into()), None),
                Operation::RemoveChild(RemoveChildPayload {
                    parent_id: "p1".into(),
                    child_id: "t2".into(),
                }),
                Operation::create_node(NodeInit::container("quote").with_id("q1"), None, None),
            ])
            .unwrap();
        let snapshot = store.snapshot();
        assert!(store.verify().is_ok(), "{:?}", store.verify().issues);

        let copy = DocumentStore::from_snapshot(
            snapshot.clone(),
            Arc::new(PermissiveSchema),
            StoreConfig::default(),
        )
        .unwrap();
        assert_eq!(copy.snapshot(), snapshot);
        assert_eq!(copy.get_node(&"t2".into()).unwrap().parent, None);
    }

    #[test]
    fn broken_snapshots_are_rejected_when_verifying() {
        let mut snapshot = store_with_paragraph().snapshot();
        for node in &mut snapshot.nodes {
            if node.id.as_str() == "t1" {
                node.parent = None;
            }
        }

        let err = DocumentStore::from_snapshot(
            snapshot.clone(),
            Arc::new(PermissiveSchema),
            StoreConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "STRUCTURAL_VIOLATION");

        let unchecked = DocumentStore::from_snapshot(
            snapshot,
            Arc::new(PermissiveSchema),
            StoreConfig::default().verify_on_load(false),
        )
        .unwrap();
        assert!(!unchecked.verify().is_ok());
    }

    #[test]
    fn base_writes_need_the_lock() {
        let store = store_with_paragraph();
        let txn = store.transactions().begin().unwrap();
        assert!(store.in_transaction());
        let err = store.insert_base_node(Node::text("loose", "x")).unwrap_err();
        assert!(matches!(err, StoreError::LockContention));
        drop(txn);

        store.insert_base_node(Node::text("loose", "x")).unwrap();
        assert!(store.has_node(&"loose".into()));
        assert!(!store.can_undo());
    }

    #[test]
    fn schema_failures_surface_as_validation_errors() {
        let schema = RuleSchema::new()
            .rule("doc", TypeRule::children().allow_children(["paragraph"]))
            .rule("paragraph", TypeRule::children().allow_children(["text"]))
            .rule("text", TypeRule::text());
        let store = DocumentStore::with_schema(StoreConfig::default(), Arc::new(schema)).unwrap();

        let result = store.run(&[Operation::create_node(
            NodeInit::text("loose"),
            Some("root".into()),
            None,
        )]);
        assert!(!result.success);
        assert_eq!(result.error_code.as_deref(), Some("VALIDATION_ERROR"));
        assert_eq!(store.stats().transactions_aborted, 1);
    }

    #[test]
    fn feed_and_stats_follow_commits() {
        let store = store_with_paragraph();
        store.execute(&[Operation::insert_text("t1", 0, ">")]).unwrap();

        let events = store.poll(0, 10);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].operations, vec![Operation::insert_text("t1", 0, ">")]);
        assert_eq!(events[1].changed_nodes, vec![NodeId::from("t1")]);

        let stats = store.stats();
        assert_eq!(stats.transactions_committed, 2);
        assert_eq!(stats.operations_applied, 2);
    }
}
