//! Transaction manager.

use crate::change_feed::{ChangeFeed, CommitEvent};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::graph::NodeGraph;
use crate::ops;
use crate::schema::Schema;
use crate::selection;
use crate::stats::StoreStats;
use crate::transaction::state::{Transaction, TransactionResult, TransactionState};
use crate::transaction::TransactionContext;
use crate::types::{SequenceNumber, TransactionId};
use docstore_model::{NodeId, Operation, Selection};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Runs operations against a document as all-or-nothing transactions.
///
/// The transaction manager provides:
/// - Single-writer concurrency control via [`begin`](Self::begin)
/// - Fail-fast contention: a second writer gets `LockContention`, never waits
/// - Copy-on-write isolation: readers outside a transaction only see commits
/// - A replayable inverse for every committed transaction
///
/// ## Single-Writer Guarantee
///
/// Only one write transaction can be active at a time. The store lock is
/// acquired by `begin` and held by the returned [`WriteTransaction`]; it is
/// released when the transaction commits, aborts or is dropped.
pub struct TransactionManager {
    /// Committed document.
    graph: Arc<NodeGraph>,
    /// Schema consulted by every operation.
    schema: Arc<dyn Schema>,
    config: StoreConfig,
    /// Committed selection.
    selection: Mutex<Option<Selection>>,
    /// Next transaction ID.
    next_txid: AtomicU64,
    /// Last committed sequence.
    committed_seq: AtomicU64,
    /// Write lock - only one writer at a time.
    write_lock: Mutex<()>,
    stats: Arc<StoreStats>,
    feed: Arc<ChangeFeed>,
    origin: Uuid,
}

impl TransactionManager {
    /// Creates a transaction manager over a committed graph.
    pub fn new(
        graph: Arc<NodeGraph>,
        schema: Arc<dyn Schema>,
        config: StoreConfig,
        stats: Arc<StoreStats>,
        feed: Arc<ChangeFeed>,
    ) -> Self {
        Self {
            graph,
            schema,
            config,
            selection: Mutex::new(None),
            next_txid: AtomicU64::new(1),
            committed_seq: AtomicU64::new(0),
            write_lock: Mutex::new(()),
            stats,
            feed,
            origin: Uuid::new_v4(),
        }
    }

    /// Begins a write transaction.
    ///
    /// The overlay starts empty and the selection projection starts at the
    /// committed selection.
    ///
    /// # Errors
    ///
    /// Returns `LockContention` immediately if another transaction is
    /// active.
    ///
    /// # Example
    ///
    /// ```rust
    /// use docstore_core::{DocumentStore, NodeReader, StoreConfig};
    /// use docstore_model::{NodeInit, Operation};
    ///
    /// let store = DocumentStore::in_memory(StoreConfig::default()).unwrap();
    /// let mut txn = store.transactions().begin().unwrap();
    /// txn.apply(&Operation::create_node(NodeInit::text("hi").with_id("t1"), None, None))
    ///     .unwrap();
    /// assert!(store.transactions().begin().is_err());
    /// txn.commit().unwrap();
    /// assert!(store.has_node(&"t1".into()));
    /// ```
    pub fn begin(&self) -> StoreResult<WriteTransaction<'_>> {
        let Some(guard) = self.write_lock.try_lock() else {
            self.stats.record_contention();
            warn!("transaction rejected: another transaction holds the store lock");
            return Err(StoreError::LockContention);
        };

        let id = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        let selection = self.selection.lock().clone();
        self.stats.record_transaction_start();
        debug!(txid = %id, "began transaction");

        Ok(WriteTransaction {
            manager: self,
            _guard: guard,
            id,
            state: TransactionState::Active,
            ctx: TransactionContext::new(&self.graph, &*self.schema, &self.config, selection),
            operations: Vec::new(),
            inverse_groups: Vec::new(),
            results: Vec::new(),
        })
    }

    /// Runs `operations` in order in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `LockContention` if a transaction is active, and
    /// `OperationFailed` (carrying the index and cause) if any operation
    /// fails; in that case nothing was committed.
    pub fn execute(&self, operations: &[Operation]) -> StoreResult<Transaction> {
        let txn = self.begin()?;
        Self::apply_all(txn, operations)
    }

    /// Like [`execute`](Self::execute), reporting the outcome in the wire
    /// result shape.
    pub fn run(&self, operations: &[Operation]) -> TransactionResult {
        match self.try_execute(operations) {
            Ok(txn) => txn.into(),
            Err((before, err)) => TransactionResult::failure(before, &err),
        }
    }

    /// Like [`execute`](Self::execute), returning on failure the selection
    /// in effect when the batch started.
    pub(crate) fn try_execute(
        &self,
        operations: &[Operation],
    ) -> Result<Transaction, (Option<Selection>, StoreError)> {
        let txn = match self.begin() {
            Ok(txn) => txn,
            Err(err) => return Err((self.selection(), err)),
        };
        // Taken under the store lock.
        let before = txn.context().selection_before().cloned();
        Self::apply_all(txn, operations).map_err(|err| (before, err))
    }

    fn apply_all(mut txn: WriteTransaction<'_>, operations: &[Operation]) -> StoreResult<Transaction> {
        for (index, op) in operations.iter().enumerate() {
            if let Err(source) = txn.apply(op) {
                txn.abort();
                return Err(StoreError::OperationFailed {
                    index,
                    operation: op.name(),
                    source: Box::new(source),
                });
            }
        }
        txn.commit()
    }

    /// Undoes a committed transaction by replaying its inverse in a new
    /// transaction, then restoring the selection it started from.
    ///
    /// # Errors
    ///
    /// Fails like [`execute`](Self::execute); later commits may have made
    /// the inverse inapplicable.
    pub fn undo(&self, record: &Transaction) -> StoreResult<Transaction> {
        let mut operations = record.inverse_operations().to_vec();
        operations.push(Operation::set_selection(record.selection_before().cloned()));
        self.stats.record_replay();
        self.execute(&operations)
    }

    /// Redoes a committed transaction by replaying its operations.
    ///
    /// # Errors
    ///
    /// Fails like [`execute`](Self::execute).
    pub fn redo(&self, record: &Transaction) -> StoreResult<Transaction> {
        let mut operations = record.operations().to_vec();
        operations.push(Operation::set_selection(record.selection_after().cloned()));
        self.stats.record_replay();
        self.execute(&operations)
    }

    /// Runs `f` against the base while holding the store lock.
    ///
    /// Base writes outside a transaction go through here.
    pub(crate) fn exclusive<R>(
        &self,
        f: impl FnOnce(&NodeGraph) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let Some(_guard) = self.write_lock.try_lock() else {
            self.stats.record_contention();
            warn!("base write rejected: a transaction is active");
            return Err(StoreError::LockContention);
        };
        f(&self.graph)
    }

    /// Replaces the committed selection. Callers hold the store lock.
    pub(crate) fn reset_selection(&self, selection: Option<Selection>) {
        *self.selection.lock() = selection;
    }

    /// Returns the committed selection.
    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.selection.lock().clone()
    }

    /// Returns true while a transaction holds the store lock.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.write_lock.is_locked()
    }

    /// Returns the last committed sequence number.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst))
    }

    /// Returns the identifier this store stamps on its commit events.
    #[must_use]
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    /// Returns the committed graph.
    #[must_use]
    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the schema in force.
    #[must_use]
    pub fn schema(&self) -> &dyn Schema {
        &*self.schema
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("committed_seq", &self.committed_seq())
            .field("active", &self.is_active())
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// An open write transaction holding the store lock.
///
/// Operations applied through it see each other's effects; nothing is
/// visible outside until [`commit`](Self::commit). Dropping it without
/// committing discards every change.
pub struct WriteTransaction<'a> {
    manager: &'a TransactionManager,
    _guard: MutexGuard<'a, ()>,
    id: TransactionId,
    state: TransactionState,
    ctx: TransactionContext<'a>,
    /// Executed leaf operations.
    operations: Vec<Operation>,
    /// Inverse list of each executed operation.
    inverse_groups: Vec<Vec<Operation>>,
    results: Vec<Value>,
}

impl<'a> WriteTransaction<'a> {
    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction can still apply operations.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Returns the in-transaction view (committed base plus this
    /// transaction's writes).
    #[must_use]
    pub fn context(&self) -> &TransactionContext<'a> {
        &self.ctx
    }

    /// Returns the leaf operations executed so far.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Applies one operation. Combinators are resolved against the current
    /// view and their products applied in order.
    ///
    /// # Errors
    ///
    /// Returns the operation's error. The transaction is then
    /// [`Failed`](TransactionState::Failed) and can only be aborted.
    pub fn apply(&mut self, op: &Operation) -> StoreResult<()> {
        self.ensure_active()?;
        let result = self.apply_at_depth(op, 0);
        if let Err(err) = &result {
            debug!(txid = %self.id, op = op.name(), error = %err, "operation failed");
            self.state = TransactionState::Failed;
        }
        result
    }

    fn apply_at_depth(&mut self, op: &Operation, depth: usize) -> StoreResult<()> {
        if op.is_combinator() {
            let limit = self.manager.config.max_expansion_depth;
            if depth >= limit {
                return Err(StoreError::ExpansionTooDeep { limit });
            }
            let produced = ops::expand(op, &self.ctx)?;
            self.manager.stats.record_expansion();
            trace!(txid = %self.id, op = op.name(), produced = produced.len(), "expanded combinator");
            for next in &produced {
                self.apply_at_depth(next, depth + 1)?;
            }
            return Ok(());
        }

        let mut op = op.clone();
        op.assign_ids(self.manager.config.prefix());
        self.ctx.begin_operation(op.name());
        let applied = ops::apply(&op, &mut self.ctx)?;
        self.manager.stats.record_operation();
        trace!(txid = %self.id, op = op.name(), inverse = applied.inverse.len(), "applied operation");

        self.operations.push(op);
        self.inverse_groups.push(applied.inverse);
        self.results.push(applied.data);
        Ok(())
    }

    /// Commits the transaction.
    ///
    /// The selection projection is normalized against the final view, the
    /// overlay is merged into the base in one step, and a commit event is
    /// emitted if anything was executed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if an operation failed earlier, or a
    /// storage error if the base rejects the merge. Nothing is committed in
    /// either case.
    pub fn commit(self) -> StoreResult<Transaction> {
        if let Err(err) = self.ensure_active() {
            self.abort();
            return Err(err);
        }

        let Self {
            manager,
            _guard,
            id,
            ctx,
            operations,
            inverse_groups,
            results,
            ..
        } = self;

        let selection_after = selection::normalize(ctx.selection().cloned(), &ctx);
        let selection_before = ctx.selection_before().cloned();
        let (overlay, _) = ctx.into_parts();
        let changes = overlay.into_change_set();
        let changed_nodes: Vec<NodeId> = changes.node_puts.iter().map(|n| n.id.clone()).collect();
        let deleted_nodes = changes.node_deletes.clone();

        if let Err(err) = manager.graph.commit(changes) {
            manager.stats.record_abort();
            warn!(txid = %id, error = %err, "base rejected commit");
            return Err(err);
        }
        *manager.selection.lock() = selection_after.clone();
        let sequence = SequenceNumber::new(manager.committed_seq.fetch_add(1, Ordering::SeqCst) + 1);
        manager
            .stats
            .record_commit(changed_nodes.len(), deleted_nodes.len());

        // Later operations are undone first.
        let inverse: Vec<Operation> = inverse_groups.into_iter().rev().flatten().collect();

        if !operations.is_empty() {
            manager.feed.emit(CommitEvent {
                sequence: sequence.as_u64(),
                transaction_id: id,
                origin: manager.origin,
                operations: operations.clone(),
                selection_after: selection_after.clone(),
                changed_nodes,
                deleted_nodes,
            });
        }
        debug!(txid = %id, seq = %sequence, operations = operations.len(), "committed transaction");

        Ok(Transaction::new(
            id,
            sequence,
            operations,
            inverse,
            selection_before,
            selection_after,
            results,
        ))
    }

    /// Aborts the transaction, discarding the overlay.
    pub fn abort(self) {
        self.manager.stats.record_abort();
        warn!(
            txid = %self.id,
            state = ?self.state,
            operations = self.operations.len(),
            "rolled back transaction"
        );
    }

    fn ensure_active(&self) -> StoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Failed => Err(StoreError::invalid_operation(
                "transaction failed; it can only be aborted",
            )),
            TransactionState::Committed => {
                Err(StoreError::invalid_operation("transaction already committed"))
            }
            TransactionState::Aborted => {
                Err(StoreError::invalid_operation("transaction already aborted"))
            }
        }
    }
}

impl std::fmt::Debug for WriteTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTransaction")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("operations", &self.operations.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::sample_graph;
    use crate::schema::PermissiveSchema;
    use crate::traverse::NodeReader;
    use docstore_model::{
        Condition, DeleteSpanPayload, ForEachNodePayload, NodeInit, NodeSelector, WhenPayload,
    };

    fn manager_with(config: StoreConfig) -> TransactionManager {
        TransactionManager::new(
            Arc::new(sample_graph()),
            Arc::new(PermissiveSchema),
            config,
            Arc::new(StoreStats::new()),
            Arc::new(ChangeFeed::default()),
        )
    }

    fn manager() -> TransactionManager {
        manager_with(StoreConfig::default())
    }

    fn text(manager: &TransactionManager, id: &str) -> String {
        manager
            .graph
            .get_node(&id.into())
            .and_then(|n| n.text)
            .unwrap_or_default()
    }

    #[test]
    fn execute_commits_and_records_inverse() {
        let tm = manager();
        let rx = tm.feed.subscribe();

        let txn = tm
            .execute(&[
                Operation::insert_text("t1", 0, "A"),
                Operation::insert_text("t2", 1, "?"),
            ])
            .unwrap();

        assert_eq!(text(&tm, "t1"), "AHello World");
        assert_eq!(text(&tm, "t2"), "!?");
        assert_eq!(txn.sequence(), SequenceNumber::new(1));
        // t2 is undone first; t1's inverse also restores its shifted marks.
        let inverse = txn.inverse_operations();
        assert_eq!(inverse[0], Operation::delete_text("t2", 1, 2));
        assert_eq!(inverse[1], Operation::delete_text("t1", 0, 1));
        assert!(matches!(inverse[2], Operation::SetMarks(_)));

        let event = rx.recv().unwrap();
        assert_eq!(event.sequence, 1);
        assert_eq!(event.origin, tm.origin());
        assert_eq!(event.changed_nodes, vec![NodeId::from("t1"), NodeId::from("t2")]);
        assert_eq!(tm.stats.transactions_committed(), 1);
    }

    #[test]
    fn failure_rolls_back_everything() {
        let tm = manager();
        tm.execute(&[Operation::set_selection(Some(Selection::caret("t1", 3)))])
            .unwrap();

        let err = tm
            .execute(&[
                Operation::insert_text("t1", 0, "A"),
                Operation::delete_text("t1", 50, 60),
            ])
            .unwrap_err();

        assert!(matches!(err, StoreError::OperationFailed { index: 1, .. }));
        assert_eq!(err.code(), "OUT_OF_RANGE");
        assert_eq!(text(&tm, "t1"), "Hello World");
        assert_eq!(tm.selection(), Some(Selection::caret("t1", 3)));
        assert!(!tm.is_active());
        assert_eq!(tm.stats.transactions_aborted(), 1);
    }

    #[test]
    fn second_transaction_fails_fast() {
        let tm = manager();
        let txn = tm.begin().unwrap();
        assert!(tm.is_active());

        assert!(matches!(tm.begin(), Err(StoreError::LockContention)));
        assert!(matches!(
            tm.execute(&[Operation::insert_text("t1", 0, "x")]),
            Err(StoreError::LockContention)
        ));
        assert_eq!(tm.stats.lock_contentions(), 2);

        drop(txn);
        assert!(!tm.is_active());
        tm.execute(&[Operation::insert_text("t1", 0, "x")]).unwrap();
    }

    #[test]
    fn outside_readers_see_only_commits() {
        let tm = manager();
        let mut txn = tm.begin().unwrap();
        txn.apply(&Operation::insert_text("t1", 5, ",")).unwrap();

        let inside = txn.context().get_node(&"t1".into()).unwrap();
        assert_eq!(inside.text.as_deref(), Some("Hello, World"));
        assert_eq!(text(&tm, "t1"), "Hello World");

        txn.commit().unwrap();
        assert_eq!(text(&tm, "t1"), "Hello, World");
    }

    #[test]
    fn failed_transaction_only_aborts() {
        let tm = manager();
        let mut txn = tm.begin().unwrap();
        assert!(txn.apply(&Operation::delete_node("missing")).is_err());
        assert_eq!(txn.state(), TransactionState::Failed);

        let err = txn.apply(&Operation::insert_text("t1", 0, "x")).unwrap_err();
        assert_eq!(err.code(), "INVALID_OPERATION");
        assert!(txn.commit().is_err());
        assert_eq!(text(&tm, "t1"), "Hello World");
        assert!(!tm.is_active());
    }

    #[test]
    fn combinators_record_their_products() {
        let tm = manager();
        let txn = tm
            .execute(&[Operation::ForEachNode(ForEachNodePayload {
                selector: NodeSelector {
                    text_only: true,
                    ..NodeSelector::default()
                },
                operation: Box::new(Operation::insert_text("placeholder", 0, ">")),
            })])
            .unwrap();

        assert_eq!(
            txn.operations(),
            [Operation::insert_text("t1", 0, ">"), Operation::insert_text("t2", 0, ">")]
        );
        assert_eq!(text(&tm, "t1"), ">Hello World");
        assert_eq!(text(&tm, "t2"), ">!");
        assert_eq!(tm.stats.combinators_expanded(), 1);
    }

    #[test]
    fn combinators_see_earlier_operations() {
        let tm = manager();
        tm.execute(&[
            Operation::insert_text("t2", 1, "!!"),
            Operation::DeleteSpan(DeleteSpanPayload {
                start_node_id: "t1".into(),
                start_offset: 5,
                end_node_id: "t2".into(),
                end_offset: 3,
            }),
        ])
        .unwrap();
        assert_eq!(text(&tm, "t1"), "Hello");
        assert_eq!(text(&tm, "t2"), "");
    }

    #[test]
    fn expansion_depth_is_bounded() {
        let tm = manager_with(StoreConfig::default().max_expansion_depth(1));
        let inner = Operation::When(WhenPayload {
            condition: Condition::SelectionCollapsed,
            then: Vec::new(),
            otherwise: vec![Operation::insert_text("t1", 0, "x")],
        });
        let outer = Operation::When(WhenPayload {
            condition: Condition::SelectionCollapsed,
            then: Vec::new(),
            otherwise: vec![inner.clone()],
        });

        tm.execute(std::slice::from_ref(&inner)).unwrap();
        let err = tm.execute(&[outer]).unwrap_err();
        assert!(matches!(err.root_cause(), StoreError::ExpansionTooDeep { limit: 1 }));
    }

    #[test]
    fn undo_and_redo_replay_records() {
        let tm = manager();
        let before = tm.graph.snapshot(tm.selection());

        let record = tm
            .execute(&[
                Operation::create_node(NodeInit::text("new"), Some("p1".into()), Some(0)),
                Operation::delete_text("t1", 0, 6),
                Operation::set_selection(Some(Selection::caret("t1", 2))),
            ])
            .unwrap();
        let after = tm.graph.snapshot(tm.selection());

        tm.undo(&record).unwrap();
        assert_eq!(tm.graph.snapshot(tm.selection()), before);

        tm.redo(&record).unwrap();
        assert_eq!(tm.graph.snapshot(tm.selection()), after);
        assert_eq!(tm.stats.replays(), 2);
    }

    #[test]
    fn generated_ids_are_recorded() {
        let tm = manager_with(StoreConfig::default().id_prefix("n"));
        let record = tm
            .execute(&[Operation::create_node(NodeInit::text("x"), Some("p1".into()), None)])
            .unwrap();
        let Operation::CreateNode(payload) = &record.operations()[0] else {
            panic!("expected createNode");
        };
        let id = payload.node.id.clone().unwrap();
        assert!(id.as_str().starts_with('n'));
        assert!(tm.graph.has_node(&id));
    }

    #[test]
    fn failed_run_reports_selection_from_transaction_start() {
        let tm = manager();
        tm.execute(&[Operation::set_selection(Some(Selection::caret("t1", 3)))])
            .unwrap();

        let failed = tm.run(&[
            Operation::set_selection(Some(Selection::caret("t1", 7))),
            Operation::delete_text("t1", 50, 60),
        ]);
        assert!(!failed.success);
        assert_eq!(failed.selection_before, Some(Selection::caret("t1", 3)));
        assert_eq!(failed.selection_after, failed.selection_before);

        let held = tm.begin().unwrap();
        let contended = tm.run(&[Operation::insert_text("t1", 0, "A")]);
        assert_eq!(contended.error_code.as_deref(), Some("LOCK_CONTENTION"));
        assert_eq!(contended.selection_before, Some(Selection::caret("t1", 3)));
        held.abort();
    }

    #[test]
    fn run_reports_wire_result() {
        let tm = manager();
        let ok = tm.run(&[Operation::insert_text("t2", 0, "A")]);
        assert!(ok.success);
        assert_eq!(ok.inverse_operations, vec![Operation::delete_text("t2", 0, 1)]);

        let failed = tm.run(&[Operation::delete_node("root")]);
        assert!(!failed.success);
        assert_eq!(failed.error_code.as_deref(), Some("STRUCTURAL_VIOLATION"));
        assert_eq!(failed.selection_after, failed.selection_before);
    }

    #[test]
    fn commit_normalizes_selection() {
        let tm = manager();
        tm.execute(&[
            Operation::set_selection(Some(Selection::range("p1", 0, "p1", 1))),
            Operation::insert_text("t1", 0, "x"),
        ])
        .unwrap();
        assert_eq!(tm.selection(), Some(Selection::node("p1")));
    }
}
