//! Store statistics.
//!
//! Counters for monitoring how a document store is used.
//!
//! # Usage
//!
//! ```rust
//! use docstore_core::{DocumentStore, StoreConfig};
//! use docstore_model::Operation;
//!
//! let store = DocumentStore::in_memory(StoreConfig::default()).unwrap();
//! let _ = store.run(&[Operation::delete_node("missing")]);
//!
//! let stats = store.stats();
//! assert_eq!(stats.transactions_aborted, 1);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Store statistics.
///
/// All counters are atomic and can be read while a transaction is running.
/// Values only grow.
#[derive(Debug, Default)]
pub struct StoreStats {
    // Transaction counters
    /// Transactions that acquired the lock.
    transactions_started: AtomicU64,
    /// Transactions merged into the base.
    transactions_committed: AtomicU64,
    /// Transactions rolled back.
    transactions_aborted: AtomicU64,
    /// Attempts rejected because another transaction held the lock.
    lock_contentions: AtomicU64,

    // Operation counters
    /// Leaf operations applied (including ones later rolled back).
    operations_applied: AtomicU64,
    /// Combinators resolved into further operations.
    combinators_expanded: AtomicU64,

    // Write counters
    /// Node writes merged by commits.
    nodes_written: AtomicU64,
    /// Node deletions merged by commits.
    nodes_deleted: AtomicU64,

    /// Undo and redo replays.
    replays: AtomicU64,
}

impl StoreStats {
    /// Creates a zeroed stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_transaction_start(&self) {
        self.transactions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self, nodes_written: usize, nodes_deleted: usize) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
        self.nodes_written
            .fetch_add(nodes_written as u64, Ordering::Relaxed);
        self.nodes_deleted
            .fetch_add(nodes_deleted as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_abort(&self) {
        self.transactions_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_contention(&self) {
        self.lock_contentions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_operation(&self) {
        self.operations_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expansion(&self) {
        self.combinators_expanded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_replay(&self) {
        self.replays.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of transactions started.
    pub fn transactions_started(&self) -> u64 {
        self.transactions_started.load(Ordering::Relaxed)
    }

    /// Returns the number of transactions committed.
    pub fn transactions_committed(&self) -> u64 {
        self.transactions_committed.load(Ordering::Relaxed)
    }

    /// Returns the number of transactions rolled back.
    pub fn transactions_aborted(&self) -> u64 {
        self.transactions_aborted.load(Ordering::Relaxed)
    }

    /// Returns the number of rejected lock acquisitions.
    ///
    /// A steadily growing value means callers race for the store.
    pub fn lock_contentions(&self) -> u64 {
        self.lock_contentions.load(Ordering::Relaxed)
    }

    /// Returns the number of leaf operations applied.
    pub fn operations_applied(&self) -> u64 {
        self.operations_applied.load(Ordering::Relaxed)
    }

    /// Returns the number of combinator expansions.
    pub fn combinators_expanded(&self) -> u64 {
        self.combinators_expanded.load(Ordering::Relaxed)
    }

    /// Returns the number of committed node writes.
    pub fn nodes_written(&self) -> u64 {
        self.nodes_written.load(Ordering::Relaxed)
    }

    /// Returns the number of committed node deletions.
    pub fn nodes_deleted(&self) -> u64 {
        self.nodes_deleted.load(Ordering::Relaxed)
    }

    /// Returns the number of undo/redo replays.
    pub fn replays(&self) -> u64 {
        self.replays.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            transactions_started: self.transactions_started(),
            transactions_committed: self.transactions_committed(),
            transactions_aborted: self.transactions_aborted(),
            lock_contentions: self.lock_contentions(),
            operations_applied: self.operations_applied(),
            combinators_expanded: self.combinators_expanded(),
            nodes_written: self.nodes_written(),
            nodes_deleted: self.nodes_deleted(),
            replays: self.replays(),
        }
    }
}

/// A point-in-time copy of [`StoreStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Transactions started.
    pub transactions_started: u64,
    /// Transactions committed.
    pub transactions_committed: u64,
    /// Transactions rolled back.
    pub transactions_aborted: u64,
    /// Rejected lock acquisitions.
    pub lock_contentions: u64,
    /// Leaf operations applied.
    pub operations_applied: u64,
    /// Combinator expansions.
    pub combinators_expanded: u64,
    /// Committed node writes.
    pub nodes_written: u64,
    /// Committed node deletions.
    pub nodes_deleted: u64,
    /// Undo/redo replays.
    pub replays: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = StoreStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_transactions() {
        let stats = StoreStats::new();

        stats.record_transaction_start();
        stats.record_transaction_start();
        stats.record_commit(3, 1);
        stats.record_abort();
        stats.record_contention();

        let snap = stats.snapshot();
        assert_eq!(snap.transactions_started, 2);
        assert_eq!(snap.transactions_committed, 1);
        assert_eq!(snap.transactions_aborted, 1);
        assert_eq!(snap.lock_contentions, 1);
        assert_eq!(snap.nodes_written, 3);
        assert_eq!(snap.nodes_deleted, 1);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let stats = StoreStats::new();
        stats.record_operation();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["operationsApplied"], 1);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(StoreStats::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let s = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    s.record_operation();
                    s.record_expansion();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.operations_applied(), 1000);
        assert_eq!(stats.combinators_expanded(), 1000);
    }
}
