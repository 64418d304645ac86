//! Undo/redo history.
//!
//! The history only stores committed [`Transaction`] records. Undo replays a
//! record's inverse through the transaction manager; redo replays its
//! operations. Records carry generated identifiers, so a redo recreates the
//! same nodes and the record stays valid for a later undo.

use crate::error::StoreResult;
use crate::transaction::{Transaction, TransactionManager};
use std::collections::VecDeque;
use tracing::debug;

/// Bounded undo and redo stacks.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Transaction>,
    redo: Vec<Transaction>,
    limit: usize,
}

impl History {
    /// Creates a history keeping at most `limit` undo entries (0 disables
    /// recording).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
        }
    }

    /// Records a committed transaction and clears the redo stack.
    ///
    /// Transactions with nothing to undo are skipped.
    pub fn record(&mut self, txn: Transaction) {
        if self.limit == 0 || txn.is_noop() {
            return;
        }
        self.redo.clear();
        self.undo.push_back(txn);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    /// Undoes the most recent transaction.
    ///
    /// Returns `Ok(None)` when there is nothing to undo. On failure the
    /// record stays on the undo stack.
    ///
    /// # Errors
    ///
    /// Returns the replay error (for example `LockContention`).
    pub fn undo(&mut self, manager: &TransactionManager) -> StoreResult<Option<Transaction>> {
        let Some(record) = self.undo.pop_back() else {
            return Ok(None);
        };
        match manager.undo(&record) {
            Ok(replay) => {
                debug!(txid = %record.id(), "undid transaction");
                self.redo.push(record);
                Ok(Some(replay))
            }
            Err(err) => {
                self.undo.push_back(record);
                Err(err)
            }
        }
    }

    /// Redoes the most recently undone transaction.
    ///
    /// # Errors
    ///
    /// Returns the replay error. On failure the record stays on the redo
    /// stack.
    pub fn redo(&mut self, manager: &TransactionManager) -> StoreResult<Option<Transaction>> {
        let Some(record) = self.redo.pop() else {
            return Ok(None);
        };
        match manager.redo(&record) {
            Ok(replay) => {
                debug!(txid = %record.id(), "redid transaction");
                self.undo.push_back(record);
                Ok(Some(replay))
            }
            Err(err) => {
                self.redo.push(record);
                Err(err)
            }
        }
    }

    /// Returns true if there is something to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Returns true if there is something to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Returns the number of undo entries.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Returns the number of redo entries.
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_feed::ChangeFeed;
    use crate::config::StoreConfig;
    use crate::ops::testing::sample_graph;
    use crate::schema::PermissiveSchema;
    use crate::stats::StoreStats;
    use crate::traverse::NodeReader;
    use docstore_model::Operation;
    use std::sync::Arc;

    fn manager() -> TransactionManager {
        TransactionManager::new(
            Arc::new(sample_graph()),
            Arc::new(PermissiveSchema),
            StoreConfig::default(),
            Arc::new(StoreStats::new()),
            Arc::new(ChangeFeed::default()),
        )
    }

    fn t2(manager: &TransactionManager) -> String {
        manager
            .graph()
            .get_node(&"t2".into())
            .and_then(|n| n.text)
            .unwrap_or_default()
    }

    #[test]
    fn undo_then_redo() {
        let tm = manager();
        let mut history = History::new(10);
        history.record(tm.execute(&[Operation::insert_text("t2", 1, "?")]).unwrap());
        assert_eq!(t2(&tm), "!?");

        history.undo(&tm).unwrap().unwrap();
        assert_eq!(t2(&tm), "!");
        assert!(history.can_redo());

        history.redo(&tm).unwrap().unwrap();
        assert_eq!(t2(&tm), "!?");
        assert_eq!(history.undo_len(), 1);
        assert!(!history.can_redo());
    }

    #[test]
    fn new_record_clears_redo() {
        let tm = manager();
        let mut history = History::new(10);
        history.record(tm.execute(&[Operation::insert_text("t2", 1, "a")]).unwrap());
        history.undo(&tm).unwrap();
        history.record(tm.execute(&[Operation::insert_text("t2", 1, "b")]).unwrap());
        assert!(!history.can_redo());
        assert_eq!(t2(&tm), "!b");
    }

    #[test]
    fn limit_and_noops() {
        let tm = manager();
        let mut history = History::new(2);
        for _ in 0..3 {
            history.record(tm.execute(&[Operation::insert_text("t2", 0, "x")]).unwrap());
        }
        history.record(tm.execute(&[]).unwrap());
        assert_eq!(history.undo_len(), 2);

        let mut disabled = History::new(0);
        disabled.record(tm.execute(&[Operation::insert_text("t2", 0, "x")]).unwrap());
        assert!(!disabled.can_undo());
        assert_eq!(disabled.undo(&tm).unwrap(), None);
    }

    #[test]
    fn failed_undo_keeps_record() {
        let tm = manager();
        let mut history = History::new(10);
        history.record(tm.execute(&[Operation::insert_text("t2", 1, "?")]).unwrap());

        let blocker = tm.begin().unwrap();
        assert!(history.undo(&tm).is_err());
        drop(blocker);

        assert_eq!(history.undo_len(), 1);
        assert!(history.undo(&tm).unwrap().is_some());
    }
}
