//! Change feed for observing committed transactions.
//!
//! The change feed is the collaboration boundary: every commit emits the
//! executed operations and the resulting selection, which an adapter can
//! forward to its own wire format. It also serves:
//! - Reactive view updates (`changed_nodes`)
//! - Catch-up after a disconnect (`poll`)
//!
//! # Usage
//!
//! ```rust
//! use docstore_core::{DocumentStore, StoreConfig};
//! use docstore_model::{NodeInit, Operation};
//!
//! let store = DocumentStore::in_memory(StoreConfig::default()).unwrap();
//! let receiver = store.subscribe();
//!
//! store
//!     .execute(&[Operation::create_node(NodeInit::text("hi").with_id("t1"), None, None)])
//!     .unwrap();
//!
//! let event = receiver.recv().unwrap();
//! assert_eq!(event.sequence, 1);
//! assert_eq!(event.operations.len(), 1);
//! ```

use crate::types::TransactionId;
use docstore_model::{NodeId, Operation, Selection};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, Sender};
use uuid::Uuid;

/// One committed transaction, as seen from outside the store.
///
/// Events are emitted only after the base has been updated, in commit
/// order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitEvent {
    /// Commit sequence number; strictly increasing per store.
    pub sequence: u64,
    /// Transaction that produced the commit.
    pub transaction_id: TransactionId,
    /// Identifies the store instance, so adapters can skip their own echoes.
    pub origin: Uuid,
    /// Executed leaf operations, with generated identifiers filled in.
    pub operations: Vec<Operation>,
    /// Selection after the commit.
    pub selection_after: Option<Selection>,
    /// Nodes written by the commit (sorted).
    pub changed_nodes: Vec<NodeId>,
    /// Nodes deleted by the commit (sorted).
    pub deleted_nodes: Vec<NodeId>,
}

/// Distributes commit events to subscribers.
///
/// The change feed:
/// - Emits only committed transactions
/// - Preserves commit order
/// - Supports multiple subscribers
/// - Keeps a bounded history for polling
pub struct ChangeFeed {
    subscribers: RwLock<Vec<Sender<CommitEvent>>>,
    history: RwLock<Vec<CommitEvent>>,
    max_history: usize,
}

impl ChangeFeed {
    /// Creates a change feed keeping at most `max_history` events.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(Vec::new()),
            max_history,
        }
    }

    /// Subscribes to future commit events.
    ///
    /// The receiver should be drained regularly; the channel is unbounded.
    pub fn subscribe(&self) -> Receiver<CommitEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits an event to the history and every live subscriber.
    pub(crate) fn emit(&self, event: CommitEvent) {
        {
            let mut history = self.history.write();
            history.push(event.clone());
            if history.len() > self.max_history {
                let excess = history.len() - self.max_history;
                history.drain(0..excess);
            }
        }

        // Disconnected receivers are dropped here.
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Returns up to `limit` events with a sequence greater than `cursor`.
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<CommitEvent> {
        self.history
            .read()
            .iter()
            .filter(|e| e.sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns the latest sequence in the history, or 0.
    pub fn latest_sequence(&self) -> u64 {
        self.history.read().last().map_or(0, |e| e.sequence)
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of events kept.
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::with_max_history(1024)
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("subscribers", &self.subscriber_count())
            .field("history", &self.history_len())
            .finish_non_exhaustive()
    }
}
