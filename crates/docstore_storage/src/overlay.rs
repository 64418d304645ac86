//! Copy-on-write overlay scoped to one transaction.
//!
//! The overlay shadows the base backend: reads check the deleted set, then
//! the overlay map, then fall through to the base. Writes never reach the
//! base until [`Overlay::into_change_set`] is applied.

use crate::backend::GraphBackend;
use crate::change_set::ChangeSet;
use crate::error::{StorageError, StorageResult};
use docstore_model::{Decorator, DecoratorId, Node, NodeId};
use std::collections::{HashMap, HashSet};

/// Kind of write recorded in the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// Insert or overwrite.
    Put,
    /// Remove.
    Delete,
}

/// What a write touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordTarget {
    /// A node.
    Node(NodeId),
    /// A decorator.
    Decorator(DecoratorId),
}

/// One entry of the overlay's ordered write buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRecord {
    /// Position in the buffer, starting at 0.
    pub sequence: u64,
    /// Put or delete.
    pub kind: WriteKind,
    /// Written entity.
    pub target: RecordTarget,
    /// Operation that issued the write.
    pub operation: &'static str,
}

/// Result of looking an identifier up in the overlay alone.
#[derive(Debug, PartialEq)]
pub enum Slot<'a, T> {
    /// Deleted in this transaction.
    Deleted,
    /// Written in this transaction.
    Shadowed(&'a T),
    /// Not touched; read the base.
    Untouched,
}

/// Transient shadow state of one transaction.
#[derive(Debug)]
pub struct Overlay {
    root_id: NodeId,
    nodes: HashMap<NodeId, Node>,
    deleted: HashSet<NodeId>,
    decorators: HashMap<DecoratorId, Decorator>,
    deleted_decorators: HashSet<DecoratorId>,
    records: Vec<OverlayRecord>,
    current_operation: &'static str,
}

impl Overlay {
    /// Opens an empty overlay. `root_id` can never be deleted through it.
    #[must_use]
    pub fn new(root_id: NodeId) -> Self {
        Self {
            root_id,
            nodes: HashMap::new(),
            deleted: HashSet::new(),
            decorators: HashMap::new(),
            deleted_decorators: HashSet::new(),
            records: Vec::new(),
            current_operation: "",
        }
    }

    /// Sets the operation name attached to subsequent records.
    pub fn begin_operation(&mut self, name: &'static str) {
        self.current_operation = name;
    }

    /// Looks a node up in the overlay only.
    #[must_use]
    pub fn node_slot(&self, id: &NodeId) -> Slot<'_, Node> {
        if self.deleted.contains(id) {
            Slot::Deleted
        } else if let Some(node) = self.nodes.get(id) {
            Slot::Shadowed(node)
        } else {
            Slot::Untouched
        }
    }

    /// Reads a node through the overlay, falling back to `base`.
    pub fn read_node<B: GraphBackend + ?Sized>(&self, base: &B, id: &NodeId) -> Option<Node> {
        match self.node_slot(id) {
            Slot::Deleted => None,
            Slot::Shadowed(node) => Some(node.clone()),
            Slot::Untouched => base.get_node(id),
        }
    }

    /// Writes a node into the overlay.
    ///
    /// Writing a node deleted earlier in the same transaction resurrects it.
    pub fn put_node(&mut self, node: Node) {
        self.deleted.remove(&node.id);
        self.push_record(WriteKind::Put, RecordTarget::Node(node.id.clone()));
        self.nodes.insert(node.id.clone(), node);
    }

    /// Marks a node deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ProtectedNode`] for the document root; the
    /// overlay is left unchanged.
    pub fn delete_node(&mut self, id: &NodeId) -> StorageResult<()> {
        if *id == self.root_id {
            return Err(StorageError::ProtectedNode { id: id.to_string() });
        }
        self.nodes.remove(id);
        self.deleted.insert(id.clone());
        self.push_record(WriteKind::Delete, RecordTarget::Node(id.clone()));
        Ok(())
    }

    /// Looks a decorator up in the overlay only.
    #[must_use]
    pub fn decorator_slot(&self, id: &DecoratorId) -> Slot<'_, Decorator> {
        if self.deleted_decorators.contains(id) {
            Slot::Deleted
        } else if let Some(decorator) = self.decorators.get(id) {
            Slot::Shadowed(decorator)
        } else {
            Slot::Untouched
        }
    }

    /// Reads a decorator through the overlay, falling back to `base`.
    pub fn read_decorator<B: GraphBackend + ?Sized>(
        &self,
        base: &B,
        id: &DecoratorId,
    ) -> Option<Decorator> {
        match self.decorator_slot(id) {
            Slot::Deleted => None,
            Slot::Shadowed(decorator) => Some(decorator.clone()),
            Slot::Untouched => base.get_decorator(id),
        }
    }

    /// Returns every decorator visible through the overlay.
    pub fn visible_decorators<B: GraphBackend + ?Sized>(&self, base: &B) -> Vec<Decorator> {
        let mut visible: Vec<Decorator> = base
            .decorators()
            .into_iter()
            .filter(|d| {
                !self.deleted_decorators.contains(&d.id) && !self.decorators.contains_key(&d.id)
            })
            .collect();
        visible.extend(self.decorators.values().cloned());
        visible.sort_by(|a, b| a.id.cmp(&b.id));
        visible
    }

    /// Writes a decorator into the overlay.
    pub fn put_decorator(&mut self, decorator: Decorator) {
        self.deleted_decorators.remove(&decorator.id);
        self.push_record(
            WriteKind::Put,
            RecordTarget::Decorator(decorator.id.clone()),
        );
        self.decorators.insert(decorator.id.clone(), decorator);
    }

    /// Marks a decorator deleted.
    pub fn delete_decorator(&mut self, id: &DecoratorId) {
        self.decorators.remove(id);
        self.deleted_decorators.insert(id.clone());
        self.push_record(WriteKind::Delete, RecordTarget::Decorator(id.clone()));
    }

    /// Returns the ordered write buffer.
    #[must_use]
    pub fn records(&self) -> &[OverlayRecord] {
        &self.records
    }

    /// Returns true if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the identifiers of nodes written (not deleted) so far.
    pub fn written_nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Consumes the overlay into the change set to merge on commit.
    ///
    /// Entries are sorted by identifier so commits are deterministic.
    #[must_use]
    pub fn into_change_set(self) -> ChangeSet {
        let mut node_puts: Vec<Node> = self.nodes.into_values().collect();
        node_puts.sort_by(|a, b| a.id.cmp(&b.id));
        let mut node_deletes: Vec<NodeId> = self.deleted.into_iter().collect();
        node_deletes.sort();
        let mut decorator_puts: Vec<Decorator> = self.decorators.into_values().collect();
        decorator_puts.sort_by(|a, b| a.id.cmp(&b.id));
        let mut decorator_deletes: Vec<DecoratorId> =
            self.deleted_decorators.into_iter().collect();
        decorator_deletes.sort();

        ChangeSet {
            node_puts,
            node_deletes,
            decorator_puts,
            decorator_deletes,
        }
    }

    fn push_record(&mut self, kind: WriteKind, target: RecordTarget) {
        let sequence = self.records.len() as u64;
        self.records.push(OverlayRecord {
            sequence,
            kind,
            target,
            operation: self.current_operation,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use docstore_model::DecoratorCategory;

    fn base() -> InMemoryBackend {
        let mut backend = InMemoryBackend::with_root(Node::container("root", "doc"));
        backend.put_node(Node::text("t1", "base")).unwrap();
        backend
    }

    #[test]
    fn read_falls_through_to_base() {
        let base = base();
        let overlay = Overlay::new(NodeId::from("root"));
        let node = overlay.read_node(&base, &NodeId::from("t1")).unwrap();
        assert_eq!(node.text.as_deref(), Some("base"));
        assert_eq!(overlay.node_slot(&NodeId::from("t1")), Slot::Untouched);
    }

    #[test]
    fn overlay_value_wins() {
        let base = base();
        let mut overlay = Overlay::new(NodeId::from("root"));
        overlay.put_node(Node::text("t1", "shadow"));

        let node = overlay.read_node(&base, &NodeId::from("t1")).unwrap();
        assert_eq!(node.text.as_deref(), Some("shadow"));
        assert_eq!(base.get_node(&NodeId::from("t1")).unwrap().text.as_deref(), Some("base"));
    }

    #[test]
    fn deleted_hides_base() {
        let base = base();
        let mut overlay = Overlay::new(NodeId::from("root"));
        overlay.delete_node(&NodeId::from("t1")).unwrap();

        assert!(overlay.read_node(&base, &NodeId::from("t1")).is_none());
        assert!(base.has_node(&NodeId::from("t1")));
    }

    #[test]
    fn put_after_delete_resurrects() {
        let base = base();
        let mut overlay = Overlay::new(NodeId::from("root"));
        overlay.delete_node(&NodeId::from("t1")).unwrap();
        overlay.put_node(Node::text("t1", "again"));

        let node = overlay.read_node(&base, &NodeId::from("t1")).unwrap();
        assert_eq!(node.text.as_deref(), Some("again"));
        let changes = overlay.into_change_set();
        assert!(changes.node_deletes.is_empty());
        assert_eq!(changes.node_puts.len(), 1);
    }

    #[test]
    fn root_delete_is_rejected() {
        let mut overlay = Overlay::new(NodeId::from("root"));
        let result = overlay.delete_node(&NodeId::from("root"));
        assert!(matches!(result, Err(StorageError::ProtectedNode { .. })));
        assert!(overlay.is_empty());
    }

    #[test]
    fn records_keep_write_order() {
        let mut overlay = Overlay::new(NodeId::from("root"));
        overlay.begin_operation("createNode");
        overlay.put_node(Node::text("a", ""));
        overlay.begin_operation("deleteNode");
        overlay.delete_node(&NodeId::from("a")).unwrap();

        let records = overlay.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, WriteKind::Put);
        assert_eq!(records[0].operation, "createNode");
        assert_eq!(records[1].sequence, 1);
        assert_eq!(records[1].target, RecordTarget::Node(NodeId::from("a")));
    }

    #[test]
    fn visible_decorators_merge_base_and_overlay() {
        let mut base = base();
        base.put_decorator(Decorator::new("d1", "note", DecoratorCategory::Layer, None))
            .unwrap();
        base.put_decorator(Decorator::new("d2", "note", DecoratorCategory::Layer, None))
            .unwrap();

        let mut overlay = Overlay::new(NodeId::from("root"));
        overlay.delete_decorator(&DecoratorId::from("d1"));
        overlay.put_decorator(Decorator::new("d3", "pin", DecoratorCategory::Layer, None));

        let ids: Vec<_> = overlay
            .visible_decorators(&base)
            .into_iter()
            .map(|d| d.id.to_string())
            .collect();
        assert_eq!(ids, ["d2", "d3"]);
    }

    #[test]
    fn abort_is_dropping_the_overlay() {
        let base = base();
        {
            let mut overlay = Overlay::new(NodeId::from("root"));
            overlay.put_node(Node::text("t1", "changed"));
        }
        assert_eq!(base.get_node(&NodeId::from("t1")).unwrap().text.as_deref(), Some("base"));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeMap;

        #[derive(Debug, Clone)]
        enum Write {
            Put(u8, String),
            Delete(u8),
        }

        fn write_strategy() -> impl Strategy<Value = Write> {
            prop_oneof![
                (0u8..6, "[a-z]{0,4}").prop_map(|(k, v)| Write::Put(k, v)),
                (0u8..6).prop_map(Write::Delete),
            ]
        }

        proptest! {
            #[test]
            fn commit_matches_sequential_model(writes in prop::collection::vec(write_strategy(), 0..40)) {
                let mut base = InMemoryBackend::with_root(Node::container("root", "doc"));
                let mut model: BTreeMap<String, String> = BTreeMap::new();
                for k in 0..3u8 {
                    let id = format!("n{k}");
                    base.put_node(Node::text(id.as_str(), "seed")).unwrap();
                    model.insert(id, "seed".to_string());
                }

                let mut overlay = Overlay::new(NodeId::from("root"));
                for write in &writes {
                    match write {
                        Write::Put(k, v) => {
                            overlay.put_node(Node::text(format!("n{k}").as_str(), v.as_str()));
                            model.insert(format!("n{k}"), v.clone());
                        }
                        Write::Delete(k) => {
                            overlay.delete_node(&NodeId::new(format!("n{k}"))).unwrap();
                            model.remove(&format!("n{k}"));
                        }
                    }
                }
                base.apply(overlay.into_change_set()).unwrap();

                let mut stored: BTreeMap<String, String> = BTreeMap::new();
                for id in base.node_ids() {
                    if id.as_str() == "root" {
                        continue;
                    }
                    let node = base.get_node(&id).unwrap();
                    stored.insert(id.to_string(), node.text.unwrap_or_default());
                }
                prop_assert_eq!(stored, model);
            }
        }
    }
}
