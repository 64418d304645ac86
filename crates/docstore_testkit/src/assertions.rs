//! Invariant assertions.
//!
//! These panic with a description of the broken invariant, for use in
//! tests and proptest bodies.

use docstore_core::marks::normalize_marks;
use docstore_core::{DocumentStore, NodeReader};
use docstore_model::{DocumentSnapshot, Mark, Node, NodeId, Selection};

/// Asserts that every mark lies inside the text and that the list is in
/// normalized form (sorted, no empty marks, no overlapping or touching
/// marks of the same kind).
pub fn assert_marks_normalized(node: &Node) {
    let len = node.text_len();
    let marks = node.marks();
    for mark in marks {
        assert!(
            mark.range.start < mark.range.end && mark.range.end <= len,
            "mark {mark:?} on {} is outside 0..{len}",
            node.id
        );
    }
    for (i, a) in marks.iter().enumerate() {
        for b in &marks[i + 1..] {
            assert!(
                !(a.same_kind(b) && a.range.touches(&b.range)),
                "marks {a:?} and {b:?} on {} should have been merged",
                node.id
            );
        }
    }
    assert_eq!(
        normalize_marks(marks.to_vec(), len),
        marks,
        "marks on {} are not in normalized order",
        node.id
    );
}

/// Asserts that the node's text equals `expected`.
pub fn assert_text<R: NodeReader + ?Sized>(reader: &R, node_id: &str, expected: &str) {
    let node = reader
        .get_node(&NodeId::from(node_id))
        .unwrap_or_else(|| panic!("node {node_id} does not exist"));
    assert_eq!(node.text.as_deref(), Some(expected), "text of {node_id}");
}

/// Asserts that the node's marks equal `expected`.
pub fn assert_marks<R: NodeReader + ?Sized>(reader: &R, node_id: &str, expected: &[Mark]) {
    let node = reader
        .get_node(&NodeId::from(node_id))
        .unwrap_or_else(|| panic!("node {node_id} does not exist"));
    assert_eq!(node.marks(), expected, "marks of {node_id}");
}

/// Asserts that every point of the selection exists and is inside its
/// node's text.
pub fn assert_selection_in_bounds(store: &DocumentStore) {
    let Some(selection) = store.selection() else {
        return;
    };
    for id in selection.node_ids() {
        assert!(store.has_node(id), "selection refers to missing node {id}");
    }
    if let Selection::Range(range) = &selection {
        for (id, offset) in [
            (&range.start_node_id, range.start_offset),
            (&range.end_node_id, range.end_offset),
        ] {
            let len = store.get_node(id).map_or(0, |n| n.text_len());
            assert!(offset <= len, "selection offset {offset} past end of {id} ({len})");
        }
    }
}

/// Asserts that the committed document passes the integrity checker and
/// that every text leaf has normalized marks.
pub fn assert_store_sound(store: &DocumentStore) {
    let snapshot = store.snapshot();
    let report = docstore_core::check_integrity(&snapshot);
    assert!(report.is_ok(), "integrity issues: {:?}", report.issues);
    for node in snapshot.nodes.iter().filter(|n| n.is_text()) {
        assert_marks_normalized(node);
    }
    assert_selection_in_bounds(store);
}

/// Asserts that two snapshots hold the same nodes, decorators and
/// selection, naming the first differing node.
pub fn assert_same_document(actual: &DocumentSnapshot, expected: &DocumentSnapshot) {
    let mut actual = actual.clone();
    let mut expected = expected.clone();
    actual.canonicalize();
    expected.canonicalize();
    for (a, e) in actual.nodes.iter().zip(&expected.nodes) {
        assert_eq!(a, e, "node {} differs", e.id);
    }
    assert_eq!(actual, expected);
}
