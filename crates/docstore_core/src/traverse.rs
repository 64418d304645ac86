//! Read contract and traversal helpers.
//!
//! Everything here is built on [`NodeReader::get_node`] and child-list
//! following; no separate index exists. The committed [`crate::NodeGraph`]
//! and the in-transaction [`crate::TransactionContext`] both implement the
//! trait, so the same helpers serve external readers and operations.

use crate::error::{StoreError, StoreResult};
use docstore_model::{Decorator, DecoratorId, Node, NodeId};
use std::collections::HashSet;

/// Read access to a node graph.
pub trait NodeReader {
    /// Returns a copy of the node, if present.
    fn get_node(&self, id: &NodeId) -> Option<Node>;

    /// Returns true if the node is present.
    fn has_node(&self, id: &NodeId) -> bool {
        self.get_node(id).is_some()
    }

    /// Returns a copy of the decorator, if present.
    fn get_decorator(&self, id: &DecoratorId) -> Option<Decorator>;

    /// Returns the document root identifier.
    fn root_id(&self) -> &NodeId;
}

/// Returns the children of `id` in order. Missing children are skipped.
pub fn children<R: NodeReader + ?Sized>(reader: &R, id: &NodeId) -> Vec<Node> {
    reader
        .get_node(id)
        .map(|node| {
            node.children()
                .iter()
                .filter_map(|child| reader.get_node(child))
                .collect()
        })
        .unwrap_or_default()
}

/// Returns the parent of `id`.
pub fn parent<R: NodeReader + ?Sized>(reader: &R, id: &NodeId) -> Option<Node> {
    reader
        .get_node(id)
        .and_then(|node| node.parent)
        .and_then(|parent| reader.get_node(&parent))
}

/// Returns the siblings of `id` (excluding `id` itself) in order.
pub fn siblings<R: NodeReader + ?Sized>(reader: &R, id: &NodeId) -> Vec<Node> {
    parent(reader, id)
        .map(|p| {
            p.children()
                .iter()
                .filter(|child| *child != id)
                .filter_map(|child| reader.get_node(child))
                .collect()
        })
        .unwrap_or_default()
}

/// Returns the parent identifier and the position of `id` in its child list.
pub fn index_in_parent<R: NodeReader + ?Sized>(reader: &R, id: &NodeId) -> Option<(NodeId, usize)> {
    let p = parent(reader, id)?;
    let index = p.child_index(id)?;
    Some((p.id, index))
}

/// Returns `id` and all its descendants in pre-order.
///
/// Each node is visited once even if the graph is malformed.
pub fn subtree<R: NodeReader + ?Sized>(reader: &R, id: &NodeId) -> Vec<Node> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![id.clone()];
    while let Some(next) = stack.pop() {
        if !seen.insert(next.clone()) {
            continue;
        }
        let Some(node) = reader.get_node(&next) else {
            continue;
        };
        stack.extend(node.children().iter().rev().cloned());
        out.push(node);
    }
    out
}

/// Returns `id` and all its descendants ordered children-first, `id` last.
pub fn descendants_bottom_up<R: NodeReader + ?Sized>(reader: &R, id: &NodeId) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = subtree(reader, id).into_iter().map(|n| n.id).collect();
    ids.reverse();
    ids
}

/// Returns true if `ancestor` is a proper ancestor of `node`.
pub fn is_ancestor<R: NodeReader + ?Sized>(reader: &R, ancestor: &NodeId, node: &NodeId) -> bool {
    path_to_root(reader, node)
        .iter()
        .skip(1)
        .any(|id| id == ancestor)
}

/// Returns `id`, its parent, and so on up to the topmost reachable ancestor.
pub fn path_to_root<R: NodeReader + ?Sized>(reader: &R, id: &NodeId) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some(id.clone());
    while let Some(next) = current {
        if !seen.insert(next.clone()) {
            break;
        }
        current = reader.get_node(&next).and_then(|n| n.parent);
        path.push(next);
    }
    path
}

/// Returns the text leaves from `start` to `end` inclusive, in document
/// order.
///
/// # Errors
///
/// Returns `NotFound` if either node is missing or not a text leaf reachable
/// from the root, and `InvalidOperation` if `end` precedes `start`.
pub fn text_leaves_between<R: NodeReader + ?Sized>(
    reader: &R,
    start: &NodeId,
    end: &NodeId,
) -> StoreResult<Vec<Node>> {
    let leaves: Vec<Node> = subtree(reader, reader.root_id())
        .into_iter()
        .filter(Node::is_text)
        .collect();
    let first = leaves
        .iter()
        .position(|n| &n.id == start)
        .ok_or_else(|| StoreError::node_not_found(start))?;
    let last = leaves
        .iter()
        .position(|n| &n.id == end)
        .ok_or_else(|| StoreError::node_not_found(end))?;
    if last < first {
        return Err(StoreError::invalid_operation(format!(
            "span end {end} precedes start {start}"
        )));
    }
    Ok(leaves[first..=last].to_vec())
}
