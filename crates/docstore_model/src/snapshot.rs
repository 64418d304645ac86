//! JSON snapshots of a whole document.

use crate::decorator::Decorator;
use crate::error::{ModelError, ModelResult};
use crate::id::NodeId;
use crate::node::Node;
use crate::selection::Selection;
use serde::{Deserialize, Serialize};

/// A serializable copy of a document: every node, every decorator and the
/// selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    /// Identifier of the root node.
    pub root_id: NodeId,
    /// All nodes, in no particular order.
    pub nodes: Vec<Node>,
    /// All decorators.
    #[serde(default)]
    pub decorators: Vec<Decorator>,
    /// Selection at the time of the snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
}

impl DocumentSnapshot {
    /// Parses a snapshot from JSON text.
    pub fn from_json(text: &str) -> ModelResult<Self> {
        let snapshot: Self = serde_json::from_str(text)?;
        if !snapshot.nodes.iter().any(|n| n.id == snapshot.root_id) {
            return Err(ModelError::invalid_snapshot(format!(
                "root node {} is missing",
                snapshot.root_id
            )));
        }
        Ok(snapshot)
    }

    /// Serializes the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Sorts nodes and decorators by identifier so equal documents compare
    /// equal regardless of storage iteration order.
    pub fn canonicalize(&mut self) {
        self.nodes.sort_by(|a, b| a.id.cmp(&b.id));
        self.decorators.sort_by(|a, b| a.id.cmp(&b.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_root() {
        let text = r#"{"rootId": "root", "nodes": [{"id": "a", "type": "doc", "content": []}]}"#;
        let err = DocumentSnapshot::from_json(text).unwrap_err();
        assert!(matches!(err, ModelError::InvalidSnapshot { .. }));
    }

    #[test]
    fn json_round_trip() {
        let snapshot = DocumentSnapshot {
            root_id: NodeId::from("root"),
            nodes: vec![Node::container("root", "doc")],
            decorators: Vec::new(),
            selection: None,
        };
        let text = snapshot.to_json().unwrap();
        assert_eq!(DocumentSnapshot::from_json(&text).unwrap(), snapshot);
    }

    #[test]
    fn canonicalize_orders_by_id() {
        let mut snapshot = DocumentSnapshot {
            root_id: NodeId::from("root"),
            nodes: vec![Node::text("b", ""), Node::container("root", "doc"), Node::text("a", "")],
            decorators: Vec::new(),
            selection: None,
        };
        snapshot.canonicalize();
        let ids: Vec<_> = snapshot.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "root"]);
    }
}
