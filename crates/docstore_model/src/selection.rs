//! Selection values.

use crate::id::NodeId;
use serde::{Deserialize, Serialize};

/// A text range selection between two node offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeSelection {
    /// Node holding the start point.
    pub start_node_id: NodeId,
    /// Char offset of the start point.
    pub start_offset: usize,
    /// Node holding the end point.
    pub end_node_id: NodeId,
    /// Char offset of the end point.
    pub end_offset: usize,
    /// True if start and end coincide.
    pub collapsed: bool,
}

/// The user's selection.
///
/// Selections are plain values: they are copied into a transaction context
/// and back out, never shared with storage internals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Selection {
    /// A range (or caret) over text.
    Range(RangeSelection),
    /// A single selected node.
    #[serde(rename_all = "camelCase")]
    Node {
        /// The selected node.
        node_id: NodeId,
    },
    /// Several selected nodes.
    #[serde(rename_all = "camelCase")]
    Multi {
        /// The selected nodes.
        node_ids: Vec<NodeId>,
        /// The node that anchors the selection.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        primary_node_id: Option<NodeId>,
    },
}

impl Selection {
    /// A collapsed caret at `offset` in `node_id`.
    #[must_use]
    pub fn caret(node_id: impl Into<NodeId>, offset: usize) -> Self {
        let node_id = node_id.into();
        Self::Range(RangeSelection {
            start_node_id: node_id.clone(),
            start_offset: offset,
            end_node_id: node_id,
            end_offset: offset,
            collapsed: true,
        })
    }

    /// A range selection; `collapsed` is derived from the endpoints.
    #[must_use]
    pub fn range(
        start_node_id: impl Into<NodeId>,
        start_offset: usize,
        end_node_id: impl Into<NodeId>,
        end_offset: usize,
    ) -> Self {
        let start_node_id = start_node_id.into();
        let end_node_id = end_node_id.into();
        let collapsed = start_node_id == end_node_id && start_offset == end_offset;
        Self::Range(RangeSelection {
            start_node_id,
            start_offset,
            end_node_id,
            end_offset,
            collapsed,
        })
    }

    /// A single-node selection.
    #[must_use]
    pub fn node(node_id: impl Into<NodeId>) -> Self {
        Self::Node {
            node_id: node_id.into(),
        }
    }

    /// Returns true for a collapsed range selection.
    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        matches!(self, Self::Range(range) if range.collapsed)
    }

    /// Returns every node the selection refers to.
    #[must_use]
    pub fn node_ids(&self) -> Vec<&NodeId> {
        match self {
            Self::Range(range) => {
                if range.start_node_id == range.end_node_id {
                    vec![&range.start_node_id]
                } else {
                    vec![&range.start_node_id, &range.end_node_id]
                }
            }
            Self::Node { node_id } => vec![node_id],
            Self::Multi {
                node_ids,
                primary_node_id,
            } => node_ids.iter().chain(primary_node_id.iter()).collect(),
        }
    }
}

impl RangeSelection {
    /// Recomputes `collapsed` from the endpoints.
    pub fn refresh_collapsed(&mut self) {
        self.collapsed =
            self.start_node_id == self.end_node_id && self.start_offset == self.end_offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn caret_is_collapsed() {
        assert!(Selection::caret("t1", 3).is_collapsed());
        assert!(!Selection::range("t1", 0, "t1", 3).is_collapsed());
        assert!(Selection::range("t1", 3, "t1", 3).is_collapsed());
    }

    #[test]
    fn wire_shape_is_tagged() {
        let value = serde_json::to_value(Selection::node("p1")).unwrap();
        assert_eq!(value, json!({"kind": "node", "nodeId": "p1"}));

        let range = serde_json::to_value(Selection::caret("t1", 2)).unwrap();
        assert_eq!(range["kind"], "range");
        assert_eq!(range["startNodeId"], "t1");
    }

    #[test]
    fn node_ids_dedup_single_node_range() {
        assert_eq!(Selection::caret("t1", 0).node_ids().len(), 1);
        assert_eq!(Selection::range("a", 0, "b", 1).node_ids().len(), 2);
    }
}
