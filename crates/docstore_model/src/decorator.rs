//! Decorators: annotations positioned against nodes or free-floating.

use crate::id::{DecoratorId, NodeId};
use crate::mark::Span;
use crate::node::Attrs;
use serde::{Deserialize, Serialize};

/// How a decorator is positioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoratorCategory {
    /// Positioned independently of the node graph.
    Layer,
    /// Anchored to a char range inside a node.
    Inline,
    /// Anchored to a whole node.
    Block,
}

impl DecoratorCategory {
    /// Returns true if this category requires a target.
    #[must_use]
    pub const fn requires_target(self) -> bool {
        matches!(self, Self::Inline | Self::Block)
    }
}

/// The node (and optionally the char range) a decorator is anchored to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratorTarget {
    /// Target node.
    pub node_id: NodeId,
    /// Start offset within the node text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<usize>,
    /// End offset within the node text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<usize>,
}

impl DecoratorTarget {
    /// Targets a whole node.
    #[must_use]
    pub fn node(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            start_offset: None,
            end_offset: None,
        }
    }

    /// Targets a char range in a node.
    #[must_use]
    pub fn range(node_id: impl Into<NodeId>, start: usize, end: usize) -> Self {
        Self {
            node_id: node_id.into(),
            start_offset: Some(start),
            end_offset: Some(end),
        }
    }

    /// Returns the char range when both offsets are present.
    #[must_use]
    pub fn span(&self) -> Option<Span> {
        match (self.start_offset, self.end_offset) {
            (Some(start), Some(end)) => Some(Span::new(start, end)),
            _ => None,
        }
    }
}

/// An annotation that is not part of the text itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decorator {
    /// Stable identifier.
    pub id: DecoratorId,
    /// Type tag (e.g. `comment`, `highlight`).
    #[serde(rename = "type")]
    pub decorator_type: String,
    /// Positioning category.
    pub category: DecoratorCategory,
    /// Anchor; required for `inline` and `block`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<DecoratorTarget>,
    /// Opaque data.
    #[serde(default)]
    pub data: Attrs,
}

impl Decorator {
    /// Creates a decorator with empty data.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        decorator_type: impl Into<String>,
        category: DecoratorCategory,
        target: Option<DecoratorTarget>,
    ) -> Self {
        Self {
            id: DecoratorId::new(id),
            decorator_type: decorator_type.into(),
            category,
            target,
            data: Attrs::new(),
        }
    }

    /// Returns the target node, if any.
    #[must_use]
    pub fn target_node(&self) -> Option<&NodeId> {
        self.target.as_ref().map(|t| &t.node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_wire_names() {
        assert_eq!(serde_json::to_value(DecoratorCategory::Layer).unwrap(), json!("layer"));
        assert!(DecoratorCategory::Inline.requires_target());
        assert!(!DecoratorCategory::Layer.requires_target());
    }

    #[test]
    fn target_span_needs_both_offsets() {
        assert_eq!(DecoratorTarget::range("t1", 1, 4).span(), Some(Span::new(1, 4)));
        assert_eq!(DecoratorTarget::node("t1").span(), None);
    }

    #[test]
    fn layer_without_target_round_trips() {
        let value = json!({"id": "d1", "type": "sticker", "category": "layer", "data": {"x": 3}});
        let decorator: Decorator = serde_json::from_value(value.clone()).unwrap();
        assert!(decorator.target.is_none());
        assert_eq!(serde_json::to_value(&decorator).unwrap(), value);
    }
}
