//! Node records and creation payloads.

use crate::id::NodeId;
use crate::mark::Mark;
use crate::text::char_len;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute record attached to nodes, marks and decorators.
pub type Attrs = BTreeMap<String, serde_json::Value>;

/// A node in the document graph.
///
/// A node with `content` is a container and carries no text. A node with
/// `text` is a leaf and carries no child list. A node with neither is an
/// atom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Stable identifier.
    pub id: NodeId,
    /// Type tag (e.g. `paragraph`, `text`).
    #[serde(rename = "type")]
    pub node_type: String,
    /// Optional attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
    /// Leaf text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Ordered child identifiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<NodeId>>,
    /// Marks over `text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Mark>>,
    /// Back-reference to the containing node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
}

impl Node {
    /// Creates a container node with an empty child list.
    #[must_use]
    pub fn container(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            attrs: None,
            text: None,
            content: Some(Vec::new()),
            marks: None,
            parent: None,
        }
    }

    /// Creates a text leaf.
    #[must_use]
    pub fn text(id: impl Into<NodeId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: "text".to_string(),
            attrs: None,
            text: Some(text.into()),
            content: None,
            marks: None,
            parent: None,
        }
    }

    /// Returns true if the node carries text.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    /// Returns true if the node carries a child list.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.content.is_some()
    }

    /// Returns the text length in chars (0 for non-text nodes).
    #[must_use]
    pub fn text_len(&self) -> usize {
        self.text.as_deref().map(char_len).unwrap_or(0)
    }

    /// Returns the children (empty for non-containers).
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        self.content.as_deref().unwrap_or(&[])
    }

    /// Returns the marks (empty if none).
    #[must_use]
    pub fn marks(&self) -> &[Mark] {
        self.marks.as_deref().unwrap_or(&[])
    }

    /// Returns the index of `child` in this node's child list.
    #[must_use]
    pub fn child_index(&self, child: &NodeId) -> Option<usize> {
        self.children().iter().position(|c| c == child)
    }

    /// Returns the attribute value for `key`.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&serde_json::Value> {
        self.attrs.as_ref().and_then(|attrs| attrs.get(key))
    }

    /// Builder: attaches attributes.
    #[must_use]
    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = Some(attrs);
        self
    }

    /// Builder: attaches marks.
    #[must_use]
    pub fn with_marks(mut self, marks: Vec<Mark>) -> Self {
        self.marks = Some(marks);
        self
    }

    /// Builder: sets the node type.
    #[must_use]
    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = node_type.into();
        self
    }

    /// Builder: sets the child list.
    #[must_use]
    pub fn with_children(mut self, children: Vec<NodeId>) -> Self {
        self.content = Some(children);
        self
    }
}

/// A node description used by `createNode` and `addChild`.
///
/// `id` may be omitted; the transaction manager assigns one before the
/// operation runs so the recorded operation replays deterministically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInit {
    /// Identifier to use; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    /// Type tag.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
    /// Leaf text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Children, inline or by reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ChildInit>>,
    /// Marks over `text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Mark>>,
}

impl NodeInit {
    /// Describes a container without children.
    #[must_use]
    pub fn container(node_type: impl Into<String>) -> Self {
        Self {
            id: None,
            node_type: node_type.into(),
            attrs: None,
            text: None,
            content: Some(Vec::new()),
            marks: None,
        }
    }

    /// Describes a text leaf.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            node_type: "text".to_string(),
            attrs: None,
            text: Some(text.into()),
            content: None,
            marks: None,
        }
    }

    /// Builder: fixes the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder: appends an inline child.
    #[must_use]
    pub fn child(mut self, child: NodeInit) -> Self {
        self.content
            .get_or_insert_with(Vec::new)
            .push(ChildInit::Inline(Box::new(child)));
        self
    }

    /// Builder: attaches marks.
    #[must_use]
    pub fn with_marks(mut self, marks: Vec<Mark>) -> Self {
        self.marks = Some(marks);
        self
    }

    /// Builder: attaches attributes.
    #[must_use]
    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = Some(attrs);
        self
    }

    /// Fills in generated identifiers for this node and every inline child.
    pub fn assign_ids(&mut self, prefix: Option<&str>) {
        if self.id.is_none() {
            self.id = Some(NodeId::generate(prefix));
        }
        for child in self.content.iter_mut().flatten() {
            if let ChildInit::Inline(inner) = child {
                inner.assign_ids(prefix);
            }
        }
    }
}

/// A child entry in a [`NodeInit`]: either a nested description or a
/// reference to an existing node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildInit {
    /// Reference to an existing, detached node.
    Ref(NodeId),
    /// A nested node to create.
    Inline(Box<NodeInit>),
}
