//! Operation records.
//!
//! An [`Operation`] is a named mutation request. On the wire it is a
//! `{ "type": <name>, "payload": { ... } }` record; the set of names is
//! closed and dispatched by `match` in the operation library.

use crate::decorator::Decorator;
use crate::id::{DecoratorId, NodeId};
use crate::mark::{Mark, Span};
use crate::node::{Attrs, ChildInit, NodeInit};
use crate::selection::Selection;
use serde::{Deserialize, Serialize};

/// Payload for `createNode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodePayload {
    /// The node (and inline children) to create.
    pub node: NodeInit,
    /// Parent to attach to; the node stays detached when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    /// Index in the parent's child list; appends when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

/// Payload for `deleteNode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNodePayload {
    /// Node to delete together with its subtree.
    pub node_id: NodeId,
}

/// Payload for `updateNode`.
///
/// `attrs` is shallow-merged; a `null` value removes the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodePayload {
    /// Node to update.
    pub node_id: NodeId,
    /// Attributes to merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
    /// Replacement text (leaf nodes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Replacement marks (leaf nodes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Mark>>,
}

/// Payload for `addChild`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChildPayload {
    /// Container receiving the child.
    pub parent_id: NodeId,
    /// Existing detached node or a node to create.
    pub child: ChildInit,
    /// Insertion index; appends when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

/// Payload for `removeChild`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveChildPayload {
    /// Container losing the child.
    pub parent_id: NodeId,
    /// Child to detach.
    pub child_id: NodeId,
}

/// Payload for `moveNode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveNodePayload {
    /// Node to move.
    pub node_id: NodeId,
    /// Destination container.
    pub new_parent_id: NodeId,
    /// Index in the destination after removal; appends when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

/// Payload for `reorderChildren`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderChildrenPayload {
    /// Container to reorder.
    pub parent_id: NodeId,
    /// The complete new order.
    pub child_ids: Vec<NodeId>,
}

/// Payload for `insertText`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertTextPayload {
    /// Text leaf.
    pub node_id: NodeId,
    /// Char offset to insert at.
    pub pos: usize,
    /// Inserted text.
    pub text: String,
}

/// Payload for `deleteTextRange`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTextPayload {
    /// Text leaf.
    pub node_id: NodeId,
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

/// Payload for `replaceText`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceTextPayload {
    /// Text leaf.
    pub node_id: NodeId,
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
    /// Replacement text.
    pub text: String,
}

/// Payload shared by `applyMark`, `removeMark`, `toggleMark` and `updateMark`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPayload {
    /// Text leaf.
    pub node_id: NodeId,
    /// Mark type.
    pub mark_type: String,
    /// Affected range; the whole text when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Span>,
    /// Mark attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
}

/// Payload for `setMarks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMarksPayload {
    /// Text leaf.
    pub node_id: NodeId,
    /// The complete mark list.
    pub marks: Vec<Mark>,
}

/// Payload for `splitTextNode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitTextPayload {
    /// Text leaf to split.
    pub node_id: NodeId,
    /// Char offset of the split.
    pub offset: usize,
    /// Identifier of the right part; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_node_id: Option<NodeId>,
    /// Type of the right part; copies the left when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Attributes of the right part; copies the left when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
}

/// Payload for `splitBlockNode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitBlockPayload {
    /// Container to split.
    pub node_id: NodeId,
    /// Index of the first child moved to the right part.
    pub index: usize,
    /// Identifier of the right part; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_node_id: Option<NodeId>,
    /// Type of the right part; copies the left when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Attributes of the right part; copies the left when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
}

/// Payload for `mergeTextNodes` and `mergeBlockNodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeNodesPayload {
    /// Node that survives.
    pub left_id: NodeId,
    /// Node merged into `left_id` and deleted.
    pub right_id: NodeId,
}

/// Payload for `addDecorator`, `updateDecorator` and `putDecorator`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDecoratorPayload {
    /// The full decorator record.
    pub decorator: Decorator,
}

/// Payload for `removeDecorator`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveDecoratorPayload {
    /// Decorator to remove.
    pub decorator_id: DecoratorId,
}

/// Payload for `setSelection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSelectionPayload {
    /// New selection; `null` clears it.
    pub selection: Option<Selection>,
}

/// Chooses nodes for `forEachNode`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelector {
    /// Subtree to search; the document root when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<NodeId>,
    /// Only nodes of this type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Only text leaves.
    #[serde(default)]
    pub text_only: bool,
}

/// Payload for `forEachNode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForEachNodePayload {
    /// Which nodes to visit.
    pub selector: NodeSelector,
    /// Template retargeted at every selected node.
    pub operation: Box<Operation>,
}

/// A predicate evaluated by `when` against the in-transaction state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Condition {
    /// The node exists.
    #[serde(rename_all = "camelCase")]
    NodeExists {
        /// Node to look up.
        node_id: NodeId,
    },
    /// The node exists and has this type.
    #[serde(rename_all = "camelCase")]
    NodeType {
        /// Node to look up.
        node_id: NodeId,
        /// Expected type.
        node_type: String,
    },
    /// The node carries at least one mark of this type.
    #[serde(rename_all = "camelCase")]
    HasMark {
        /// Node to look up.
        node_id: NodeId,
        /// Mark type.
        mark_type: String,
    },
    /// The current selection is a collapsed range.
    SelectionCollapsed,
    /// Negates the inner condition.
    Not {
        /// Condition to negate.
        condition: Box<Condition>,
    },
}

/// Payload for `when`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhenPayload {
    /// Predicate.
    pub condition: Condition,
    /// Operations produced when the predicate holds.
    #[serde(default)]
    pub then: Vec<Operation>,
    /// Operations produced otherwise.
    #[serde(default)]
    pub otherwise: Vec<Operation>,
}

/// Payload for `deleteSpan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSpanPayload {
    /// Text leaf holding the start point.
    pub start_node_id: NodeId,
    /// Start offset.
    pub start_offset: usize,
    /// Text leaf holding the end point.
    pub end_node_id: NodeId,
    /// End offset.
    pub end_offset: usize,
}

/// Payload for `applyMarkSpan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyMarkSpanPayload {
    /// Text leaf holding the start point.
    pub start_node_id: NodeId,
    /// Start offset.
    pub start_offset: usize,
    /// Text leaf holding the end point.
    pub end_node_id: NodeId,
    /// End offset.
    pub end_offset: usize,
    /// Mark type.
    pub mark_type: String,
    /// Mark attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
}

/// A named mutation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Operation {
    /// Create a node, recursively creating inline children.
    CreateNode(CreateNodePayload),
    /// Delete a node and its subtree.
    DeleteNode(DeleteNodePayload),
    /// Merge attributes and replace text/marks.
    UpdateNode(UpdateNodePayload),
    /// Attach or create a child.
    AddChild(AddChildPayload),
    /// Detach a child.
    RemoveChild(RemoveChildPayload),
    /// Move a node to a new parent/position.
    MoveNode(MoveNodePayload),
    /// Replace a container's child order.
    ReorderChildren(ReorderChildrenPayload),
    /// Insert text at an offset.
    InsertText(InsertTextPayload),
    /// Delete a char range.
    DeleteTextRange(DeleteTextPayload),
    /// Replace a char range.
    ReplaceText(ReplaceTextPayload),
    /// Apply a mark over a range.
    ApplyMark(MarkPayload),
    /// Remove a mark type from a range.
    RemoveMark(MarkPayload),
    /// Apply or remove a mark depending on current coverage.
    ToggleMark(MarkPayload),
    /// Merge attributes into marks intersecting a range.
    UpdateMark(MarkPayload),
    /// Replace a node's marks.
    SetMarks(SetMarksPayload),
    /// Split a text leaf into two siblings.
    SplitTextNode(SplitTextPayload),
    /// Merge two adjacent text leaves.
    MergeTextNodes(MergeNodesPayload),
    /// Split a container's child list into two siblings.
    SplitBlockNode(SplitBlockPayload),
    /// Merge two adjacent containers.
    MergeBlockNodes(MergeNodesPayload),
    /// Insert a new decorator.
    AddDecorator(AddDecoratorPayload),
    /// Remove a decorator.
    RemoveDecorator(RemoveDecoratorPayload),
    /// Replace an existing decorator.
    UpdateDecorator(AddDecoratorPayload),
    /// Insert or replace a decorator.
    PutDecorator(AddDecoratorPayload),
    /// Replace the selection projection.
    SetSelection(SetSelectionPayload),
    /// Produce one operation per selected node.
    ForEachNode(ForEachNodePayload),
    /// Produce operations depending on a condition.
    When(WhenPayload),
    /// Produce text deletions across adjacent leaves.
    DeleteSpan(DeleteSpanPayload),
    /// Produce mark applications across adjacent leaves.
    ApplyMarkSpan(ApplyMarkSpanPayload),
}

impl Operation {
    /// Returns the wire name of this operation.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateNode(_) => "createNode",
            Self::DeleteNode(_) => "deleteNode",
            Self::UpdateNode(_) => "updateNode",
            Self::AddChild(_) => "addChild",
            Self::RemoveChild(_) => "removeChild",
            Self::MoveNode(_) => "moveNode",
            Self::ReorderChildren(_) => "reorderChildren",
            Self::InsertText(_) => "insertText",
            Self::DeleteTextRange(_) => "deleteTextRange",
            Self::ReplaceText(_) => "replaceText",
            Self::ApplyMark(_) => "applyMark",
            Self::RemoveMark(_) => "removeMark",
            Self::ToggleMark(_) => "toggleMark",
            Self::UpdateMark(_) => "updateMark",
            Self::SetMarks(_) => "setMarks",
            Self::SplitTextNode(_) => "splitTextNode",
            Self::MergeTextNodes(_) => "mergeTextNodes",
            Self::SplitBlockNode(_) => "splitBlockNode",
            Self::MergeBlockNodes(_) => "mergeBlockNodes",
            Self::AddDecorator(_) => "addDecorator",
            Self::RemoveDecorator(_) => "removeDecorator",
            Self::UpdateDecorator(_) => "updateDecorator",
            Self::PutDecorator(_) => "putDecorator",
            Self::SetSelection(_) => "setSelection",
            Self::ForEachNode(_) => "forEachNode",
            Self::When(_) => "when",
            Self::DeleteSpan(_) => "deleteSpan",
            Self::ApplyMarkSpan(_) => "applyMarkSpan",
        }
    }

    /// Returns true for operations that produce other operations instead of
    /// mutating state themselves.
    #[must_use]
    pub fn is_combinator(&self) -> bool {
        matches!(
            self,
            Self::ForEachNode(_) | Self::When(_) | Self::DeleteSpan(_) | Self::ApplyMarkSpan(_)
        )
    }

    /// Returns the single node this operation targets, if it has one.
    #[must_use]
    pub fn target_node(&self) -> Option<&NodeId> {
        match self {
            Self::DeleteNode(p) => Some(&p.node_id),
            Self::UpdateNode(p) => Some(&p.node_id),
            Self::InsertText(p) => Some(&p.node_id),
            Self::DeleteTextRange(p) => Some(&p.node_id),
            Self::ReplaceText(p) => Some(&p.node_id),
            Self::ApplyMark(p) | Self::RemoveMark(p) | Self::ToggleMark(p) | Self::UpdateMark(p) => {
                Some(&p.node_id)
            }
            Self::SetMarks(p) => Some(&p.node_id),
            Self::SplitTextNode(p) => Some(&p.node_id),
            Self::SplitBlockNode(p) => Some(&p.node_id),
            Self::MoveNode(p) => Some(&p.node_id),
            _ => None,
        }
    }

    /// Returns a copy of this operation aimed at `node_id`.
    ///
    /// Returns `None` for operations without a single node target.
    #[must_use]
    pub fn retarget(&self, node_id: &NodeId) -> Option<Operation> {
        let mut op = self.clone();
        let slot = match &mut op {
            Self::DeleteNode(p) => &mut p.node_id,
            Self::UpdateNode(p) => &mut p.node_id,
            Self::InsertText(p) => &mut p.node_id,
            Self::DeleteTextRange(p) => &mut p.node_id,
            Self::ReplaceText(p) => &mut p.node_id,
            Self::ApplyMark(p) | Self::RemoveMark(p) | Self::ToggleMark(p) | Self::UpdateMark(p) => {
                &mut p.node_id
            }
            Self::SetMarks(p) => &mut p.node_id,
            Self::SplitTextNode(p) => &mut p.node_id,
            Self::SplitBlockNode(p) => &mut p.node_id,
            Self::MoveNode(p) => &mut p.node_id,
            _ => return None,
        };
        *slot = node_id.clone();
        Some(op)
    }

    /// Fills in every identifier the operation would otherwise generate.
    ///
    /// Recording the filled-in form makes replay (redo, collaboration)
    /// produce the same identifiers.
    pub fn assign_ids(&mut self, prefix: Option<&str>) {
        match self {
            Self::CreateNode(p) => p.node.assign_ids(prefix),
            Self::AddChild(p) => {
                if let ChildInit::Inline(init) = &mut p.child {
                    init.assign_ids(prefix);
                }
            }
            Self::SplitTextNode(p) => {
                p.new_node_id.get_or_insert_with(|| NodeId::generate(prefix));
            }
            Self::SplitBlockNode(p) => {
                p.new_node_id.get_or_insert_with(|| NodeId::generate(prefix));
            }
            _ => {}
        }
    }

    /// `insertText` shorthand.
    #[must_use]
    pub fn insert_text(node_id: impl Into<NodeId>, pos: usize, text: impl Into<String>) -> Self {
        Self::InsertText(InsertTextPayload {
            node_id: node_id.into(),
            pos,
            text: text.into(),
        })
    }

    /// `deleteTextRange` shorthand.
    #[must_use]
    pub fn delete_text(node_id: impl Into<NodeId>, start: usize, end: usize) -> Self {
        Self::DeleteTextRange(DeleteTextPayload {
            node_id: node_id.into(),
            start,
            end,
        })
    }

    /// `replaceText` shorthand.
    #[must_use]
    pub fn replace_text(
        node_id: impl Into<NodeId>,
        start: usize,
        end: usize,
        text: impl Into<String>,
    ) -> Self {
        Self::ReplaceText(ReplaceTextPayload {
            node_id: node_id.into(),
            start,
            end,
            text: text.into(),
        })
    }

    /// `applyMark` shorthand over `[start, end)`.
    #[must_use]
    pub fn apply_mark(
        node_id: impl Into<NodeId>,
        mark_type: impl Into<String>,
        start: usize,
        end: usize,
    ) -> Self {
        Self::ApplyMark(MarkPayload {
            node_id: node_id.into(),
            mark_type: mark_type.into(),
            range: Some(Span::new(start, end)),
            attrs: None,
        })
    }

    /// `removeMark` shorthand over `[start, end)`.
    #[must_use]
    pub fn remove_mark(
        node_id: impl Into<NodeId>,
        mark_type: impl Into<String>,
        start: usize,
        end: usize,
    ) -> Self {
        Self::RemoveMark(MarkPayload {
            node_id: node_id.into(),
            mark_type: mark_type.into(),
            range: Some(Span::new(start, end)),
            attrs: None,
        })
    }

    /// `toggleMark` shorthand over `[start, end)`.
    #[must_use]
    pub fn toggle_mark(
        node_id: impl Into<NodeId>,
        mark_type: impl Into<String>,
        start: usize,
        end: usize,
    ) -> Self {
        Self::ToggleMark(MarkPayload {
            node_id: node_id.into(),
            mark_type: mark_type.into(),
            range: Some(Span::new(start, end)),
            attrs: None,
        })
    }

    /// `createNode` shorthand.
    #[must_use]
    pub fn create_node(node: NodeInit, parent_id: Option<NodeId>, position: Option<usize>) -> Self {
        Self::CreateNode(CreateNodePayload {
            node,
            parent_id,
            position,
        })
    }

    /// `deleteNode` shorthand.
    #[must_use]
    pub fn delete_node(node_id: impl Into<NodeId>) -> Self {
        Self::DeleteNode(DeleteNodePayload {
            node_id: node_id.into(),
        })
    }

    /// `moveNode` shorthand.
    #[must_use]
    pub fn move_node(
        node_id: impl Into<NodeId>,
        new_parent_id: impl Into<NodeId>,
        position: Option<usize>,
    ) -> Self {
        Self::MoveNode(MoveNodePayload {
            node_id: node_id.into(),
            new_parent_id: new_parent_id.into(),
            position,
        })
    }

    /// `splitTextNode` shorthand.
    #[must_use]
    pub fn split_text(node_id: impl Into<NodeId>, offset: usize) -> Self {
        Self::SplitTextNode(SplitTextPayload {
            node_id: node_id.into(),
            offset,
            new_node_id: None,
            node_type: None,
            attrs: None,
        })
    }

    /// `mergeTextNodes` shorthand.
    #[must_use]
    pub fn merge_text(left_id: impl Into<NodeId>, right_id: impl Into<NodeId>) -> Self {
        Self::MergeTextNodes(MergeNodesPayload {
            left_id: left_id.into(),
            right_id: right_id.into(),
        })
    }

    /// `setSelection` shorthand.
    #[must_use]
    pub fn set_selection(selection: Option<Selection>) -> Self {
        Self::SetSelection(SetSelectionPayload { selection })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape_is_type_and_payload() {
        let op = Operation::delete_text("t1", 5, 6);
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(
            value,
            json!({"type": "deleteTextRange", "payload": {"nodeId": "t1", "start": 5, "end": 6}})
        );
        let back: Operation = serde_json::from_value(value).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn name_matches_wire_tag() {
        let ops = vec![
            Operation::insert_text("t1", 0, "x"),
            Operation::split_text("t1", 1),
            Operation::set_selection(None),
            Operation::merge_text("a", "b"),
        ];
        for op in ops {
            let value = serde_json::to_value(&op).unwrap();
            assert_eq!(value["type"], op.name());
        }
    }

    #[test]
    fn retarget_replaces_node_id() {
        let op = Operation::apply_mark("t1", "bold", 0, 2);
        let moved = op.retarget(&NodeId::from("t2")).unwrap();
        assert_eq!(moved.target_node(), Some(&NodeId::from("t2")));
        assert!(Operation::set_selection(None).retarget(&NodeId::from("x")).is_none());
    }

    #[test]
    fn assign_ids_fills_split_target() {
        let mut op = Operation::split_text("t1", 2);
        op.assign_ids(None);
        match op {
            Operation::SplitTextNode(p) => assert!(p.new_node_id.is_some()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn combinator_payload_nests_operations() {
        let value = json!({
            "type": "when",
            "payload": {
                "condition": {"kind": "nodeExists", "nodeId": "t1"},
                "then": [{"type": "insertText", "payload": {"nodeId": "t1", "pos": 0, "text": "!"}}]
            }
        });
        let op: Operation = serde_json::from_value(value).unwrap();
        assert!(op.is_combinator());
        match op {
            Operation::When(p) => {
                assert_eq!(p.then.len(), 1);
                assert!(p.otherwise.is_empty());
            }
            _ => unreachable!(),
        }
    }
}
