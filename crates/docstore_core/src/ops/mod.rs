//! Operation library.
//!
//! Every leaf operation is a function `(payload, context) -> Applied` that
//! mutates the transaction overlay and describes how to undo itself. The
//! closed [`Operation`] enum is dispatched here; combinators are expanded
//! by [`expand`] instead of being applied.
//!
//! Inverse lists run in order. When an operation moved the selection, the
//! dispatcher ends its inverse with a `setSelection` back to the previous
//! value.

mod combinators;
mod content;
mod decorators;
mod marks;
mod nodes;
mod split;
mod text;

use crate::error::{StoreError, StoreResult};
use crate::transaction::TransactionContext;
use docstore_model::{Attrs, Mark, Node, NodeId, Operation, SetSelectionPayload};
use serde_json::{json, Value};

pub(crate) use combinators::expand;

/// Result of applying one leaf operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Operation-specific result data.
    pub data: Value,
    /// Operations that undo this one, in execution order.
    pub inverse: Vec<Operation>,
}

impl Applied {
    pub(crate) fn new(data: Value, inverse: Vec<Operation>) -> Self {
        Self { data, inverse }
    }

    /// An operation that changed nothing.
    pub(crate) fn unchanged(data: Value) -> Self {
        Self::new(data, Vec::new())
    }
}

/// Applies a leaf operation to the context.
pub(crate) fn apply(op: &Operation, ctx: &mut TransactionContext<'_>) -> StoreResult<Applied> {
    let selection_before = ctx.selection().cloned();
    let mut applied = match op {
        Operation::CreateNode(p) => nodes::create_node(p, ctx)?,
        Operation::DeleteNode(p) => nodes::delete_node(p, ctx)?,
        Operation::UpdateNode(p) => nodes::update_node(p, ctx)?,
        Operation::AddChild(p) => content::add_child(p, ctx)?,
        Operation::RemoveChild(p) => content::remove_child(p, ctx)?,
        Operation::MoveNode(p) => content::move_node(p, ctx)?,
        Operation::ReorderChildren(p) => content::reorder_children(p, ctx)?,
        Operation::InsertText(p) => text::insert_text(p, ctx)?,
        Operation::DeleteTextRange(p) => text::delete_text(p, ctx)?,
        Operation::ReplaceText(p) => text::replace_text(p, ctx)?,
        Operation::ApplyMark(p) => marks::apply_mark(p, ctx)?,
        Operation::RemoveMark(p) => marks::remove_mark(p, ctx)?,
        Operation::ToggleMark(p) => marks::toggle_mark(p, ctx)?,
        Operation::UpdateMark(p) => marks::update_mark(p, ctx)?,
        Operation::SetMarks(p) => marks::set_marks(p, ctx)?,
        Operation::SplitTextNode(p) => split::split_text_node(p, ctx)?,
        Operation::MergeTextNodes(p) => split::merge_text_nodes(p, ctx)?,
        Operation::SplitBlockNode(p) => split::split_block_node(p, ctx)?,
        Operation::MergeBlockNodes(p) => split::merge_block_nodes(p, ctx)?,
        Operation::AddDecorator(p) => decorators::add_decorator(p, ctx)?,
        Operation::RemoveDecorator(p) => decorators::remove_decorator(p, ctx)?,
        Operation::UpdateDecorator(p) => decorators::update_decorator(p, ctx)?,
        Operation::PutDecorator(p) => decorators::put_decorator(p, ctx)?,
        Operation::SetSelection(p) => return set_selection(p, ctx),
        Operation::ForEachNode(_)
        | Operation::When(_)
        | Operation::DeleteSpan(_)
        | Operation::ApplyMarkSpan(_) => {
            return Err(StoreError::invalid_operation(format!(
                "{} must be expanded before it is applied",
                op.name()
            )))
        }
    };
    if ctx.selection() != selection_before.as_ref() {
        applied.inverse.push(Operation::set_selection(selection_before));
    }
    Ok(applied)
}

fn set_selection(
    p: &SetSelectionPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    if let Some(selection) = &p.selection {
        for node_id in selection.node_ids() {
            ctx.node(node_id)?;
        }
        if let docstore_model::Selection::Range(range) = selection {
            for (node_id, offset) in [
                (&range.start_node_id, range.start_offset),
                (&range.end_node_id, range.end_offset),
            ] {
                let node = ctx.node(node_id)?;
                if node.is_text() && offset > node.text_len() {
                    return Err(StoreError::out_of_range(node_id, offset, node.text_len()));
                }
            }
        }
    }
    let mut selection = p.selection.clone();
    if let Some(docstore_model::Selection::Range(range)) = selection.as_mut() {
        range.refresh_collapsed();
    }
    let previous = ctx.replace_selection(selection);
    let inverse = if ctx.selection() == previous.as_ref() {
        Vec::new()
    } else {
        vec![Operation::set_selection(previous)]
    };
    Ok(Applied::new(json!({ "selection": p.selection }), inverse))
}

/// Treats an empty attribute map as no attributes.
pub(crate) fn normalize_attrs(attrs: Option<Attrs>) -> Option<Attrs> {
    attrs.filter(|a| !a.is_empty())
}

/// Shallow-merges `patch` into `base`; `null` values delete keys.
pub(crate) fn merge_attrs(base: Option<&Attrs>, patch: &Attrs) -> Option<Attrs> {
    let mut merged = base.cloned().unwrap_or_default();
    for (key, value) in patch {
        if value.is_null() {
            merged.remove(key);
        } else {
            merged.insert(key.clone(), value.clone());
        }
    }
    normalize_attrs(Some(merged))
}

/// The patch that undoes `patch` applied to `base`.
pub(crate) fn reverse_patch(base: Option<&Attrs>, patch: &Attrs) -> Attrs {
    patch
        .keys()
        .map(|key| {
            let old = base.and_then(|b| b.get(key)).cloned().unwrap_or(Value::Null);
            (key.clone(), old)
        })
        .collect()
}

/// Stores normalized marks, using `None` for an empty list.
pub(crate) fn store_marks(node: &mut Node, marks: Vec<Mark>) {
    node.marks = (!marks.is_empty()).then_some(marks);
}

/// Inserts `child` at `position` (or at the end) in `parent`'s child list.
pub(crate) fn insert_child(
    parent: &mut Node,
    position: Option<usize>,
    child: NodeId,
) -> StoreResult<usize> {
    let children = parent.content.get_or_insert_with(Vec::new);
    let len = children.len();
    let index = position.unwrap_or(len);
    if index > len {
        return Err(StoreError::out_of_range(&parent.id, index, len));
    }
    children.insert(index, child);
    Ok(index)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::config::StoreConfig;
    use crate::traverse::NodeReader;
    use docstore_model::Selection;

    #[test]
    fn merge_attrs_deletes_nulls() {
        let mut base = Attrs::new();
        base.insert("level".into(), json!(1));
        base.insert("align".into(), json!("left"));
        let mut patch = Attrs::new();
        patch.insert("level".into(), json!(2));
        patch.insert("align".into(), Value::Null);
        patch.insert("id".into(), json!("x"));

        let merged = merge_attrs(Some(&base), &patch).unwrap();
        assert_eq!(merged.get("level"), Some(&json!(2)));
        assert!(!merged.contains_key("align"));

        let reverse = reverse_patch(Some(&base), &patch);
        assert_eq!(reverse.get("id"), Some(&Value::Null));
        assert_eq!(merge_attrs(Some(&merged), &reverse), Some(base));
    }

    #[test]
    fn combinators_are_not_applied_directly() {
        let graph = sample_graph();
        let config = StoreConfig::default();
        let mut ctx = context(&graph, &config, None);
        let op = Operation::When(docstore_model::WhenPayload {
            condition: docstore_model::Condition::SelectionCollapsed,
            then: Vec::new(),
            otherwise: Vec::new(),
        });
        assert!(matches!(apply(&op, &mut ctx), Err(StoreError::InvalidOperation { .. })));
    }

    #[test]
    fn set_selection_validates_targets() {
        let graph = sample_graph();
        let config = StoreConfig::default();
        let mut ctx = context(&graph, &config, None);

        let missing = Operation::set_selection(Some(Selection::caret("nope", 0)));
        assert!(matches!(apply(&missing, &mut ctx), Err(StoreError::NotFound { .. })));

        let past_end = Operation::set_selection(Some(Selection::caret("t1", 40)));
        assert!(matches!(apply(&past_end, &mut ctx), Err(StoreError::OutOfRange { .. })));

        let ok = Operation::set_selection(Some(Selection::caret("t1", 3)));
        let applied = apply(&ok, &mut ctx).unwrap();
        assert_eq!(applied.inverse, vec![Operation::set_selection(None)]);
        assert_eq!(ctx.selection(), Some(&Selection::caret("t1", 3)));
    }

    #[test]
    fn text_edit_appends_selection_restore() {
        let graph = sample_graph();
        let config = StoreConfig::default();
        let mut ctx = context(&graph, &config, Some(Selection::caret("t1", 11)));

        let applied = apply(&Operation::delete_text("t1", 0, 6), &mut ctx).unwrap();
        assert_eq!(ctx.selection(), Some(&Selection::caret("t1", 5)));
        assert_eq!(
            applied.inverse.last(),
            Some(&Operation::set_selection(Some(Selection::caret("t1", 11))))
        );
        assert_eq!(ctx.get_node(&"t1".into()).unwrap().text.as_deref(), Some("World"));
    }
}
