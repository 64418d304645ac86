//! Text operations: `insertText`, `deleteTextRange`, `replaceText`.

use super::decorators::shift_decorators;
use super::{store_marks, Applied};
use crate::error::{StoreError, StoreResult};
use crate::marks::normalize_marks;
use crate::ranges::{adjust_marks, TextEdit};
use crate::selection;
use crate::transaction::TransactionContext;
use docstore_model::text::{char_len, splice_chars};
use docstore_model::{
    DeleteTextPayload, InsertTextPayload, NodeId, Operation, ReplaceTextPayload, SetMarksPayload,
};
use serde_json::json;

pub(super) fn insert_text(
    p: &InsertTextPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    edit_text(ctx, &p.node_id, p.pos, p.pos, &p.text)
}

pub(super) fn delete_text(
    p: &DeleteTextPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    edit_text(ctx, &p.node_id, p.start, p.end, "")
}

pub(super) fn replace_text(
    p: &ReplaceTextPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    edit_text(ctx, &p.node_id, p.start, p.end, &p.text)
}

/// Replaces `[start, end)` of a text leaf by `insert`, moving marks,
/// decorators and the selection with the edit.
fn edit_text(
    ctx: &mut TransactionContext<'_>,
    node_id: &NodeId,
    start: usize,
    end: usize,
    insert: &str,
) -> StoreResult<Applied> {
    let mut node = ctx.text_node(node_id)?;
    let len = node.text_len();
    if start > len {
        return Err(StoreError::out_of_range(node_id, start, len));
    }
    if end > len {
        return Err(StoreError::out_of_range(node_id, end, len));
    }
    if start > end {
        return Err(StoreError::invalid_operation(format!(
            "range start {start} is after end {end}"
        )));
    }

    let edit = TextEdit::replace(start, end, char_len(insert));
    if edit.is_noop() {
        return Ok(Applied::unchanged(json!({ "nodeId": node_id, "length": len })));
    }

    let (text, removed) = splice_chars(node.text.as_deref().unwrap_or_default(), start, end, insert);
    let new_len = char_len(&text);
    let old_marks = node.marks().to_vec();
    let marks = normalize_marks(adjust_marks(&old_marks, &edit), new_len);
    let marks_changed = marks != old_marks;

    node.text = Some(text);
    store_marks(&mut node, marks);
    ctx.put_node(node);
    let restore_decorators = shift_decorators(ctx, node_id, &edit);
    selection::apply_text_edit(ctx.selection_mut(), node_id, &edit);

    let inserted_end = start + edit.inserted;
    let undo_text = if edit.inserted == 0 {
        Operation::insert_text(node_id.clone(), start, removed.clone())
    } else if edit.deleted == 0 {
        Operation::delete_text(node_id.clone(), start, inserted_end)
    } else {
        Operation::replace_text(node_id.clone(), start, inserted_end, removed.clone())
    };
    let mut inverse = vec![undo_text];
    if marks_changed {
        inverse.push(Operation::SetMarks(SetMarksPayload {
            node_id: node_id.clone(),
            marks: old_marks,
        }));
    }
    inverse.extend(restore_decorators);

    Ok(Applied::new(
        json!({ "nodeId": node_id, "removed": removed, "length": new_len }),
        inverse,
    ))
}
