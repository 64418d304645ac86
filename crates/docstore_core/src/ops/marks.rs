//! Mark operations.
//!
//! Every mark operation rewrites the complete mark list of one text leaf,
//! normalizes it, and records the previous list as a `setMarks` inverse.

use super::{merge_attrs, normalize_attrs, store_marks, Applied};
use crate::error::{StoreError, StoreResult};
use crate::marks::{covers, normalize_marks, remove_coverage};
use crate::transaction::TransactionContext;
use docstore_model::{Mark, MarkPayload, Node, NodeId, Operation, SetMarksPayload, Span};
use serde_json::json;

/// Resolves an optional payload range against a node, defaulting to the
/// whole text.
fn resolve_range(node: &Node, range: Option<Span>) -> StoreResult<Span> {
    let len = node.text_len();
    let span = range.unwrap_or(Span::new(0, len));
    if span.start > span.end {
        return Err(StoreError::invalid_operation(format!(
            "range start {} is after end {}",
            span.start, span.end
        )));
    }
    if span.end > len {
        return Err(StoreError::out_of_range(&node.id, span.end, len));
    }
    Ok(span)
}

/// Replaces the marks of `node_id` by `rewrite(old)` after normalization.
fn rewrite_marks<F>(
    ctx: &mut TransactionContext<'_>,
    node_id: &NodeId,
    data: serde_json::Value,
    rewrite: F,
) -> StoreResult<Applied>
where
    F: FnOnce(&Node) -> StoreResult<Vec<Mark>>,
{
    let mut node = ctx.text_node(node_id)?;
    let old = node.marks().to_vec();
    let marks = normalize_marks(rewrite(&node)?, node.text_len());
    if marks == old {
        return Ok(Applied::unchanged(data));
    }
    store_marks(&mut node, marks);
    ctx.put_node(node);
    Ok(Applied::new(
        data,
        vec![Operation::SetMarks(SetMarksPayload {
            node_id: node_id.clone(),
            marks: old,
        })],
    ))
}

fn add_mark(node: &Node, p: &MarkPayload, span: Span) -> Vec<Mark> {
    let mut marks = remove_coverage(node.marks(), span, |m| m.mark_type == p.mark_type);
    if !span.is_empty() {
        marks.push(Mark {
            mark_type: p.mark_type.clone(),
            range: span,
            attrs: normalize_attrs(p.attrs.clone()),
        });
    }
    marks
}

pub(super) fn apply_mark(
    p: &MarkPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    rewrite_marks(ctx, &p.node_id, json!({ "nodeId": p.node_id }), |node| {
        let span = resolve_range(node, p.range)?;
        Ok(add_mark(node, p, span))
    })
}

pub(super) fn remove_mark(
    p: &MarkPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    rewrite_marks(ctx, &p.node_id, json!({ "nodeId": p.node_id }), |node| {
        let span = resolve_range(node, p.range)?;
        Ok(remove_coverage(node.marks(), span, |m| m.mark_type == p.mark_type))
    })
}

pub(super) fn toggle_mark(
    p: &MarkPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let node = ctx.text_node(&p.node_id)?;
    let span = resolve_range(&node, p.range)?;
    let active = !covers(node.marks(), &p.mark_type, span);
    let data = json!({ "nodeId": p.node_id, "active": active });
    rewrite_marks(ctx, &p.node_id, data, |node| {
        if active {
            Ok(add_mark(node, p, span))
        } else {
            Ok(remove_coverage(node.marks(), span, |m| m.mark_type == p.mark_type))
        }
    })
}

/// Merges the payload attributes into every mark of the type that
/// intersects the range.
pub(super) fn update_mark(
    p: &MarkPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let Some(patch) = p.attrs.as_ref() else {
        return Err(StoreError::invalid_operation("updateMark requires attrs"));
    };
    rewrite_marks(ctx, &p.node_id, json!({ "nodeId": p.node_id }), |node| {
        let span = resolve_range(node, p.range)?;
        Ok(node
            .marks()
            .iter()
            .map(|mark| {
                if mark.mark_type == p.mark_type && mark.range.intersect(&span).is_some() {
                    Mark {
                        attrs: merge_attrs(mark.attrs.as_ref(), patch),
                        ..mark.clone()
                    }
                } else {
                    mark.clone()
                }
            })
            .collect())
    })
}

pub(super) fn set_marks(
    p: &SetMarksPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    rewrite_marks(ctx, &p.node_id, json!({ "nodeId": p.node_id }), |node| {
        let len = node.text_len();
        for mark in &p.marks {
            if mark.range.end > len {
                return Err(StoreError::out_of_range(&node.id, mark.range.end, len));
            }
            if mark.range.is_empty() {
                return Err(StoreError::invalid_operation(format!(
                    "{} mark has an empty range",
                    mark.mark_type
                )));
            }
        }
        Ok(p.marks
            .iter()
            .cloned()
            .map(|mark| Mark {
                attrs: normalize_attrs(mark.attrs.clone()),
                ..mark
            })
            .collect())
    })
}
