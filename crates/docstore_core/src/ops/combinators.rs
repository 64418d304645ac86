//! Combinators: operations that produce other operations.
//!
//! A combinator is resolved against the transaction's current view at the
//! moment it is reached. Produced operations come out in document
//! (pre-order) order and are not rebased against each other: if an earlier
//! produced operation removes the target of a later one, the later one
//! fails and the transaction aborts.

use crate::error::{StoreError, StoreResult};
use crate::transaction::TransactionContext;
use crate::traverse::{subtree, text_leaves_between, NodeReader};
use docstore_model::{
    ApplyMarkSpanPayload, Condition, DeleteSpanPayload, ForEachNodePayload, MarkPayload, Node,
    NodeId, Operation, Span,
};

/// Resolves a combinator into the operations it stands for.
pub(crate) fn expand(op: &Operation, ctx: &TransactionContext<'_>) -> StoreResult<Vec<Operation>> {
    match op {
        Operation::ForEachNode(p) => for_each_node(p, ctx),
        Operation::When(p) => {
            let branch = if evaluate(&p.condition, ctx) {
                &p.then
            } else {
                &p.otherwise
            };
            Ok(branch.clone())
        }
        Operation::DeleteSpan(p) => delete_span(p, ctx),
        Operation::ApplyMarkSpan(p) => apply_mark_span(p, ctx),
        other => Err(StoreError::invalid_operation(format!(
            "{} is not a combinator",
            other.name()
        ))),
    }
}

fn for_each_node(p: &ForEachNodePayload, ctx: &TransactionContext<'_>) -> StoreResult<Vec<Operation>> {
    let within = p.selector.within.as_ref().unwrap_or(ctx.root_id());
    if !ctx.has_node(within) {
        return Err(StoreError::node_not_found(within));
    }
    subtree(ctx, within)
        .into_iter()
        .filter(|node| !p.selector.text_only || node.is_text())
        .filter(|node| {
            p.selector
                .node_type
                .as_ref()
                .map_or(true, |t| &node.node_type == t)
        })
        .map(|node| {
            p.operation.retarget(&node.id).ok_or_else(|| {
                StoreError::invalid_operation(format!(
                    "{} has no node target to iterate with",
                    p.operation.name()
                ))
            })
        })
        .collect()
}

/// Evaluates a `when` condition against the in-transaction state.
pub(crate) fn evaluate(condition: &Condition, ctx: &TransactionContext<'_>) -> bool {
    match condition {
        Condition::NodeExists { node_id } => ctx.has_node(node_id),
        Condition::NodeType { node_id, node_type } => ctx
            .get_node(node_id)
            .is_some_and(|node| &node.node_type == node_type),
        Condition::HasMark { node_id, mark_type } => ctx
            .get_node(node_id)
            .is_some_and(|node| node.marks().iter().any(|m| &m.mark_type == mark_type)),
        Condition::SelectionCollapsed => ctx.selection().is_some_and(|s| s.is_collapsed()),
        Condition::Not { condition } => !evaluate(condition, ctx),
    }
}

/// Splits a cross-leaf span into one non-empty `[start, end)` per leaf.
fn leaf_spans(
    ctx: &TransactionContext<'_>,
    start_node: &NodeId,
    start_offset: usize,
    end_node: &NodeId,
    end_offset: usize,
) -> StoreResult<Vec<(NodeId, Span)>> {
    let leaves: Vec<Node> = text_leaves_between(ctx, start_node, end_node)?;
    let (Some(first), Some(last)) = (leaves.first(), leaves.last()) else {
        return Ok(Vec::new());
    };
    if start_offset > first.text_len() {
        return Err(StoreError::out_of_range(start_node, start_offset, first.text_len()));
    }
    if end_offset > last.text_len() {
        return Err(StoreError::out_of_range(end_node, end_offset, last.text_len()));
    }
    if leaves.len() == 1 && start_offset > end_offset {
        return Err(StoreError::invalid_operation(format!(
            "span start {start_offset} is after end {end_offset}"
        )));
    }

    let last_index = leaves.len() - 1;
    Ok(leaves
        .iter()
        .enumerate()
        .map(|(i, leaf)| {
            let start = if i == 0 { start_offset } else { 0 };
            let end = if i == last_index { end_offset } else { leaf.text_len() };
            (leaf.id.clone(), Span::new(start, end))
        })
        .filter(|(_, span)| !span.is_empty())
        .collect())
}

fn delete_span(p: &DeleteSpanPayload, ctx: &TransactionContext<'_>) -> StoreResult<Vec<Operation>> {
    let spans = leaf_spans(ctx, &p.start_node_id, p.start_offset, &p.end_node_id, p.end_offset)?;
    Ok(spans
        .into_iter()
        .map(|(node_id, span)| Operation::delete_text(node_id, span.start, span.end))
        .collect())
}

fn apply_mark_span(
    p: &ApplyMarkSpanPayload,
    ctx: &TransactionContext<'_>,
) -> StoreResult<Vec<Operation>> {
    let spans = leaf_spans(ctx, &p.start_node_id, p.start_offset, &p.end_node_id, p.end_offset)?;
    Ok(spans
        .into_iter()
        .map(|(node_id, span)| {
            Operation::ApplyMark(MarkPayload {
                node_id,
                mark_type: p.mark_type.clone(),
                range: Some(span),
                attrs: p.attrs.clone(),
            })
        })
        .collect())
}
