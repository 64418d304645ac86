//! Split and merge of text leaves and containers.
//!
//! A split always places the new right part directly after the left part
//! in the same parent. A merge requires the right part to directly follow
//! the left part and deletes it afterwards.

use super::content::ensure_container;
use super::decorators::{restore, retarget_decorators};
use super::{normalize_attrs, store_marks, Applied};
use crate::error::{StoreError, StoreResult};
use crate::marks::{normalize_marks, partition_marks, shift_marks};
use crate::selection;
use crate::transaction::TransactionContext;
use crate::traverse::NodeReader;
use docstore_model::text::split_chars;
use docstore_model::{
    Attrs, MergeNodesPayload, Node, NodeId, Operation, SplitBlockPayload, SplitTextPayload,
};
use serde_json::json;

/// The parent of `node` and its index there.
fn placement(ctx: &TransactionContext<'_>, node: &Node) -> StoreResult<(Node, usize)> {
    let parent_id = node
        .parent
        .as_ref()
        .ok_or_else(|| StoreError::structural(format!("{} is detached", node.id)))?;
    let parent = ctx.node(parent_id)?;
    let index = parent.child_index(&node.id).ok_or_else(|| {
        StoreError::structural(format!("{} is not a child of {parent_id}", node.id))
    })?;
    Ok((parent, index))
}

/// Resolves the identifier of a split's right part.
fn right_id(ctx: &TransactionContext<'_>, requested: Option<&NodeId>) -> StoreResult<NodeId> {
    let id = requested
        .cloned()
        .unwrap_or_else(|| NodeId::generate(ctx.config().prefix()));
    if ctx.has_node(&id) {
        return Err(StoreError::structural(format!("node {id} already exists")));
    }
    Ok(id)
}

/// Checks that `right` directly follows `left` under the same parent.
fn adjacent(
    ctx: &TransactionContext<'_>,
    left: &Node,
    right: &Node,
) -> StoreResult<(Node, usize)> {
    let (parent, index) = placement(ctx, left)?;
    if parent.children().get(index + 1) != Some(&right.id) {
        return Err(StoreError::structural(format!(
            "{} does not directly follow {}",
            right.id, left.id
        )));
    }
    Ok((parent, index))
}

/// Attributes for the inverse split of a merge. An empty map stands for
/// "no attributes", which a missing value would not.
fn split_attrs(node: &Node) -> Option<Attrs> {
    Some(node.attrs.clone().unwrap_or_default())
}

pub(super) fn split_text_node(
    p: &SplitTextPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let mut left = ctx.text_node(&p.node_id)?;
    let len = left.text_len();
    if p.offset > len {
        return Err(StoreError::out_of_range(&p.node_id, p.offset, len));
    }
    let (mut parent, index) = placement(ctx, &left)?;
    let new_id = right_id(ctx, p.new_node_id.as_ref())?;

    let (left_text, right_text) = split_chars(left.text.as_deref().unwrap_or_default(), p.offset);
    let (left_marks, right_marks) = partition_marks(left.marks(), p.offset);
    let mut right = Node {
        id: new_id.clone(),
        node_type: p.node_type.clone().unwrap_or_else(|| left.node_type.clone()),
        attrs: match &p.attrs {
            Some(attrs) => normalize_attrs(Some(attrs.clone())),
            None => left.attrs.clone(),
        },
        text: Some(right_text),
        content: None,
        marks: None,
        parent: left.parent.clone(),
    };
    let right_len = right.text_len();
    store_marks(&mut right, normalize_marks(right_marks, right_len));
    left.text = Some(left_text);
    store_marks(&mut left, normalize_marks(left_marks, p.offset));
    ctx.check_attributes(&right)?;

    if let Some(children) = parent.content.as_mut() {
        children.insert(index + 1, new_id.clone());
    }
    ctx.put_node(left);
    ctx.put_node(right);
    ctx.check_content(&parent)?;
    ctx.put_node(parent);

    let mut restores = Vec::new();
    for decorator in ctx.decorators_for(&p.node_id) {
        let Some(span) = decorator.target.as_ref().and_then(|t| t.span()) else {
            continue;
        };
        if span.end <= p.offset {
            continue;
        }
        let mut moved = decorator.clone();
        if let Some(target) = moved.target.as_mut() {
            if span.start >= p.offset {
                target.node_id = new_id.clone();
                target.start_offset = Some(span.start - p.offset);
                target.end_offset = Some(span.end - p.offset);
            } else {
                target.end_offset = Some(p.offset);
            }
        }
        ctx.put_decorator(moved);
        restores.push(restore(decorator));
    }

    let offset = p.offset;
    selection::remap_points(ctx.selection_mut(), |node, point| {
        (node == &p.node_id && point >= offset).then(|| (new_id.clone(), point - offset))
    });

    let mut inverse = vec![Operation::MergeTextNodes(MergeNodesPayload {
        left_id: p.node_id.clone(),
        right_id: new_id.clone(),
    })];
    inverse.extend(restores);
    Ok(Applied::new(
        json!({ "leftId": p.node_id, "rightId": new_id }),
        inverse,
    ))
}

pub(super) fn merge_text_nodes(
    p: &MergeNodesPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let mut left = ctx.text_node(&p.left_id)?;
    let right = ctx.text_node(&p.right_id)?;
    let (mut parent, index) = adjacent(ctx, &left, &right)?;

    let left_len = left.text_len();
    let mut text = left.text.clone().unwrap_or_default();
    text.push_str(right.text.as_deref().unwrap_or_default());
    let marks = left
        .marks()
        .iter()
        .cloned()
        .chain(shift_marks(right.marks(), left_len))
        .collect::<Vec<_>>();
    left.text = Some(text);
    let total = left.text_len();
    store_marks(&mut left, normalize_marks(marks, total));

    if let Some(children) = parent.content.as_mut() {
        children.remove(index + 1);
    }
    ctx.put_node(left);
    ctx.put_node(parent);
    ctx.remove_node(&p.right_id)?;

    let restores = retarget_decorators(ctx, &p.right_id, &p.left_id, |offset| offset + left_len);
    selection::remap_points(ctx.selection_mut(), |node, point| {
        (node == &p.right_id).then(|| (p.left_id.clone(), point + left_len))
    });
    selection::replace_node(ctx.selection_mut(), &p.right_id, &p.left_id);

    let mut inverse = vec![Operation::SplitTextNode(SplitTextPayload {
        node_id: p.left_id.clone(),
        offset: left_len,
        new_node_id: Some(p.right_id.clone()),
        node_type: Some(right.node_type.clone()),
        attrs: split_attrs(&right),
    })];
    inverse.extend(restores);
    Ok(Applied::new(
        json!({ "nodeId": p.left_id, "length": total }),
        inverse,
    ))
}

pub(super) fn split_block_node(
    p: &SplitBlockPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let mut left = ctx.node(&p.node_id)?;
    ensure_container(ctx, &left)?;
    let count = left.children().len();
    if p.index > count {
        return Err(StoreError::out_of_range(&p.node_id, p.index, count));
    }
    let (mut parent, index) = placement(ctx, &left)?;
    let new_id = right_id(ctx, p.new_node_id.as_ref())?;

    let moved = left
        .content
        .as_mut()
        .map(|children| children.split_off(p.index))
        .unwrap_or_default();
    let right = Node {
        id: new_id.clone(),
        node_type: p.node_type.clone().unwrap_or_else(|| left.node_type.clone()),
        attrs: match &p.attrs {
            Some(attrs) => normalize_attrs(Some(attrs.clone())),
            None => left.attrs.clone(),
        },
        text: None,
        content: Some(moved.clone()),
        marks: None,
        parent: left.parent.clone(),
    };
    ctx.check_attributes(&right)?;

    for child_id in &moved {
        let mut child = ctx.node(child_id)?;
        child.parent = Some(new_id.clone());
        ctx.put_node(child);
    }
    if let Some(children) = parent.content.as_mut() {
        children.insert(index + 1, new_id.clone());
    }
    ctx.check_content(&left)?;
    ctx.check_content(&right)?;
    ctx.put_node(left);
    ctx.put_node(right);
    ctx.check_content(&parent)?;
    ctx.put_node(parent);

    let split_at = p.index;
    selection::remap_points(ctx.selection_mut(), |node, point| {
        (node == &p.node_id && point > split_at).then(|| (new_id.clone(), point - split_at))
    });

    Ok(Applied::new(
        json!({ "leftId": p.node_id, "rightId": new_id }),
        vec![Operation::MergeBlockNodes(MergeNodesPayload {
            left_id: p.node_id.clone(),
            right_id: new_id.clone(),
        })],
    ))
}

pub(super) fn merge_block_nodes(
    p: &MergeNodesPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let mut left = ctx.node(&p.left_id)?;
    let right = ctx.node(&p.right_id)?;
    ensure_container(ctx, &left)?;
    if !right.is_container() {
        return Err(StoreError::structural(format!(
            "{} cannot hold children",
            p.right_id
        )));
    }
    let (mut parent, index) = adjacent(ctx, &left, &right)?;

    let left_count = left.children().len();
    for child_id in right.children() {
        let mut child = ctx.node(child_id)?;
        child.parent = Some(p.left_id.clone());
        ctx.put_node(child);
    }
    left.content
        .get_or_insert_with(Vec::new)
        .extend(right.children().iter().cloned());
    if let Some(children) = parent.content.as_mut() {
        children.remove(index + 1);
    }
    ctx.check_content(&left)?;
    ctx.put_node(left);
    ctx.put_node(parent);
    ctx.remove_node(&p.right_id)?;

    let restores = retarget_decorators(ctx, &p.right_id, &p.left_id, |offset| offset);
    selection::remap_points(ctx.selection_mut(), |node, point| {
        (node == &p.right_id).then(|| (p.left_id.clone(), point + left_count))
    });
    selection::replace_node(ctx.selection_mut(), &p.right_id, &p.left_id);

    let mut inverse = vec![Operation::SplitBlockNode(SplitBlockPayload {
        node_id: p.left_id.clone(),
        index: left_count,
        new_node_id: Some(p.right_id.clone()),
        node_type: Some(right.node_type.clone()),
        attrs: split_attrs(&right),
    })];
    inverse.extend(restores);
    Ok(Applied::new(json!({ "nodeId": p.left_id }), inverse))
}
