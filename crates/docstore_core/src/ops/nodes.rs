//! Core operations: `createNode`, `deleteNode`, `updateNode`.

use super::content::ensure_container;
use super::decorators::clamp_decorators;
use super::{insert_child, merge_attrs, normalize_attrs, reverse_patch, store_marks, Applied};
use crate::error::{StoreError, StoreResult};
use crate::marks::normalize_marks;
use crate::schema::ContentModel;
use crate::selection;
use crate::transaction::TransactionContext;
use crate::traverse::{descendants_bottom_up, is_ancestor, NodeReader};
use docstore_model::{
    AddDecoratorPayload, ChildInit, CreateNodePayload, DeleteNodePayload, Node, NodeId, NodeInit,
    Operation, RemoveChildPayload, UpdateNodePayload,
};
use serde_json::json;
use std::collections::HashSet;

/// Checks made before anything is written for a `createNode`.
#[derive(Default)]
struct CreationPlan {
    ids: HashSet<NodeId>,
    /// `(new parent, existing child)` for every child given by reference.
    adopted: Vec<(NodeId, NodeId)>,
}

impl CreationPlan {
    fn check(
        &mut self,
        init: &NodeInit,
        parent_id: Option<&NodeId>,
        ctx: &TransactionContext<'_>,
    ) -> StoreResult<()> {
        let id = init
            .id
            .as_ref()
            .ok_or_else(|| StoreError::invalid_operation("node identifier was not assigned"))?;
        if ctx.has_node(id) || !self.ids.insert(id.clone()) {
            return Err(StoreError::structural(format!("node {id} already exists")));
        }
        if init.text.is_some() && init.content.is_some() {
            return Err(StoreError::structural(format!(
                "node {id} cannot carry both text and children"
            )));
        }
        if init.marks.is_some() && init.text.is_none() {
            return Err(StoreError::structural(format!(
                "node {id} carries marks but no text"
            )));
        }
        if let Some(model) = ctx.schema().content_model(&init.node_type) {
            let fits = match model {
                ContentModel::Text => init.content.is_none(),
                ContentModel::Children => init.text.is_none(),
                ContentModel::Empty => init.text.is_none() && init.content.is_none(),
            };
            if !fits {
                return Err(StoreError::validation(vec![format!(
                    "{} nodes must have content model {model:?}",
                    init.node_type
                )]));
            }
        }

        for child in init.content.iter().flatten() {
            match child {
                ChildInit::Inline(inner) => self.check(inner, Some(id), ctx)?,
                ChildInit::Ref(child_id) => {
                    let child = ctx.node(child_id)?;
                    if child_id == ctx.root_id() {
                        return Err(StoreError::structural("the root cannot become a child"));
                    }
                    if child.parent.is_some() {
                        return Err(StoreError::structural(format!(
                            "node {child_id} is already attached"
                        )));
                    }
                    if !self.ids.insert(child_id.clone()) {
                        return Err(StoreError::structural(format!(
                            "node {child_id} is referenced twice"
                        )));
                    }
                    if let Some(target) = parent_id {
                        if target == child_id || is_ancestor(ctx, child_id, target) {
                            return Err(StoreError::structural(format!(
                                "adopting {child_id} would create a cycle"
                            )));
                        }
                    }
                    self.adopted.push((id.clone(), child_id.clone()));
                }
            }
        }
        Ok(())
    }
}

/// Writes `init` and its inline children; returns the new identifier.
fn build(
    init: &NodeInit,
    parent: Option<NodeId>,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<NodeId> {
    let id = init
        .id
        .clone()
        .ok_or_else(|| StoreError::invalid_operation("node identifier was not assigned"))?;

    let content = match &init.content {
        Some(children) => {
            let mut ids = Vec::with_capacity(children.len());
            for child in children {
                let child_id = match child {
                    ChildInit::Inline(inner) => build(inner, Some(id.clone()), ctx)?,
                    ChildInit::Ref(child_id) => {
                        let mut adopted = ctx.node(child_id)?;
                        adopted.parent = Some(id.clone());
                        ctx.put_node(adopted);
                        child_id.clone()
                    }
                };
                ids.push(child_id);
            }
            Some(ids)
        }
        None => None,
    };

    let mut node = Node {
        id: id.clone(),
        node_type: init.node_type.clone(),
        attrs: normalize_attrs(init.attrs.clone()),
        text: init.text.clone(),
        content,
        marks: None,
        parent,
    };
    if let Some(marks) = &init.marks {
        let len = node.text_len();
        store_marks(&mut node, normalize_marks(marks.iter().cloned(), len));
    }
    ctx.check_attributes(&node)?;
    ctx.check_content(&node)?;
    ctx.put_node(node);
    Ok(id)
}

pub(super) fn create_node(
    p: &CreateNodePayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let mut init = p.node.clone();
    init.assign_ids(ctx.config().prefix());

    let mut plan = CreationPlan::default();
    plan.check(&init, p.parent_id.as_ref(), ctx)?;

    let parent = match &p.parent_id {
        Some(parent_id) => {
            let parent = ctx.node(parent_id)?;
            ensure_container(ctx, &parent)?;
            let len = parent.children().len();
            if let Some(position) = p.position.filter(|&pos| pos > len) {
                return Err(StoreError::out_of_range(parent_id, position, len));
            }
            Some(parent)
        }
        None => None,
    };

    let id = build(&init, p.parent_id.clone(), ctx)?;
    if let Some(mut parent) = parent {
        insert_child(&mut parent, p.position, id.clone())?;
        ctx.check_content(&parent)?;
        ctx.put_node(parent);
    }

    let mut inverse: Vec<Operation> = plan
        .adopted
        .iter()
        .rev()
        .map(|(parent_id, child_id)| {
            Operation::RemoveChild(RemoveChildPayload {
                parent_id: parent_id.clone(),
                child_id: child_id.clone(),
            })
        })
        .collect();
    inverse.push(Operation::delete_node(id.clone()));
    Ok(Applied::new(json!({ "nodeId": id }), inverse))
}

/// Describes the subtree at `id` as a creation payload with every child
/// inline.
fn describe_subtree(
    ctx: &TransactionContext<'_>,
    id: &NodeId,
    seen: &mut HashSet<NodeId>,
) -> StoreResult<NodeInit> {
    if !seen.insert(id.clone()) {
        return Err(StoreError::structural(format!("cycle through node {id}")));
    }
    let node = ctx.node(id)?;
    let content = match &node.content {
        Some(children) => Some(
            children
                .iter()
                .map(|child| {
                    describe_subtree(ctx, child, seen).map(|init| ChildInit::Inline(Box::new(init)))
                })
                .collect::<StoreResult<Vec<_>>>()?,
        ),
        None => None,
    };
    Ok(NodeInit {
        id: Some(node.id),
        node_type: node.node_type,
        attrs: node.attrs,
        text: node.text,
        content,
        marks: node.marks,
    })
}

pub(super) fn delete_node(
    p: &DeleteNodePayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let node = ctx.node(&p.node_id)?;
    if &p.node_id == ctx.root_id() {
        return Err(StoreError::structural(format!(
            "cannot delete the root node {}",
            p.node_id
        )));
    }

    let description = describe_subtree(ctx, &p.node_id, &mut HashSet::new())?;
    let placement = node
        .parent
        .as_ref()
        .and_then(|parent_id| ctx.get_node(parent_id))
        .and_then(|parent| parent.child_index(&node.id).map(|index| (parent, index)));
    let removed = descendants_bottom_up(ctx, &p.node_id);
    let removed_set: HashSet<NodeId> = removed.iter().cloned().collect();
    let decorators: Vec<_> = ctx
        .decorators()
        .into_iter()
        .filter(|d| d.target_node().is_some_and(|id| removed_set.contains(id)))
        .collect();

    let mut inverse = vec![Operation::create_node(
        description,
        placement.as_ref().map(|(parent, _)| parent.id.clone()),
        placement.as_ref().map(|(_, index)| *index),
    )];

    if let Some((mut parent, index)) = placement {
        if let Some(children) = parent.content.as_mut() {
            children.remove(index);
        }
        ctx.put_node(parent);
    }
    for id in &removed {
        ctx.remove_node(id)?;
    }
    for decorator in decorators {
        ctx.remove_decorator(&decorator.id);
        inverse.push(Operation::AddDecorator(AddDecoratorPayload { decorator }));
    }
    selection::forget_nodes(ctx.selection_mut(), &removed_set);

    Ok(Applied::new(
        json!({ "nodeId": p.node_id, "removed": removed.len() }),
        inverse,
    ))
}

pub(super) fn update_node(
    p: &UpdateNodePayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let old = ctx.node(&p.node_id)?;
    if (p.text.is_some() || p.marks.is_some()) && !old.is_text() {
        return Err(StoreError::structural(format!(
            "{} is not a text node",
            p.node_id
        )));
    }

    let mut node = old.clone();
    if let Some(patch) = &p.attrs {
        node.attrs = merge_attrs(old.attrs.as_ref(), patch);
    }
    if let Some(text) = &p.text {
        node.text = Some(text.clone());
    }
    let len = node.text_len();
    if node.is_text() {
        let marks = p.marks.as_deref().unwrap_or(old.marks()).iter().cloned().map(|mark| {
            docstore_model::Mark {
                attrs: normalize_attrs(mark.attrs.clone()),
                ..mark
            }
        });
        store_marks(&mut node, normalize_marks(marks, len));
    }
    ctx.check_attributes(&node)?;

    if node == old {
        return Ok(Applied::unchanged(json!({ "nodeId": p.node_id })));
    }
    ctx.put_node(node.clone());

    let mut restores = Vec::new();
    if node.text != old.text {
        restores = clamp_decorators(ctx, &p.node_id, len);
        selection::clamp_to_len(ctx.selection_mut(), &p.node_id, len);
    }

    let mut inverse = vec![Operation::UpdateNode(UpdateNodePayload {
        node_id: p.node_id.clone(),
        attrs: p
            .attrs
            .as_ref()
            .map(|patch| reverse_patch(old.attrs.as_ref(), patch))
            .filter(|patch| !patch.is_empty()),
        text: if node.text != old.text { old.text.clone() } else { None },
        marks: (node.marks != old.marks).then(|| old.marks().to_vec()),
    })];
    inverse.extend(restores);
    Ok(Applied::new(json!({ "nodeId": p.node_id }), inverse))
}
