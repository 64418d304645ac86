//! Content operations: `addChild`, `removeChild`, `moveNode`,
//! `reorderChildren`.
//!
//! Each keeps the parent's child list and the child's `parent`
//! back-reference in step.

use super::nodes::create_node;
use super::{insert_child, Applied};
use crate::error::{StoreError, StoreResult};
use crate::schema::ContentModel;
use crate::transaction::TransactionContext;
use crate::traverse::{is_ancestor, NodeReader};
use docstore_model::{
    AddChildPayload, ChildInit, CreateNodePayload, MoveNodePayload, Node, Operation,
    RemoveChildPayload, ReorderChildrenPayload,
};
use serde_json::json;
use std::collections::HashSet;

/// Fails unless `node` can receive children.
pub(super) fn ensure_container(ctx: &TransactionContext<'_>, node: &Node) -> StoreResult<()> {
    if !node.is_container() {
        return Err(StoreError::structural(format!(
            "{} cannot hold children",
            node.id
        )));
    }
    match ctx.schema().content_model(&node.node_type) {
        Some(ContentModel::Text | ContentModel::Empty) => Err(StoreError::structural(format!(
            "{} nodes cannot hold children",
            node.node_type
        ))),
        _ => Ok(()),
    }
}

pub(super) fn add_child(
    p: &AddChildPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let child_id = match &p.child {
        ChildInit::Inline(init) => {
            let create = CreateNodePayload {
                node: (**init).clone(),
                parent_id: Some(p.parent_id.clone()),
                position: p.position,
            };
            return create_node(&create, ctx);
        }
        ChildInit::Ref(child_id) => child_id,
    };

    let mut parent = ctx.node(&p.parent_id)?;
    let mut child = ctx.node(child_id)?;
    ensure_container(ctx, &parent)?;
    if child_id == ctx.root_id() {
        return Err(StoreError::structural("the root cannot become a child"));
    }
    if child.parent.is_some() {
        return Err(StoreError::structural(format!(
            "node {child_id} is already attached"
        )));
    }
    if child_id == &p.parent_id || is_ancestor(ctx, child_id, &p.parent_id) {
        return Err(StoreError::structural(format!(
            "adding {child_id} under {} would create a cycle",
            p.parent_id
        )));
    }

    let index = insert_child(&mut parent, p.position, child_id.clone())?;
    child.parent = Some(p.parent_id.clone());
    ctx.put_node(child);
    ctx.check_content(&parent)?;
    ctx.put_node(parent);

    Ok(Applied::new(
        json!({ "parentId": p.parent_id, "childId": child_id, "index": index }),
        vec![Operation::RemoveChild(RemoveChildPayload {
            parent_id: p.parent_id.clone(),
            child_id: child_id.clone(),
        })],
    ))
}

pub(super) fn remove_child(
    p: &RemoveChildPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let mut parent = ctx.node(&p.parent_id)?;
    let mut child = ctx.node(&p.child_id)?;
    let index = parent.child_index(&p.child_id).ok_or_else(|| {
        StoreError::structural(format!("{} is not a child of {}", p.child_id, p.parent_id))
    })?;

    if let Some(children) = parent.content.as_mut() {
        children.remove(index);
    }
    child.parent = None;
    ctx.check_content(&parent)?;
    ctx.put_node(parent);
    ctx.put_node(child);

    Ok(Applied::new(
        json!({ "parentId": p.parent_id, "childId": p.child_id, "index": index }),
        vec![Operation::AddChild(AddChildPayload {
            parent_id: p.parent_id.clone(),
            child: ChildInit::Ref(p.child_id.clone()),
            position: Some(index),
        })],
    ))
}

/// Detaches and reattaches in one step; the node is never left without a
/// parent as seen from outside the operation.
pub(super) fn move_node(
    p: &MoveNodePayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let mut node = ctx.node(&p.node_id)?;
    if &p.node_id == ctx.root_id() {
        return Err(StoreError::structural("the root cannot be moved"));
    }
    let old_parent_id = node
        .parent
        .clone()
        .ok_or_else(|| StoreError::structural(format!("{} is detached", p.node_id)))?;
    let mut old_parent = ctx.node(&old_parent_id)?;
    let old_index = old_parent.child_index(&p.node_id).ok_or_else(|| {
        StoreError::structural(format!("{} is not a child of {old_parent_id}", p.node_id))
    })?;
    let new_parent = ctx.node(&p.new_parent_id)?;
    ensure_container(ctx, &new_parent)?;
    if p.new_parent_id == p.node_id || is_ancestor(ctx, &p.node_id, &p.new_parent_id) {
        return Err(StoreError::structural(format!(
            "moving {} under {} would create a cycle",
            p.node_id, p.new_parent_id
        )));
    }

    if let Some(children) = old_parent.content.as_mut() {
        children.remove(old_index);
    }
    let same_parent = old_parent_id == p.new_parent_id;
    let destination_len = if same_parent {
        old_parent.children().len()
    } else {
        new_parent.children().len()
    };
    if let Some(position) = p.position.filter(|&pos| pos > destination_len) {
        return Err(StoreError::out_of_range(&p.new_parent_id, position, destination_len));
    }

    let mut new_parent = if same_parent {
        old_parent
    } else {
        ctx.put_node(old_parent);
        new_parent
    };
    let index = insert_child(&mut new_parent, p.position, p.node_id.clone())?;
    node.parent = Some(p.new_parent_id.clone());
    ctx.put_node(node);
    ctx.check_content(&new_parent)?;
    ctx.put_node(new_parent);

    Ok(Applied::new(
        json!({ "nodeId": p.node_id, "parentId": p.new_parent_id, "index": index }),
        vec![Operation::move_node(
            p.node_id.clone(),
            old_parent_id,
            Some(old_index),
        )],
    ))
}

pub(super) fn reorder_children(
    p: &ReorderChildrenPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let mut parent = ctx.node(&p.parent_id)?;
    let old = parent.children().to_vec();

    let current: HashSet<_> = old.iter().collect();
    let mut seen = HashSet::new();
    let valid = p.child_ids.len() == old.len()
        && p.child_ids.iter().all(|id| current.contains(id) && seen.insert(id));
    if !valid {
        return Err(StoreError::structural(format!(
            "new order for {} must list every current child exactly once",
            p.parent_id
        )));
    }
    if p.child_ids == old {
        return Ok(Applied::unchanged(json!({ "parentId": p.parent_id })));
    }

    parent.content = Some(p.child_ids.clone());
    ctx.check_content(&parent)?;
    ctx.put_node(parent);
    Ok(Applied::new(
        json!({ "parentId": p.parent_id }),
        vec![Operation::ReorderChildren(ReorderChildrenPayload {
            parent_id: p.parent_id.clone(),
            child_ids: old,
        })],
    ))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{context, sample_graph};
    use super::*;
    use crate::config::StoreConfig;
    use crate::schema::{RuleSchema, Schema, TypeRule};
    use docstore_model::{NodeId, NodeInit};

    fn apply(op: &Operation, ctx: &mut TransactionContext<'_>) -> StoreResult<Applied> {
        super::super::apply(op, ctx)
    }

    fn children(ctx: &TransactionContext<'_>, id: &str) -> Vec<NodeId> {
        ctx.get_node(&id.into()).unwrap().children().to_vec()
    }

    #[test]
    fn remove_then_add_restores_position() {
        let graph = sample_graph();
        let config = StoreConfig::default();
        let mut ctx = context(&graph, &config, None);

        let remove = Operation::RemoveChild(RemoveChildPayload {
            parent_id: "p1".into(),
            child_id: "t1".into(),
        });
        let applied = apply(&remove, &mut ctx).unwrap();
        assert_eq!(children(&ctx, "p1"), vec![NodeId::from("t2")]);
        assert_eq!(ctx.get_node(&"t1".into()).unwrap().parent, None);

        apply(&applied.inverse[0], &mut ctx).unwrap();
        assert_eq!(children(&ctx, "p1"), vec![NodeId::from("t1"), NodeId::from("t2")]);
        assert_eq!(ctx.get_node(&"t1".into()).unwrap().parent, Some("p1".into()));
    }

    #[test]
    fn add_inline_child_creates_it() {
        let graph = sample_graph();
        let config = StoreConfig::default();
        let mut ctx = context(&graph, &config, None);

        let op = Operation::AddChild(AddChildPayload {
            parent_id: "p1".into(),
            child: ChildInit::Inline(Box::new(NodeInit::text("?").with_id("t9"))),
            position: Some(1),
        });
        apply(&op, &mut ctx).unwrap();
        assert_eq!(children(&ctx, "p1")[1], NodeId::from("t9"));
    }

    #[test]
    fn move_within_same_parent() {
        let graph = sample_graph();
        let config = StoreConfig::default();
        let mut ctx = context(&graph, &config, None);

        let applied = apply(&Operation::move_node("t1", "p1", None), &mut ctx).unwrap();
        assert_eq!(children(&ctx, "p1"), vec![NodeId::from("t2"), NodeId::from("t1")]);

        apply(&applied.inverse[0], &mut ctx).unwrap();
        assert_eq!(children(&ctx, "p1"), vec![NodeId::from("t1"), NodeId::from("t2")]);
    }

    #[test]
    fn move_to_other_parent_updates_back_reference() {
        let graph = sample_graph();
        let config = StoreConfig::default();
        let mut ctx = context(&graph, &config, None);

        apply(&Operation::move_node("t2", "root", Some(0)), &mut ctx).unwrap();
        assert_eq!(children(&ctx, "root"), vec![NodeId::from("t2"), NodeId::from("p1")]);
        assert_eq!(children(&ctx, "p1"), vec![NodeId::from("t1")]);
        assert_eq!(ctx.get_node(&"t2".into()).unwrap().parent, Some("root".into()));
    }

    #[test]
    fn move_rejects_cycles_and_root() {
        let graph = sample_graph();
        let config = StoreConfig::default();
        let mut ctx = context(&graph, &config, None);

        let cycle = apply(&Operation::move_node("p1", "p1", None), &mut ctx).unwrap_err();
        assert_eq!(cycle.code(), "STRUCTURAL_VIOLATION");
        let root = apply(&Operation::move_node("root", "p1", None), &mut ctx).unwrap_err();
        assert_eq!(root.code(), "STRUCTURAL_VIOLATION");
        let into_text = apply(&Operation::move_node("t2", "t1", None), &mut ctx).unwrap_err();
        assert_eq!(into_text.code(), "STRUCTURAL_VIOLATION");
        assert!(ctx.overlay().is_empty());
    }

    #[test]
    fn reorder_requires_a_permutation() {
        let graph = sample_graph();
        let config = StoreConfig::default();
        let mut ctx = context(&graph, &config, None);

        let bad = Operation::ReorderChildren(ReorderChildrenPayload {
            parent_id: "p1".into(),
            child_ids: vec!["t1".into(), "t1".into()],
        });
        assert_eq!(apply(&bad, &mut ctx).unwrap_err().code(), "STRUCTURAL_VIOLATION");

        let good = Operation::ReorderChildren(ReorderChildrenPayload {
            parent_id: "p1".into(),
            child_ids: vec!["t2".into(), "t1".into()],
        });
        let applied = apply(&good, &mut ctx).unwrap();
        assert_eq!(children(&ctx, "p1"), vec![NodeId::from("t2"), NodeId::from("t1")]);
        apply(&applied.inverse[0], &mut ctx).unwrap();
        assert_eq!(children(&ctx, "p1"), vec![NodeId::from("t1"), NodeId::from("t2")]);
    }

    #[test]
    fn schema_rejects_disallowed_child() {
        let graph = sample_graph();
        let config = StoreConfig::default();
        let schema = RuleSchema::new()
            .rule("doc", TypeRule::children().allow_children(["paragraph"]))
            .rule("paragraph", TypeRule::children().allow_children(["text"]))
            .rule("text", TypeRule::text());
        let mut ctx = TransactionContext::new(&graph, &schema as &dyn Schema, &config, None);

        let err = apply(&Operation::move_node("t1", "root", None), &mut ctx).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
