//! Decorator operations and the decorator side of text edits.

use super::Applied;
use crate::error::{StoreError, StoreResult};
use crate::ranges::{adjust_decorator, DecoratorAdjustment, TextEdit};
use crate::traverse::NodeReader;
use crate::transaction::TransactionContext;
use docstore_model::{
    AddDecoratorPayload, Decorator, DecoratorCategory, NodeId, Operation, RemoveDecoratorPayload,
};
use serde_json::json;

/// `putDecorator` restoring `decorator` exactly.
pub(super) fn restore(decorator: Decorator) -> Operation {
    Operation::PutDecorator(AddDecoratorPayload { decorator })
}

/// Moves inline decorators of `node_id` through a text edit. Returns the
/// operations that restore every decorator it touched.
pub(super) fn shift_decorators(
    ctx: &mut TransactionContext<'_>,
    node_id: &NodeId,
    edit: &TextEdit,
) -> Vec<Operation> {
    let mut restores = Vec::new();
    for decorator in ctx.decorators_for(node_id) {
        match adjust_decorator(&decorator, node_id, edit) {
            DecoratorAdjustment::Unchanged => {}
            DecoratorAdjustment::Moved(moved) => {
                ctx.put_decorator(moved);
                restores.push(restore(decorator));
            }
            DecoratorAdjustment::Removed => {
                ctx.remove_decorator(&decorator.id);
                restores.push(restore(decorator));
            }
        }
    }
    restores
}

/// Clamps inline decorators of `node_id` to `len`, dropping ones left empty.
pub(super) fn clamp_decorators(
    ctx: &mut TransactionContext<'_>,
    node_id: &NodeId,
    len: usize,
) -> Vec<Operation> {
    let mut restores = Vec::new();
    for decorator in ctx.decorators_for(node_id) {
        let Some(span) = decorator.target.as_ref().and_then(|t| t.span()) else {
            continue;
        };
        if span.end <= len {
            continue;
        }
        if span.start >= len {
            ctx.remove_decorator(&decorator.id);
        } else {
            let mut clamped = decorator.clone();
            if let Some(target) = clamped.target.as_mut() {
                target.end_offset = Some(len);
            }
            ctx.put_decorator(clamped);
        }
        restores.push(restore(decorator));
    }
    restores
}

/// Points every decorator anchored to `from` at `to`, mapping ranges with
/// `map_range`. Returns restore operations.
pub(super) fn retarget_decorators<F>(
    ctx: &mut TransactionContext<'_>,
    from: &NodeId,
    to: &NodeId,
    map_offset: F,
) -> Vec<Operation>
where
    F: Fn(usize) -> usize,
{
    let mut restores = Vec::new();
    for decorator in ctx.decorators_for(from) {
        let mut moved = decorator.clone();
        if let Some(target) = moved.target.as_mut() {
            target.node_id = to.clone();
            target.start_offset = target.start_offset.map(&map_offset);
            target.end_offset = target.end_offset.map(&map_offset);
        }
        ctx.put_decorator(moved);
        restores.push(restore(decorator));
    }
    restores
}

fn validate(decorator: &Decorator, ctx: &TransactionContext<'_>) -> StoreResult<()> {
    if decorator.category.requires_target() && decorator.target.is_none() {
        return Err(StoreError::validation(vec![format!(
            "decorator {} requires a target",
            decorator.id
        )]));
    }
    let Some(target) = &decorator.target else {
        return Ok(());
    };
    let node = ctx.node(&target.node_id)?;
    match (target.start_offset, target.end_offset) {
        (Some(start), Some(end)) => {
            if start >= end {
                return Err(StoreError::invalid_operation(format!(
                    "decorator {} has an empty range",
                    decorator.id
                )));
            }
            if end > node.text_len() {
                return Err(StoreError::out_of_range(&node.id, end, node.text_len()));
            }
            Ok(())
        }
        (None, None) if decorator.category == DecoratorCategory::Inline => {
            Err(StoreError::validation(vec![format!(
                "inline decorator {} requires a range",
                decorator.id
            )]))
        }
        (None, None) => Ok(()),
        _ => Err(StoreError::invalid_operation(format!(
            "decorator {} needs both range offsets",
            decorator.id
        ))),
    }
}

pub(super) fn add_decorator(
    p: &AddDecoratorPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let decorator = &p.decorator;
    if ctx.get_decorator(&decorator.id).is_some() {
        return Err(StoreError::structural(format!(
            "decorator {} already exists",
            decorator.id
        )));
    }
    validate(decorator, ctx)?;
    ctx.put_decorator(decorator.clone());
    Ok(Applied::new(
        json!({ "decoratorId": decorator.id }),
        vec![Operation::RemoveDecorator(RemoveDecoratorPayload {
            decorator_id: decorator.id.clone(),
        })],
    ))
}

pub(super) fn remove_decorator(
    p: &RemoveDecoratorPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let old = ctx
        .get_decorator(&p.decorator_id)
        .ok_or_else(|| StoreError::decorator_not_found(&p.decorator_id))?;
    ctx.remove_decorator(&p.decorator_id);
    Ok(Applied::new(
        json!({ "decoratorId": p.decorator_id }),
        vec![Operation::AddDecorator(AddDecoratorPayload { decorator: old })],
    ))
}

pub(super) fn update_decorator(
    p: &AddDecoratorPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    let old = ctx
        .get_decorator(&p.decorator.id)
        .ok_or_else(|| StoreError::decorator_not_found(&p.decorator.id))?;
    validate(&p.decorator, ctx)?;
    ctx.put_decorator(p.decorator.clone());
    Ok(Applied::new(
        json!({ "decoratorId": p.decorator.id }),
        vec![Operation::UpdateDecorator(AddDecoratorPayload { decorator: old })],
    ))
}

pub(super) fn put_decorator(
    p: &AddDecoratorPayload,
    ctx: &mut TransactionContext<'_>,
) -> StoreResult<Applied> {
    validate(&p.decorator, ctx)?;
    let inverse = match ctx.get_decorator(&p.decorator.id) {
        Some(old) if old == p.decorator => return Ok(Applied::unchanged(json!({ "decoratorId": old.id }))),
        Some(old) => restore(old),
        None => Operation::RemoveDecorator(RemoveDecoratorPayload {
            decorator_id: p.decorator.id.clone(),
        }),
    };
    ctx.put_decorator(p.decorator.clone());
    Ok(Applied::new(json!({ "decoratorId": p.decorator.id }), vec![inverse]))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{context, sample_graph, with_decorators};
    use super::*;
    use crate::config::StoreConfig;
    use docstore_model::{DecoratorId, DecoratorTarget};

    fn comment(id: &str, start: usize, end: usize) -> Decorator {
        Decorator::new(
            id,
            "comment",
            DecoratorCategory::Inline,
            Some(DecoratorTarget::range("t1", start, end)),
        )
    }

    fn add(decorator: Decorator) -> Operation {
        Operation::AddDecorator(AddDecoratorPayload { decorator })
    }

    #[test]
    fn add_then_inverse_removes() {
        let graph = sample_graph();
        let config = StoreConfig::default();
        let mut ctx = context(&graph, &config, None);

        let applied = super::super::apply(&add(comment("c1", 0, 5)), &mut ctx).unwrap();
        assert!(ctx.get_decorator(&DecoratorId::from("c1")).is_some());

        super::super::apply(&applied.inverse[0], &mut ctx).unwrap();
        assert!(ctx.get_decorator(&DecoratorId::from("c1")).is_none());
    }

    #[test]
    fn duplicate_and_invalid_targets_are_rejected() {
        let graph = sample_graph();
        with_decorators(&graph, vec![comment("c1", 0, 5)]);
        let config = StoreConfig::default();
        let mut ctx = context(&graph, &config, None);

        let dup = super::super::apply(&add(comment("c1", 0, 5)), &mut ctx).unwrap_err();
        assert_eq!(dup.code(), "STRUCTURAL_VIOLATION");

        let past_end = super::super::apply(&add(comment("c2", 0, 50)), &mut ctx).unwrap_err();
        assert_eq!(past_end.code(), "OUT_OF_RANGE");

        let untargeted = Decorator::new("c3", "comment", DecoratorCategory::Block, None);
        let err = super::super::apply(&add(untargeted), &mut ctx).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let layer = Decorator::new("l1", "cursor", DecoratorCategory::Layer, None);
        assert!(super::super::apply(&add(layer), &mut ctx).is_ok());
    }

    #[test]
    fn put_decorator_inverse_depends_on_prior_state() {
        let graph = sample_graph();
        with_decorators(&graph, vec![comment("c1", 0, 5)]);
        let config = StoreConfig::default();
        let mut ctx = context(&graph, &config, None);

        let put = Operation::PutDecorator(AddDecoratorPayload {
            decorator: comment("c1", 1, 4),
        });
        let applied = super::super::apply(&put, &mut ctx).unwrap();
        assert_eq!(applied.inverse, vec![restore(comment("c1", 0, 5))]);

        let fresh = Operation::PutDecorator(AddDecoratorPayload {
            decorator: comment("c9", 1, 4),
        });
        let applied = super::super::apply(&fresh, &mut ctx).unwrap();
        assert!(matches!(applied.inverse[0], Operation::RemoveDecorator(_)));
    }

    #[test]
    fn clamp_drops_decorators_past_new_end() {
        let graph = sample_graph();
        with_decorators(&graph, vec![comment("c1", 2, 8), comment("c2", 9, 11)]);
        let config = StoreConfig::default();
        let mut ctx = context(&graph, &config, None);

        let restores = clamp_decorators(&mut ctx, &"t1".into(), 5);
        assert_eq!(restores.len(), 2);
        let c1 = ctx.get_decorator(&DecoratorId::from("c1")).unwrap();
        assert_eq!(c1.target.unwrap().end_offset, Some(5));
        assert!(ctx.get_decorator(&DecoratorId::from("c2")).is_none());
    }
}
