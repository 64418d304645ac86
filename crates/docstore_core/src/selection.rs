//! Selection projection.
//!
//! A transaction carries a mutable copy of the selection. Operations that
//! touch nodes the selection refers to move it with the helpers below, using
//! the same clamp/shift rule as marks.

use crate::ranges::{adjust_offset, TextEdit};
use crate::traverse::NodeReader;
use docstore_model::{NodeId, RangeSelection, Selection};
use std::collections::HashSet;

/// Moves range endpoints in `node_id` through a text edit.
pub fn apply_text_edit(selection: &mut Option<Selection>, node_id: &NodeId, edit: &TextEdit) {
    remap_points(selection, |node, offset| {
        (node == node_id).then(|| (node.clone(), adjust_offset(offset, edit)))
    });
}

/// Clamps range endpoints in `node_id` to `len`.
pub fn clamp_to_len(selection: &mut Option<Selection>, node_id: &NodeId, len: usize) {
    remap_points(selection, |node, offset| {
        (node == node_id && offset > len).then(|| (node.clone(), len))
    });
}

/// Rewrites range endpoints. `f` returns the new position of a point, or
/// `None` to leave it alone.
pub fn remap_points<F>(selection: &mut Option<Selection>, f: F)
where
    F: Fn(&NodeId, usize) -> Option<(NodeId, usize)>,
{
    let Some(Selection::Range(range)) = selection.as_mut() else {
        return;
    };
    if let Some((node, offset)) = f(&range.start_node_id, range.start_offset) {
        range.start_node_id = node;
        range.start_offset = offset;
    }
    if let Some((node, offset)) = f(&range.end_node_id, range.end_offset) {
        range.end_node_id = node;
        range.end_offset = offset;
    }
    range.refresh_collapsed();
}

/// Replaces `from` by `to` in node and multi-node selections.
pub fn replace_node(selection: &mut Option<Selection>, from: &NodeId, to: &NodeId) {
    match selection.as_mut() {
        Some(Selection::Node { node_id }) if node_id == from => *node_id = to.clone(),
        Some(Selection::Multi {
            node_ids,
            primary_node_id,
        }) => {
            let mut seen = HashSet::new();
            let replaced: Vec<NodeId> = node_ids
                .iter()
                .map(|id| if id == from { to.clone() } else { id.clone() })
                .filter(|id| seen.insert(id.clone()))
                .collect();
            *node_ids = replaced;
            if primary_node_id.as_ref() == Some(from) {
                *primary_node_id = Some(to.clone());
            }
        }
        _ => {}
    }
}

/// Drops every reference to a removed node.
///
/// A range selection with an endpoint in a removed node is cleared.
pub fn forget_nodes(selection: &mut Option<Selection>, removed: &HashSet<NodeId>) {
    let clear = match selection.as_mut() {
        Some(Selection::Range(range)) => {
            removed.contains(&range.start_node_id) || removed.contains(&range.end_node_id)
        }
        Some(Selection::Node { node_id }) => removed.contains(node_id),
        Some(Selection::Multi {
            node_ids,
            primary_node_id,
        }) => {
            node_ids.retain(|id| !removed.contains(id));
            if primary_node_id.as_ref().is_some_and(|id| removed.contains(id)) {
                *primary_node_id = None;
            }
            node_ids.is_empty()
        }
        None => false,
    };
    if clear {
        *selection = None;
    }
}

/// Brings a selection in line with the graph it will be committed with.
///
/// References to missing nodes are dropped, text offsets are clamped to
/// their node, and a non-empty range inside a single node without text
/// becomes a node selection.
pub fn normalize<R: NodeReader + ?Sized>(
    selection: Option<Selection>,
    reader: &R,
) -> Option<Selection> {
    match selection? {
        Selection::Range(range) => normalize_range(range, reader),
        Selection::Node { node_id } => {
            reader.has_node(&node_id).then_some(Selection::Node { node_id })
        }
        Selection::Multi {
            mut node_ids,
            mut primary_node_id,
        } => {
            node_ids.retain(|id| reader.has_node(id));
            if primary_node_id.as_ref().is_some_and(|id| !reader.has_node(id)) {
                primary_node_id = None;
            }
            (!node_ids.is_empty()).then_some(Selection::Multi {
                node_ids,
                primary_node_id,
            })
        }
    }
}

fn normalize_range<R: NodeReader + ?Sized>(
    mut range: RangeSelection,
    reader: &R,
) -> Option<Selection> {
    let start = reader.get_node(&range.start_node_id)?;
    let end = reader.get_node(&range.end_node_id)?;

    if start.is_text() {
        range.start_offset = range.start_offset.min(start.text_len());
    }
    if end.is_text() {
        range.end_offset = range.end_offset.min(end.text_len());
    }
    range.refresh_collapsed();

    if start.id == end.id && !start.is_text() && !range.collapsed {
        return Some(Selection::Node { node_id: start.id });
    }
    Some(Selection::Range(range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traverse::tests::MapReader;

    #[test]
    fn caret_inside_deleted_span_clamps_to_start() {
        let mut sel = Some(Selection::caret("t1", 7));
        apply_text_edit(&mut sel, &"t1".into(), &TextEdit::delete(5, 9));
        assert_eq!(sel, Some(Selection::caret("t1", 5)));
    }

    #[test]
    fn caret_after_deleted_span_shifts_left() {
        let mut sel = Some(Selection::caret("t1", 10));
        apply_text_edit(&mut sel, &"t1".into(), &TextEdit::delete(2, 5));
        assert_eq!(sel, Some(Selection::caret("t1", 7)));
    }

    #[test]
    fn edits_in_other_nodes_do_not_move_points() {
        let mut sel = Some(Selection::range("t1", 1, "t2", 3));
        apply_text_edit(&mut sel, &"t2".into(), &TextEdit::insert(0, 4));
        assert_eq!(sel, Some(Selection::range("t1", 1, "t2", 7)));
    }

    #[test]
    fn range_collapses_when_content_between_is_deleted() {
        let mut sel = Some(Selection::range("t1", 2, "t1", 6));
        apply_text_edit(&mut sel, &"t1".into(), &TextEdit::delete(2, 6));
        assert!(sel.unwrap().is_collapsed());
    }

    #[test]
    fn forget_clears_ranges_and_filters_multi() {
        let removed: HashSet<NodeId> = [NodeId::from("t1")].into_iter().collect();

        let mut range = Some(Selection::caret("t1", 0));
        forget_nodes(&mut range, &removed);
        assert_eq!(range, None);

        let mut multi = Some(Selection::Multi {
            node_ids: vec!["t1".into(), "t2".into()],
            primary_node_id: Some("t1".into()),
        });
        forget_nodes(&mut multi, &removed);
        assert_eq!(
            multi,
            Some(Selection::Multi {
                node_ids: vec!["t2".into()],
                primary_node_id: None,
            })
        );
    }

    #[test]
    fn replace_node_dedups() {
        let mut multi = Some(Selection::Multi {
            node_ids: vec!["a".into(), "b".into()],
            primary_node_id: Some("b".into()),
        });
        replace_node(&mut multi, &"b".into(), &"a".into());
        assert_eq!(
            multi,
            Some(Selection::Multi {
                node_ids: vec!["a".into()],
                primary_node_id: Some("a".into()),
            })
        );
    }

    #[test]
    fn normalize_turns_block_range_into_node_selection() {
        let reader = MapReader::sample();
        let sel = normalize(Some(Selection::range("p1", 0, "p1", 2)), &reader);
        assert_eq!(sel, Some(Selection::node("p1")));

        let caret = normalize(Some(Selection::caret("t1", 99)), &reader);
        assert_eq!(caret, Some(Selection::caret("t1", 5)));

        assert_eq!(normalize(Some(Selection::node("gone")), &reader), None);
    }
}
