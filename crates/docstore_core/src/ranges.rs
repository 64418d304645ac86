//! Range adjustment engine.
//!
//! One rule moves every range anchored in a node's text when that text is
//! edited. For an edit at `position` with `delta = inserted - deleted`:
//!
//! - `position <= start`: the whole range shifts by `delta`
//! - `start < position < end`: only `end` shifts
//! - otherwise the range is unchanged
//!
//! Offsets that started at or after `position` never move before it; a
//! deletion that swallows them clamps them to `position`. Ranges that end up
//! with `end <= start` are dropped. Marks and decorator targets go through
//! the same rule; selection points use [`adjust_offset`].

use docstore_model::{Decorator, Mark, NodeId, Span};

/// A single text edit: `deleted` chars removed at `position`, then
/// `inserted` chars inserted there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    /// Char offset of the edit.
    pub position: usize,
    /// Number of chars inserted.
    pub inserted: usize,
    /// Number of chars removed.
    pub deleted: usize,
}

impl TextEdit {
    /// An insertion of `len` chars at `position`.
    #[must_use]
    pub const fn insert(position: usize, len: usize) -> Self {
        Self {
            position,
            inserted: len,
            deleted: 0,
        }
    }

    /// A deletion of `[start, end)`.
    #[must_use]
    pub const fn delete(start: usize, end: usize) -> Self {
        Self {
            position: start,
            inserted: 0,
            deleted: end.saturating_sub(start),
        }
    }

    /// A replacement of `[start, end)` by `len` chars.
    #[must_use]
    pub const fn replace(start: usize, end: usize, len: usize) -> Self {
        Self {
            position: start,
            inserted: len,
            deleted: end.saturating_sub(start),
        }
    }

    /// Returns `inserted - deleted`.
    #[must_use]
    pub fn delta(&self) -> i64 {
        self.inserted as i64 - self.deleted as i64
    }

    /// Returns true if the edit changes nothing.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.inserted == 0 && self.deleted == 0
    }
}

/// Moves one range through an edit. Returns `None` if it degenerates.
#[must_use]
pub fn adjust_range(span: Span, edit: &TextEdit) -> Option<Span> {
    let delta = edit.delta();
    let position = edit.position as i64;
    let (start, end) = (span.start as i64, span.end as i64);

    let (start, end) = if position <= start {
        ((start + delta).max(position), (end + delta).max(position))
    } else if position < end {
        (start, (end + delta).max(position))
    } else {
        (start, end)
    };

    if start < 0 || end <= start {
        return None;
    }
    Some(Span::new(start as usize, end as usize))
}

/// Moves every range through an edit, dropping degenerate results.
#[must_use]
pub fn adjust_ranges(spans: &[Span], edit: &TextEdit) -> Vec<Span> {
    spans.iter().filter_map(|s| adjust_range(*s, edit)).collect()
}

/// Moves every mark through an edit, dropping degenerate marks.
///
/// The result is not normalized; callers run
/// [`crate::marks::normalize_marks`] afterwards.
#[must_use]
pub fn adjust_marks(marks: &[Mark], edit: &TextEdit) -> Vec<Mark> {
    marks
        .iter()
        .filter_map(|mark| adjust_range(mark.range, edit).map(|range| mark.with_range(range)))
        .collect()
}

/// Outcome of moving one decorator through an edit.
#[derive(Debug, Clone, PartialEq)]
pub enum DecoratorAdjustment {
    /// The decorator does not target the edited text.
    Unchanged,
    /// The decorator's target range moved.
    Moved(Decorator),
    /// The target range degenerated.
    Removed,
}

/// Moves a decorator's target range through an edit of `node_id`.
///
/// Decorators that target another node, or target a whole node, are
/// [`DecoratorAdjustment::Unchanged`].
#[must_use]
pub fn adjust_decorator(
    decorator: &Decorator,
    node_id: &NodeId,
    edit: &TextEdit,
) -> DecoratorAdjustment {
    let Some(target) = decorator.target.as_ref() else {
        return DecoratorAdjustment::Unchanged;
    };
    if &target.node_id != node_id {
        return DecoratorAdjustment::Unchanged;
    }
    let Some(span) = target.span() else {
        return DecoratorAdjustment::Unchanged;
    };
    match adjust_range(span, edit) {
        Some(moved) if moved == span => DecoratorAdjustment::Unchanged,
        Some(moved) => {
            let mut updated = decorator.clone();
            if let Some(target) = updated.target.as_mut() {
                target.start_offset = Some(moved.start);
                target.end_offset = Some(moved.end);
            }
            DecoratorAdjustment::Moved(updated)
        }
        None => DecoratorAdjustment::Removed,
    }
}

/// Moves a single point (a selection offset) through an edit.
///
/// Points at or after the edit position follow an insertion. Points inside
/// a deleted span clamp to its start; points after it shift left.
#[must_use]
pub fn adjust_offset(offset: usize, edit: &TextEdit) -> usize {
    if offset < edit.position {
        return offset;
    }
    let deleted_end = edit.position + edit.deleted;
    if edit.deleted > 0 && offset < deleted_end {
        return edit.position;
    }
    offset - edit.deleted + edit.inserted
}
