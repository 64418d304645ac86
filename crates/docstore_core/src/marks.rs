//! Mark normalization and range algebra.
//!
//! After any text or mark change a node's marks satisfy:
//!
//! - `0 <= start < end <= text length`
//! - no two marks with the same type and attributes overlap or touch
//! - marks are ordered by `(start, type)`

use docstore_model::{Mark, Span};
use std::cmp::Ordering;

/// Clamps, drops and merges marks so the invariants above hold.
#[must_use]
pub fn normalize_marks(marks: impl IntoIterator<Item = Mark>, text_len: usize) -> Vec<Mark> {
    let mut clamped: Vec<Mark> = marks
        .into_iter()
        .filter_map(|mut mark| {
            mark.range.end = mark.range.end.min(text_len);
            (mark.range.start < mark.range.end).then_some(mark)
        })
        .collect();
    clamped.sort_by(order);

    let mut merged: Vec<Mark> = Vec::with_capacity(clamped.len());
    for mark in clamped {
        let previous = merged.iter_mut().rev().find(|m| m.same_kind(&mark));
        match previous {
            Some(prev) if prev.range.touches(&mark.range) => {
                prev.range.end = prev.range.end.max(mark.range.end);
            }
            _ => merged.push(mark),
        }
    }
    merged.sort_by(order);
    merged
}

fn order(a: &Mark, b: &Mark) -> Ordering {
    a.range
        .start
        .cmp(&b.range.start)
        .then_with(|| a.mark_type.cmp(&b.mark_type))
        .then_with(|| a.range.end.cmp(&b.range.end))
}

/// Removes the part of every mark matching `pred` that lies in `range`.
///
/// A mark that straddles `range` is split into its surviving left and right
/// parts.
#[must_use]
pub fn remove_coverage<F>(marks: &[Mark], range: Span, pred: F) -> Vec<Mark>
where
    F: Fn(&Mark) -> bool,
{
    let mut out = Vec::with_capacity(marks.len());
    for mark in marks {
        if !pred(mark) || mark.range.intersect(&range).is_none() {
            out.push(mark.clone());
            continue;
        }
        if mark.range.start < range.start {
            out.push(mark.with_range(Span::new(mark.range.start, range.start)));
        }
        if range.end < mark.range.end {
            out.push(mark.with_range(Span::new(range.end, mark.range.end)));
        }
    }
    out
}

/// Returns true if marks of `mark_type` together cover every char of `range`.
#[must_use]
pub fn covers(marks: &[Mark], mark_type: &str, range: Span) -> bool {
    if range.is_empty() {
        return false;
    }
    let mut spans: Vec<Span> = marks
        .iter()
        .filter(|m| m.mark_type == mark_type)
        .filter_map(|m| m.range.intersect(&range))
        .collect();
    spans.sort();

    let mut reached = range.start;
    for span in spans {
        if span.start > reached {
            return false;
        }
        reached = reached.max(span.end);
        if reached >= range.end {
            return true;
        }
    }
    false
}

/// Splits marks at `offset`: the left part keeps its ranges, the right part
/// is rebased to start at zero.
#[must_use]
pub fn partition_marks(marks: &[Mark], offset: usize) -> (Vec<Mark>, Vec<Mark>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for mark in marks {
        if let Some(part) = mark.range.intersect(&Span::new(0, offset)) {
            left.push(mark.with_range(part));
        }
        if let Some(part) = mark.range.intersect(&Span::new(offset, usize::MAX)) {
            right.push(mark.with_range(Span::new(part.start - offset, part.end - offset)));
        }
    }
    (left, right)
}

/// Shifts every mark right by `by` chars.
#[must_use]
pub fn shift_marks(marks: &[Mark], by: usize) -> Vec<Mark> {
    marks
        .iter()
        .map(|m| m.with_range(Span::new(m.range.start + by, m.range.end + by)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_model::Attrs;
    use serde_json::json;

    fn link(href: &str, start: usize, end: usize) -> Mark {
        let mut attrs = Attrs::new();
        attrs.insert("href".into(), json!(href));
        Mark::new("link", start, end).with_attrs(attrs)
    }

    #[test]
    fn normalize_clamps_and_drops() {
        let marks = vec![
            Mark::new("bold", 2, 20),
            Mark::new("italic", 12, 15),
            Mark::new("code", 3, 3),
        ];
        let normalized = normalize_marks(marks, 10);
        assert_eq!(normalized, vec![Mark::new("bold", 2, 10)]);
    }

    #[test]
    fn normalize_merges_touching_same_kind() {
        let marks = vec![
            Mark::new("bold", 4, 8),
            Mark::new("bold", 0, 4),
            Mark::new("bold", 6, 9),
        ];
        assert_eq!(normalize_marks(marks, 10), vec![Mark::new("bold", 0, 9)]);
    }

    #[test]
    fn normalize_keeps_different_attrs_apart() {
        let marks = vec![link("a", 0, 4), link("b", 2, 6)];
        let normalized = normalize_marks(marks, 10);
        assert_eq!(normalized.len(), 2);
    }

    #[test]
    fn normalize_orders_by_start_then_type() {
        let marks = vec![Mark::new("italic", 0, 3), Mark::new("bold", 0, 5), Mark::new("bold", 7, 8)];
        let types: Vec<_> = normalize_marks(marks, 10)
            .into_iter()
            .map(|m| (m.mark_type, m.range.start))
            .collect();
        assert_eq!(
            types,
            vec![("bold".to_string(), 0), ("italic".to_string(), 0), ("bold".to_string(), 7)]
        );
    }

    #[test]
    fn remove_coverage_splits_straddling_mark() {
        let marks = vec![Mark::new("bold", 0, 10), Mark::new("italic", 0, 10)];
        let out = remove_coverage(&marks, Span::new(3, 6), |m| m.mark_type == "bold");
        assert_eq!(
            normalize_marks(out, 10),
            vec![
                Mark::new("bold", 0, 3),
                Mark::new("italic", 0, 10),
                Mark::new("bold", 6, 10),
            ]
        );
    }

    #[test]
    fn covers_requires_gapless_union() {
        let marks = vec![Mark::new("bold", 0, 3), Mark::new("bold", 3, 6)];
        assert!(covers(&marks, "bold", Span::new(1, 6)));
        assert!(!covers(&marks, "bold", Span::new(1, 7)));
        assert!(!covers(&marks, "italic", Span::new(0, 1)));

        let gappy = vec![Mark::new("bold", 0, 2), Mark::new("bold", 3, 6)];
        assert!(!covers(&gappy, "bold", Span::new(0, 6)));
    }

    #[test]
    fn partition_rebases_right_side() {
        let marks = vec![Mark::new("bold", 0, 11), Mark::new("italic", 7, 9)];
        let (left, right) = partition_marks(&marks, 5);
        assert_eq!(left, vec![Mark::new("bold", 0, 5)]);
        assert_eq!(right, vec![Mark::new("bold", 0, 6), Mark::new("italic", 2, 4)]);
    }

    #[test]
    fn shift_then_partition_restores() {
        let right = vec![Mark::new("bold", 0, 6)];
        let shifted = shift_marks(&right, 5);
        assert_eq!(shifted, vec![Mark::new("bold", 5, 11)]);
        let (_, back) = partition_marks(&shifted, 5);
        assert_eq!(back, right);
    }
}
