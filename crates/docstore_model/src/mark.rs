//! Marks over leaf text.

use crate::node::Attrs;
use serde::{Deserialize, Serialize};

/// A half-open char range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl Span {
    /// Creates a span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the number of chars covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span covers nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns the overlapping part of two spans, if any.
    #[must_use]
    pub fn intersect(&self, other: &Span) -> Option<Span> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Span { start, end })
    }

    /// Returns true if the spans overlap or share an endpoint.
    #[must_use]
    pub fn touches(&self, other: &Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Returns true if `other` lies entirely inside this span.
    #[must_use]
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A formatting mark over a leaf node's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    /// Mark type tag (e.g. `bold`, `link`).
    #[serde(rename = "type")]
    pub mark_type: String,
    /// Covered char range.
    pub range: Span,
    /// Optional attributes (e.g. a link target).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
}

impl Mark {
    /// Creates a mark without attributes.
    #[must_use]
    pub fn new(mark_type: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            mark_type: mark_type.into(),
            range: Span::new(start, end),
            attrs: None,
        }
    }

    /// Returns this mark with attributes attached.
    #[must_use]
    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = Some(attrs);
        self
    }

    /// Returns true if both marks have the same type and attributes.
    ///
    /// An empty attribute map and absent attributes compare equal.
    #[must_use]
    pub fn same_kind(&self, other: &Mark) -> bool {
        self.mark_type == other.mark_type && attrs_eq(&self.attrs, &other.attrs)
    }

    /// Returns a copy covering `range` instead.
    #[must_use]
    pub fn with_range(&self, range: Span) -> Mark {
        Mark {
            mark_type: self.mark_type.clone(),
            range,
            attrs: self.attrs.clone(),
        }
    }
}

fn attrs_eq(a: &Option<Attrs>, b: &Option<Attrs>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        (Some(x), None) | (None, Some(x)) => x.is_empty(),
        (None, None) => true,
    }
}
