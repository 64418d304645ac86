//! Property-based test generators using proptest.
//!
//! Offsets are generated as fractions of the current text length and
//! resolved when the step is turned into an [`Operation`], so a sequence of
//! steps stays in range while the text grows and shrinks.

use docstore_model::text::char_len;
use docstore_model::{Mark, Operation};
use proptest::prelude::*;

/// Mark types used by the generators.
pub const MARK_TYPES: [&str; 3] = ["bold", "italic", "underline"];

/// Strategy for leaf text, including multi-byte chars.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z é日]{0,24}").expect("Invalid regex")
}

/// Strategy for short inserted fragments.
pub fn fragment_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z é]{1,6}").expect("Invalid regex")
}

/// Strategy for mark types.
pub fn mark_type_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(MARK_TYPES.to_vec()).prop_map(str::to_string)
}

/// Strategy for marks inside a text of `len` chars.
///
/// The marks are not normalized.
pub fn marks_strategy(len: usize) -> impl Strategy<Value = Vec<Mark>> {
    let mark = (mark_type_strategy(), 0..=len, 0..=len)
        .prop_filter("Mark must not be empty", |(_, a, b)| a != b)
        .prop_map(|(mark_type, a, b)| Mark::new(mark_type, a.min(b), a.max(b)));
    let max = if len == 0 { 0 } else { 4 };
    prop::collection::vec(mark, 0..=max)
}

/// Strategy for a text leaf with marks.
pub fn leaf_strategy() -> impl Strategy<Value = (String, Vec<Mark>)> {
    text_strategy().prop_flat_map(|text| {
        let len = char_len(&text);
        (Just(text), marks_strategy(len))
    })
}

/// One editing step against a single text leaf.
#[derive(Debug, Clone)]
pub enum EditStep {
    /// Insert a fragment
    Insert {
        /// Position as a fraction of the length
        at: u8,
        /// Inserted text
        text: String,
    },
    /// Delete a range
    Delete {
        /// One end of the range
        a: u8,
        /// Other end of the range
        b: u8,
    },
    /// Replace a range
    Replace {
        /// One end of the range
        a: u8,
        /// Other end of the range
        b: u8,
        /// Replacement text
        text: String,
    },
    /// Apply a mark
    ApplyMark {
        /// One end of the range
        a: u8,
        /// Other end of the range
        b: u8,
        /// Mark type
        mark_type: String,
    },
    /// Remove a mark
    RemoveMark {
        /// One end of the range
        a: u8,
        /// Other end of the range
        b: u8,
        /// Mark type
        mark_type: String,
    },
    /// Toggle a mark
    ToggleMark {
        /// One end of the range
        a: u8,
        /// Other end of the range
        b: u8,
        /// Mark type
        mark_type: String,
    },
}

impl EditStep {
    /// Resolves the step against a leaf of `len` chars.
    pub fn to_operation(&self, node_id: &str, len: usize) -> Operation {
        let span = |a: u8, b: u8| {
            let (a, b) = (scale(a, len), scale(b, len));
            (a.min(b), a.max(b))
        };
        match self {
            Self::Insert { at, text } => Operation::insert_text(node_id, scale(*at, len), text),
            Self::Delete { a, b } => {
                let (start, end) = span(*a, *b);
                Operation::delete_text(node_id, start, end)
            }
            Self::Replace { a, b, text } => {
                let (start, end) = span(*a, *b);
                Operation::replace_text(node_id, start, end, text)
            }
            Self::ApplyMark { a, b, mark_type } => {
                let (start, end) = span(*a, *b);
                Operation::apply_mark(node_id, mark_type, start, end)
            }
            Self::RemoveMark { a, b, mark_type } => {
                let (start, end) = span(*a, *b);
                Operation::remove_mark(node_id, mark_type, start, end)
            }
            Self::ToggleMark { a, b, mark_type } => {
                let (start, end) = span(*a, *b);
                Operation::toggle_mark(node_id, mark_type, start, end)
            }
        }
    }
}

fn scale(fraction: u8, len: usize) -> usize {
    usize::from(fraction) * len / usize::from(u8::MAX)
}

/// Strategy for one editing step.
pub fn edit_step_strategy() -> impl Strategy<Value = EditStep> {
    prop_oneof![
        (any::<u8>(), fragment_strategy()).prop_map(|(at, text)| EditStep::Insert { at, text }),
        (any::<u8>(), any::<u8>()).prop_map(|(a, b)| EditStep::Delete { a, b }),
        (any::<u8>(), any::<u8>(), fragment_strategy())
            .prop_map(|(a, b, text)| EditStep::Replace { a, b, text }),
        (any::<u8>(), any::<u8>(), mark_type_strategy())
            .prop_map(|(a, b, mark_type)| EditStep::ApplyMark { a, b, mark_type }),
        (any::<u8>(), any::<u8>(), mark_type_strategy())
            .prop_map(|(a, b, mark_type)| EditStep::RemoveMark { a, b, mark_type }),
        (any::<u8>(), any::<u8>(), mark_type_strategy())
            .prop_map(|(a, b, mark_type)| EditStep::ToggleMark { a, b, mark_type }),
    ]
}

/// Strategy for a sequence of editing steps.
pub fn edit_script_strategy(max_steps: usize) -> impl Strategy<Value = Vec<EditStep>> {
    prop::collection::vec(edit_step_strategy(), 1..=max_steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_covers_both_ends() {
        assert_eq!(scale(0, 11), 0);
        assert_eq!(scale(u8::MAX, 11), 11);
        assert_eq!(scale(u8::MAX, 0), 0);
    }

    #[test]
    fn steps_resolve_in_range() {
        let step = EditStep::Delete { a: 200, b: 10 };
        assert_eq!(step.to_operation("t1", 10), Operation::delete_text("t1", 0, 7));
    }

    proptest! {
        #[test]
        fn generated_marks_fit_the_text((text, marks) in leaf_strategy()) {
            let len = char_len(&text);
            for mark in marks {
                prop_assert!(mark.range.start < mark.range.end);
                prop_assert!(mark.range.end <= len);
            }
        }
    }
}
