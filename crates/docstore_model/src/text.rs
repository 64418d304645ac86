//! Char-offset text helpers.
//!
//! Node text is addressed in `char` offsets. These helpers translate those
//! offsets into byte positions so callers never slice inside a code point.

/// Returns the number of chars in `text`.
#[inline]
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Returns the byte index of the char at `offset`.
///
/// An offset equal to the char length maps to `text.len()`. Offsets past the
/// end are clamped to `text.len()`.
#[must_use]
pub fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

/// Returns the chars in `[start, end)` as an owned string.
#[must_use]
pub fn char_slice(text: &str, start: usize, end: usize) -> String {
    if end <= start {
        return String::new();
    }
    let from = byte_index(text, start);
    let to = byte_index(text, end);
    text[from..to].to_string()
}

/// Replaces the chars in `[start, end)` with `insert`.
///
/// Returns the new text and the removed chars.
#[must_use]
pub fn splice_chars(text: &str, start: usize, end: usize, insert: &str) -> (String, String) {
    let from = byte_index(text, start);
    let to = byte_index(text, end.max(start));
    let mut out = String::with_capacity(text.len() - (to - from) + insert.len());
    out.push_str(&text[..from]);
    out.push_str(insert);
    out.push_str(&text[to..]);
    (out, text[from..to].to_string())
}

/// Splits `text` at char `offset` into `(left, right)`.
#[must_use]
pub fn split_chars(text: &str, offset: usize) -> (String, String) {
    let at = byte_index(text, offset);
    (text[..at].to_string(), text[at..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_offsets() {
        assert_eq!(char_len("Hello"), 5);
        assert_eq!(char_slice("Hello World", 6, 11), "World");
    }

    #[test]
    fn multibyte_offsets() {
        let text = "héllo wörld";
        assert_eq!(char_len(text), 11);
        assert_eq!(char_slice(text, 1, 2), "é");
        assert_eq!(byte_index(text, 2), 3);
    }

    #[test]
    fn splice_returns_removed() {
        let (out, removed) = splice_chars("Hello World", 5, 6, "");
        assert_eq!(out, "HelloWorld");
        assert_eq!(removed, " ");

        let (out, removed) = splice_chars("Hello World", 6, 6, "Beautiful ");
        assert_eq!(out, "Hello Beautiful World");
        assert!(removed.is_empty());
    }

    #[test]
    fn split_at_edges() {
        assert_eq!(split_chars("abc", 0), (String::new(), "abc".to_string()));
        assert_eq!(split_chars("abc", 3), ("abc".to_string(), String::new()));
        assert_eq!(split_chars("ñandú", 2), ("ña".to_string(), "ndú".to_string()));
    }
}
