//! Word-boundary and terminator logic for recognizing tokens in plain text.
//!
//! The tokenizer is a pure text-scanning collaborator: it knows where the
//! "word" around an offset starts and ends and how to terminate a finished
//! token, but nothing about markers or chips.

/// The separator that sits between a chip and its neighbors.
///
/// Invariant maintained by the engine: exactly one separator between any two
/// adjacent markers, and between a marker and free-typed text.
pub const SEPARATOR: char = ' ';

/// Boundary-finding and termination logic for plain-text tokens.
///
/// Offsets are byte offsets into `text` and are always on `char`
/// boundaries; implementations clamp rather than panic on out-of-range
/// input.
pub trait Tokenizer {
    /// Byte offset where the token around `offset` starts.
    fn find_token_start(&self, text: &str, offset: usize) -> usize;

    /// Byte offset just past the end of the token around `offset`.
    fn find_token_end(&self, text: &str, offset: usize) -> usize;

    /// Append the trailing separator to a finished token's display text.
    fn terminate_token(&self, text: &str) -> String;
}

/// Tokenizer for address-style input: tokens are runs of text delimited by
/// the separator or commas.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressTokenizer;

impl AddressTokenizer {
    /// Create a new address tokenizer.
    pub fn new() -> Self {
        Self
    }

    fn is_delimiter(c: char) -> bool {
        c == SEPARATOR || c == ',' || c == '\n'
    }
}

impl Tokenizer for AddressTokenizer {
    fn find_token_start(&self, text: &str, offset: usize) -> usize {
        let offset = clamp_to_char_boundary(text, offset);
        let mut start = offset;
        for (i, c) in text[..offset].char_indices().rev() {
            if Self::is_delimiter(c) {
                break;
            }
            start = i;
        }
        start
    }

    fn find_token_end(&self, text: &str, offset: usize) -> usize {
        let offset = clamp_to_char_boundary(text, offset);
        for (i, c) in text[offset..].char_indices() {
            if Self::is_delimiter(c) {
                return offset + i;
            }
        }
        text.len()
    }

    fn terminate_token(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 1);
        out.push_str(text.trim_end_matches(SEPARATOR));
        out.push(SEPARATOR);
        out
    }
}

/// Clamp a byte offset to the nearest preceding `char` boundary.
pub(crate) fn clamp_to_char_boundary(text: &str, mut offset: usize) -> usize {
    if offset >= text.len() {
        return text.len();
    }
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_boundaries() {
        let t = AddressTokenizer::new();
        let text = "alice@example.com bob@exa";

        // Cursor in the middle of the second word.
        assert_eq!(t.find_token_start(text, 20), 18);
        assert_eq!(t.find_token_end(text, 20), text.len());

        // Cursor in the first word.
        assert_eq!(t.find_token_start(text, 5), 0);
        assert_eq!(t.find_token_end(text, 5), 17);
    }

    #[test]
    fn test_boundaries_at_edges() {
        let t = AddressTokenizer::new();
        assert_eq!(t.find_token_start("", 0), 0);
        assert_eq!(t.find_token_end("", 0), 0);
        assert_eq!(t.find_token_start("abc", 99), 0);
        assert_eq!(t.find_token_end("abc", 99), 3);
    }

    #[test]
    fn test_comma_is_a_delimiter() {
        let t = AddressTokenizer::new();
        let text = "a@b,c@d";
        assert_eq!(t.find_token_start(text, 6), 4);
        assert_eq!(t.find_token_end(text, 1), 3);
    }

    #[test]
    fn test_terminate_appends_single_separator() {
        let t = AddressTokenizer::new();
        assert_eq!(t.terminate_token("alice@example.com"), "alice@example.com ");
        // Already-terminated text does not grow a second separator.
        assert_eq!(t.terminate_token("alice@example.com "), "alice@example.com ");
    }

    #[test]
    fn test_multibyte_clamping() {
        let t = AddressTokenizer::new();
        let text = "héllo wörld";
        // Offset 2 is inside 'é'; must not panic and must stay consistent.
        let start = t.find_token_start(text, 2);
        assert_eq!(start, 0);
        let end = t.find_token_end(text, 2);
        assert_eq!(&text[start..end], "héllo");
    }
}
