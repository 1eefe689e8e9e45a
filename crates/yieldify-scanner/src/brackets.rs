//! Bracket matching over placeholder-protected text.
//!
//! The matcher has no notion of strings or comments. Callers run it on text
//! whose literals were already swapped for placeholders, otherwise brackets
//! inside a string would be counted.

use memchr::memchr2_iter;

/// Bracket pairs the rewriter matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bracket {
    Paren,
    Brace,
    Square,
    Angle,
}

impl Bracket {
    pub const fn open(self) -> u8 {
        match self {
            Bracket::Paren => b'(',
            Bracket::Brace => b'{',
            Bracket::Square => b'[',
            Bracket::Angle => b'<',
        }
    }

    pub const fn close(self) -> u8 {
        match self {
            Bracket::Paren => b')',
            Bracket::Brace => b'}',
            Bracket::Square => b']',
            Bracket::Angle => b'>',
        }
    }

    pub fn from_open(byte: u8) -> Option<Self> {
        match byte {
            b'(' => Some(Bracket::Paren),
            b'{' => Some(Bracket::Brace),
            b'[' => Some(Bracket::Square),
            b'<' => Some(Bracket::Angle),
            _ => None,
        }
    }

    pub fn from_close(byte: u8) -> Option<Self> {
        match byte {
            b')' => Some(Bracket::Paren),
            b'}' => Some(Bracket::Brace),
            b']' => Some(Bracket::Square),
            b'>' => Some(Bracket::Angle),
            _ => None,
        }
    }
}

/// Find the `nth` closing `bracket` that is not balanced by an opening one.
///
/// Scanning starts at byte offset `start`. Every opening bracket of the same
/// kind raises the depth and every closing one lowers it; a closing bracket
/// met at depth 0 counts towards `nth`. Returns the byte offset of the
/// closing bracket, or `None` if the text runs out first. An `nth` of 0 is
/// treated as 1.
///
/// ```
/// use yieldify_scanner::{Bracket, find_closing_bracket};
///
/// // "a(b)c)" - the first unbalanced ')' is at offset 5
/// assert_eq!(find_closing_bracket("a(b)c)", Bracket::Paren, 1, 0), Some(5));
/// ```
pub fn find_closing_bracket(text: &str, bracket: Bracket, nth: usize, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if start > bytes.len() {
        return None;
    }

    let open = bracket.open();
    let close = bracket.close();
    let mut remaining = nth.max(1);
    let mut depth = 0usize;

    for rel in memchr2_iter(open, close, &bytes[start..]) {
        let pos = start + rel;
        if bytes[pos] == open {
            depth += 1;
        } else if depth == 0 {
            remaining -= 1;
            if remaining == 0 {
                return Some(pos);
            }
        } else {
            depth -= 1;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_text_finds_first_unmatched() {
        assert_eq!(find_closing_bracket("foo(bar(1), 2))", Bracket::Paren, 1, 0), Some(14));
        assert_eq!(find_closing_bracket(" a { b } }", Bracket::Brace, 1, 0), Some(9));
    }

    #[test]
    fn test_nth_counts_depth_zero_closers() {
        // "a()) .b()) tail" - second unbalanced ')' sits after ".b()"
        let text = "a()).b())";
        assert_eq!(find_closing_bracket(text, Bracket::Paren, 1, 0), Some(3));
        assert_eq!(find_closing_bracket(text, Bracket::Paren, 2, 0), Some(8));
    }

    #[test]
    fn test_start_offset_is_respected() {
        let text = "{ x } { y }";
        assert_eq!(find_closing_bracket(text, Bracket::Brace, 1, 7), Some(10));
    }

    #[test]
    fn test_unmatched_opening_bracket_is_not_found() {
        assert_eq!(find_closing_bracket("f(g(x)", Bracket::Paren, 1, 2), None);
        assert_eq!(find_closing_bracket("[[]", Bracket::Square, 1, 0), None);
    }

    #[test]
    fn test_other_bracket_kinds_are_ignored() {
        assert_eq!(find_closing_bracket("a[b(c]d)", Bracket::Square, 1, 2), Some(5));
    }

    #[test]
    fn test_start_past_end() {
        assert_eq!(find_closing_bracket("()", Bracket::Paren, 1, 10), None);
    }
}
