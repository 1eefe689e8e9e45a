//! Literal spans produced by the scanner.

use serde::{Deserialize, Serialize};

/// Quote character that opened a string literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quote {
    Single,
    Double,
    Backtick,
}

impl Quote {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'\'' => Some(Quote::Single),
            b'"' => Some(Quote::Double),
            b'`' => Some(Quote::Backtick),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
            Quote::Backtick => '`',
        }
    }
}

/// What a span of source text is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpanKind {
    StringLiteral(Quote),
    /// `// ...` up to, not including, the line terminator.
    Comment,
    /// `/* ... */`, non-nesting.
    BlockComment,
    /// `/.../` without its flags.
    Regex,
}

/// A classified region of source text.
///
/// `start..end` is a half-open byte range. Spans returned by [`crate::scan`]
/// never overlap and are sorted by `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub kind: SpanKind,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(kind: SpanKind, start: usize, end: usize) -> Self {
        Span {
            kind,
            start: start as u32,
            end: end as u32,
        }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Get the span text from source.
    pub fn get_text<'a>(&self, source: &'a str) -> &'a str {
        let start = self.start as usize;
        let end = self.end as usize;
        if end <= source.len() && start < end {
            &source[start..end]
        } else {
            ""
        }
    }
}
