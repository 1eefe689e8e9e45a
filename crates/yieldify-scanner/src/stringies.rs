//! Stringies: string, comment and regex literal detection.
//!
//! The rewriter matches calls and function heads with plain text patterns, so
//! anything inside a literal must be hidden first. `scan` finds those literal
//! spans in one left-to-right pass; `encode` swaps each one for a placeholder
//! that keeps the literal's delimiters, so the surrounding code still reads
//! the same to later passes (a string is still a string, a comment still
//! ends the line).
//!
//! # Regex versus division
//!
//! A `/` that is not a comment opener starts a regex only when the last
//! significant character before it is one of `( = { [ : | & ! > < + -`.
//! Anything else (an identifier, a number, a closing bracket) makes it a
//! division operator. A candidate regex that reaches a line break before its
//! closing `/` is dropped and the `/` is treated as division.

use crate::placeholder::{KeyGen, PlaceholderMap, TokenFamily};
use crate::span::{Quote, Span, SpanKind};

/// Characters after which a `/` opens a regex literal.
const REGEX_CONTEXT: &[u8] = b"(={[:|&!><+-";

/// Scanner position state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Code,
    LineComment,
    BlockComment,
    String(Quote, u8),
    Regex,
}

/// Classify all string, comment and regex spans in `source`.
///
/// Spans are returned in order and never overlap: while a span is open,
/// nothing inside it can start another one. Empty string literals (`''`) are
/// not recorded.
pub fn scan(source: &str) -> Vec<Span> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut spans = Vec::new();

    let mut mode = Mode::Code;
    let mut start = 0usize;
    let mut prev_symbol = b'(';
    let mut escaped = false;
    let mut in_class = false;
    let mut i = 0usize;

    while i < len {
        let ch = bytes[i];
        match mode {
            Mode::Code => {
                if ch == b'/' {
                    let next = bytes.get(i + 1).copied();
                    if next == Some(b'/') {
                        mode = Mode::LineComment;
                        start = i;
                        i += 2;
                        continue;
                    }
                    if next == Some(b'*') {
                        mode = Mode::BlockComment;
                        start = i;
                        i += 2;
                        continue;
                    }
                    if REGEX_CONTEXT.contains(&prev_symbol) {
                        mode = Mode::Regex;
                        start = i;
                        escaped = false;
                        in_class = false;
                    } else {
                        prev_symbol = ch;
                    }
                } else if let Some(quote) = Quote::from_byte(ch) {
                    mode = Mode::String(quote, ch);
                    start = i;
                    escaped = false;
                    prev_symbol = ch;
                } else if !ch.is_ascii_whitespace() {
                    prev_symbol = ch;
                }
            }
            Mode::LineComment => {
                if ch == b'\n' || ch == b'\r' {
                    spans.push(Span::new(SpanKind::Comment, start, i));
                    mode = Mode::Code;
                    // The line break itself is code.
                    continue;
                }
            }
            Mode::BlockComment => {
                if ch == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    spans.push(Span::new(SpanKind::BlockComment, start, i + 2));
                    mode = Mode::Code;
                    i += 2;
                    continue;
                }
            }
            Mode::String(quote, delimiter) => {
                if escaped {
                    escaped = false;
                } else if ch == b'\\' {
                    escaped = true;
                } else if ch == delimiter {
                    if i + 1 - start > 2 {
                        spans.push(Span::new(SpanKind::StringLiteral(quote), start, i + 1));
                    }
                    mode = Mode::Code;
                }
            }
            Mode::Regex => {
                if escaped {
                    escaped = false;
                } else if ch == b'\\' {
                    escaped = true;
                } else if ch == b'\n' || ch == b'\r' {
                    // Not a regex after all: resume right after the slash as division.
                    mode = Mode::Code;
                    prev_symbol = b'/';
                    i = start + 1;
                    continue;
                } else if in_class {
                    if ch == b']' {
                        in_class = false;
                    }
                } else if ch == b'[' {
                    in_class = true;
                } else if ch == b'/' && i > start {
                    // Flags belong to the literal: `/re/gi`.
                    let mut end = i + 1;
                    while end < len && bytes[end].is_ascii_alphabetic() {
                        end += 1;
                    }
                    spans.push(Span::new(SpanKind::Regex, start, end));
                    mode = Mode::Code;
                    // A regex is an operand; a `/` right after it divides.
                    prev_symbol = b')';
                    i = end;
                    continue;
                }
            }
        }
        i += 1;
    }

    match mode {
        Mode::LineComment => spans.push(Span::new(SpanKind::Comment, start, len)),
        Mode::BlockComment => spans.push(Span::new(SpanKind::BlockComment, start, len)),
        _ => {}
    }

    spans
}

/// Result of [`encode`].
#[derive(Clone, Debug)]
pub struct Encoded {
    pub spans: Vec<Span>,
    pub map: PlaceholderMap,
    pub text: String,
}

/// Replace every literal span with a placeholder token.
///
/// The token keeps the span's delimiters: `"…"` stays a double-quoted string,
/// `/*…*/` a block comment, `/…/` a regex (flags included in the literal). Tokens are recorded in the map in
/// the order they appear, which is what [`crate::decode`] requires.
pub fn encode(source: &str, keys: &mut KeyGen) -> Encoded {
    let spans = scan(source);
    let mut map = PlaceholderMap::new();

    if spans.is_empty() {
        return Encoded {
            spans,
            map,
            text: source.to_string(),
        };
    }

    let mut text = String::with_capacity(source.len());
    let mut last = 0usize;

    for span in &spans {
        let key = keys.next_token(TokenFamily::Literal);
        let word = match span.kind {
            SpanKind::Comment => format!("//{key}"),
            SpanKind::BlockComment => format!("/*{key}*/"),
            SpanKind::StringLiteral(quote) => {
                let q = quote.as_char();
                format!("{q}{key}{q}")
            }
            SpanKind::Regex => format!("/{key}/"),
        };

        text.push_str(&source[last..span.start as usize]);
        text.push_str(&word);
        map.insert(word, span.get_text(source));
        last = span.end as usize;
    }

    text.push_str(&source[last..]);

    Encoded { spans, map, text }
}
