//! Ordinary function protection.
//!
//! Calls inside a plain function, arrow or method shorthand run when that
//! function is called, not when the enclosing suspendable routine reaches
//! them, so they must never receive suspension markers from an enclosing
//! body. Each such function is swapped for a placeholder. Its body is still
//! rewritten as a region of its own, which picks up any suspendable functions
//! declared inside it.
//!
//! Generator functions, `async` functions and `async` arrows are left alone
//! here; they belong to the suspendable pass.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use yieldify_common::keywords::{
    is_block_statement_head, is_method_modifier, is_non_call_keyword, is_operand_keyword,
};
use yieldify_scanner::{Bracket, PlaceholderMap, TokenFamily, find_closing_bracket};

use super::{Pass, Rewriter, find_opening_bracket, is_ident_byte, prev_significant, prev_word, skip_ws};

static FUNCTION_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\w$.])(function)\b\s*(?:[A-Za-z_$][\w$]*)?\s*\(").expect("function regex")
});

static METHOD_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_$][\w$]*)\s*\(").expect("method regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Body {
    /// `{` at this offset.
    Block(usize),
    /// Concise arrow body starting at this offset.
    Expression(usize),
}

#[derive(Clone, Copy, Debug)]
struct Head {
    start: usize,
    body: Body,
}

impl Rewriter<'_> {
    /// Replace every ordinary function in `text` with a placeholder.
    pub(crate) fn protect_functions(&mut self, text: &str) -> (String, PlaceholderMap) {
        let mut map = PlaceholderMap::new();
        let mut out = String::with_capacity(text.len());
        let mut offset = 0;
        // Next candidate of each kind, reused while still ahead of `offset`.
        let mut cached: [Option<Head>; 3] = [None; 3];

        loop {
            for (kind, slot) in cached.iter_mut().enumerate() {
                if slot.is_none_or(|head| head.start < offset) {
                    *slot = match kind {
                        0 => next_function_head(text, offset),
                        1 => next_arrow_head(text, offset),
                        _ => next_method_head(text, offset),
                    };
                }
            }
            let Some(head) = cached.iter().flatten().min_by_key(|h| h.start).copied() else {
                break;
            };

            let (content, end) = match head.body {
                Body::Block(open) => {
                    let close = self.closing_or_end(Pass::Functions, text, Bracket::Brace, 1, open + 1);
                    let inner = self.transform_region(&text[open + 1..close]);
                    let tail = if close < text.len() { "}" } else { "" };
                    (
                        format!("{}{}{}", &text[head.start..=open], inner, tail),
                        (close + 1).min(text.len()),
                    )
                }
                Body::Expression(start) => {
                    let end = concise_body_end(text, start);
                    let inner = self.transform_region(&text[start..end]);
                    (format!("{}{}", &text[head.start..start], inner), end)
                }
            };

            let token = self.token(TokenFamily::Function);
            trace!(%token, start = head.start, "protected function");
            out.push_str(&text[offset..head.start]);
            out.push_str(&token);
            map.insert(token, content);
            offset = end;
        }

        out.push_str(&text[offset..]);
        (out, map)
    }
}

/// `function name(params) {` that is not a generator and not `async`.
fn next_function_head(text: &str, from: usize) -> Option<Head> {
    let mut at = from;
    while let Some(caps) = FUNCTION_HEAD.captures_at(text, at) {
        let whole = caps.get(0)?;
        let keyword = caps.get(1)?;
        at = whole.end();

        if matches!(prev_word(text, keyword.start()), Some((_, "async"))) {
            continue;
        }
        if let Some(open) = block_after_params(text, whole.end()) {
            return Some(Head {
                start: keyword.start(),
                body: Body::Block(open),
            });
        }
    }
    None
}

/// `(params) => ...` or `param => ...` that is not `async`.
fn next_arrow_head(text: &str, from: usize) -> Option<Head> {
    let mut at = from;
    while let Some(rel) = text.get(at..)?.find("=>") {
        let arrow = at + rel;
        at = arrow + 2;

        let Some((last, b)) = prev_significant(text, arrow) else {
            continue;
        };
        let start = if b == b')' {
            match find_opening_bracket(text, Bracket::Paren, last) {
                Some(open) => open,
                None => continue,
            }
        } else if is_ident_byte(b) {
            match prev_word(text, arrow) {
                Some((start, _)) => start,
                None => continue,
            }
        } else {
            continue;
        };

        if start < from || matches!(prev_word(text, start), Some((_, "async"))) {
            continue;
        }

        let body = skip_ws(text, arrow + 2);
        let body = if text.as_bytes().get(body) == Some(&b'{') {
            Body::Block(body)
        } else {
            Body::Expression(body)
        };
        return Some(Head { start, body });
    }
    None
}

/// `name(params) {` in a class body or object literal, optionally preceded by
/// `get`, `set` or `static`.
fn next_method_head(text: &str, from: usize) -> Option<Head> {
    let bytes = text.as_bytes();
    let mut at = from;
    while let Some(caps) = METHOD_HEAD.captures_at(text, at) {
        let whole = caps.get(0)?;
        let name = caps.get(1)?;
        at = whole.end();

        if name.start() > 0 && (is_ident_byte(bytes[name.start() - 1]) || bytes[name.start() - 1] == b'.') {
            continue;
        }
        let word = name.as_str();
        if is_block_statement_head(word) || is_non_call_keyword(word) || is_operand_keyword(word) {
            continue;
        }

        let mut start = name.start();
        while let Some((word_start, word)) = prev_word(text, start) {
            if !is_method_modifier(word) {
                break;
            }
            start = word_start;
        }
        if !matches!(prev_significant(text, start), None | Some((_, b'{' | b'}' | b';' | b','))) {
            continue;
        }

        if let Some(open) = block_after_params(text, whole.end()) {
            return Some(Head {
                start,
                body: Body::Block(open),
            });
        }
    }
    None
}

/// Given the offset right after a parameter list's `(`, the offset of the
/// body's `{` if one follows the list.
fn block_after_params(text: &str, params: usize) -> Option<usize> {
    let close = find_closing_bracket(text, Bracket::Paren, 1, params)?;
    let open = skip_ws(text, close + 1);
    (text.as_bytes().get(open) == Some(&b'{')).then_some(open)
}

/// End of a concise arrow body: the first top-level `,` `;` or line break, or
/// a closing bracket that belongs to the surrounding code.
pub(crate) fn concise_body_end(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                if depth == 0 {
                    return i;
                }
                depth -= 1;
            }
            b',' | b';' | b'\n' | b'\r' if depth == 0 => return i,
            _ => {}
        }
    }
    bytes.len()
}
