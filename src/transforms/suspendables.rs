//! Suspendable function rewriting.
//!
//! A suspendable function is a generator (`function*`, `*method()`) or an
//! `async` function, arrow or method. Each one is replaced by an expression
//! that hands a generator to the runtime's trampoline:
//!
//! ```javascript
//! function* load(a) { return fetch(a) }
//! // becomes
//! var load = Yieldify.runGenerator(function*(a) { return (yield fetch(a)) });
//! ```
//!
//! Async arrows are bound to the enclosing `this`. Class methods are handled
//! by the class pass, which keeps them as methods.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use yieldify_scanner::{Bracket, PlaceholderMap, TokenFamily, decode, find_closing_bracket};

use super::functions::{Body, concise_body_end};
use super::{Pass, Rewriter, in_expression_position, is_ident_byte, prev_significant, skip_ws};

static FUNCTION_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[^\w$.])(?P<head>(?:(?P<async>async)\s+)?function\b\s*(?P<star>\*)?\s*(?P<name>[A-Za-z_$][\w$]*)?\s*\()",
    )
    .expect("suspendable function regex")
});

static ASYNC_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\w$.])(async)\b\s*").expect("async regex"));

static OBJECT_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:^|[^\w$.])(?P<head>(?:(?P<async>async)\s+)?(?P<star>\*)?\s*(?P<name>[A-Za-z_$][\w$]*|"[^"\n]*"|'[^'\n]*')\s*\()"#,
    )
    .expect("object method regex")
});

/// Explicit suspension keyword at a word boundary.
static EXPLICIT_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\w$.])(?:yield|await)(?:\s|\(|\*)").expect("marker regex")
});

#[derive(Clone, Debug, PartialEq, Eq)]
enum Form {
    /// `function* name() {}` as a statement: bound with `var name = ...`.
    Declaration(String),
    /// `function* name() {}` as a value: the name stays on the generator.
    NamedExpression(String),
    Anonymous,
    Arrow,
    /// `*name() {}` or `async name() {}` in an object literal.
    Method(String),
}

#[derive(Clone, Debug)]
struct Candidate {
    start: usize,
    form: Form,
    /// Parameter text without the surrounding parentheses.
    params: Range<usize>,
    /// Text between the parameter list and the body.
    gap: Range<usize>,
    body: Body,
}

impl Rewriter<'_> {
    /// Rewrite every suspendable function in `text`.
    pub(crate) fn rewrite_suspendables(&mut self, text: &str) -> String {
        let (text, map) = self.protect_suspendables(text);
        decode(&text, map)
    }

    /// Rewrite the body of a suspendable function: nested suspendable
    /// functions first, then suspension markers on every call, unless the
    /// author already wrote their own `yield`/`await` markers.
    pub(crate) fn rewrite_body(&mut self, body: &str) -> String {
        if !self.enter() {
            return body.to_string();
        }

        let (text, nested) = self.protect_suspendables(body);
        let text = if EXPLICIT_MARKER.is_match(&text) {
            text
        } else {
            self.insert_yields(&text)
        };

        self.depth -= 1;
        decode(&text, nested)
    }

    /// Replace every suspendable function in `text` with a placeholder that
    /// stands for its rewritten form.
    fn protect_suspendables(&mut self, text: &str) -> (String, PlaceholderMap) {
        let mut map = PlaceholderMap::new();
        let mut out = String::with_capacity(text.len());
        let mut offset = 0;
        let mut cached: [Option<Candidate>; 3] = [None, None, None];

        loop {
            for (kind, slot) in cached.iter_mut().enumerate() {
                if slot.as_ref().is_none_or(|c| c.start < offset) {
                    *slot = match kind {
                        0 => next_function(text, offset),
                        1 => next_async_arrow(text, offset),
                        _ => next_object_method(text, offset),
                    };
                }
            }
            let Some(candidate) = cached.iter().flatten().min_by_key(|c| c.start).cloned() else {
                break;
            };

            let (content, end) = self.rewrite_candidate(text, &candidate);
            let token = self.token(TokenFamily::Suspendable);
            out.push_str(&text[offset..candidate.start]);
            out.push_str(&token);
            map.insert(token, content);
            offset = end;
        }

        out.push_str(&text[offset..]);
        (out, map)
    }

    fn rewrite_candidate(&mut self, text: &str, candidate: &Candidate) -> (String, usize) {
        let (body, end) = match candidate.body {
            Body::Block(open) => {
                let close =
                    self.closing_or_end(Pass::Suspendables, text, Bracket::Brace, 1, open + 1);
                (self.rewrite_body(&text[open + 1..close]), (close + 1).min(text.len()))
            }
            Body::Expression(start) => {
                let end = concise_body_end(text, start);
                let statement = format!(" return {} ", text[start..end].trim());
                (self.rewrite_body(&statement), end)
            }
        };

        let params = &text[candidate.params.clone()];
        let gap = &text[candidate.gap.clone()];
        let prefix = self.prefix;
        let content = match &candidate.form {
            Form::Declaration(name) => format!("var {name} = {prefix}{params}){gap}{{{body}}});"),
            Form::NamedExpression(name) => format!(
                "{}.runGenerator(function* {name}({params}){gap}{{{body}}})",
                self.runtime
            ),
            Form::Anonymous => format!("{prefix}{params}){gap}{{{body}}})"),
            Form::Arrow => format!("{prefix}{params}) {{{body}}}).bind(this)"),
            Form::Method(name) => format!("{name}: {prefix}{params}){gap}{{{body}}})"),
        };
        debug!(form = ?candidate.form, start = candidate.start, "rewrote suspendable function");
        (content, end)
    }
}

/// `function*` or `async function`, named or not.
fn next_function(text: &str, from: usize) -> Option<Candidate> {
    let mut at = from;
    while let Some(caps) = FUNCTION_HEAD.captures_at(text, at) {
        let head = caps.name("head")?;
        at = head.end();
        if caps.name("async").is_none() && caps.name("star").is_none() {
            continue;
        }

        let Some(params_close) = find_closing_bracket(text, Bracket::Paren, 1, head.end()) else {
            continue;
        };
        let open = skip_ws(text, params_close + 1);
        if text.as_bytes().get(open) != Some(&b'{') {
            continue;
        }

        let form = match caps.name("name").map(|m| m.as_str().to_string()) {
            Some(name) if in_expression_position(text, head.start()) => Form::NamedExpression(name),
            Some(name) => Form::Declaration(name),
            None => Form::Anonymous,
        };
        return Some(Candidate {
            start: head.start(),
            form,
            params: head.end()..params_close,
            gap: params_close + 1..open,
            body: Body::Block(open),
        });
    }
    None
}

/// `async (params) => ...` or `async param => ...`.
fn next_async_arrow(text: &str, from: usize) -> Option<Candidate> {
    let bytes = text.as_bytes();
    let mut at = from;
    while let Some(caps) = ASYNC_KEYWORD.captures_at(text, at) {
        let keyword = caps.get(1)?;
        let whole = caps.get(0)?;
        at = whole.end();

        let (params, after) = match bytes.get(whole.end()) {
            Some(b'(') => {
                let Some(close) = find_closing_bracket(text, Bracket::Paren, 1, whole.end() + 1)
                else {
                    continue;
                };
                (whole.end() + 1..close, close + 1)
            }
            Some(&b) if is_ident_byte(b) && !b.is_ascii_digit() => {
                let mut end = whole.end();
                while end < bytes.len() && is_ident_byte(bytes[end]) {
                    end += 1;
                }
                if &text[whole.end()..end] == "function" {
                    continue;
                }
                (whole.end()..end, end)
            }
            _ => continue,
        };

        let arrow = skip_ws(text, after);
        if !text[arrow..].starts_with("=>") {
            continue;
        }
        let body = skip_ws(text, arrow + 2);
        let body = if bytes.get(body) == Some(&b'{') {
            Body::Block(body)
        } else {
            Body::Expression(body)
        };
        return Some(Candidate {
            start: keyword.start(),
            form: Form::Arrow,
            params,
            gap: after..after,
            body,
        });
    }
    None
}

/// `*name() {` or `async name() {` directly inside an object literal.
fn next_object_method(text: &str, from: usize) -> Option<Candidate> {
    let mut at = from;
    while let Some(caps) = OBJECT_METHOD.captures_at(text, at) {
        let head = caps.name("head")?;
        let name = caps.name("name")?;
        at = head.end();

        if caps.name("async").is_none() && caps.name("star").is_none() {
            continue;
        }
        if name.as_str() == "function" {
            continue;
        }
        if !matches!(prev_significant(text, head.start()), Some((_, b'{' | b','))) {
            continue;
        }

        let Some(params_close) = find_closing_bracket(text, Bracket::Paren, 1, head.end()) else {
            continue;
        };
        let open = skip_ws(text, params_close + 1);
        if text.as_bytes().get(open) != Some(&b'{') {
            continue;
        }
        return Some(Candidate {
            start: head.start(),
            form: Form::Method(name.as_str().to_string()),
            params: head.end()..params_close,
            gap: params_close + 1..open,
            body: Body::Block(open),
        });
    }
    None
}
