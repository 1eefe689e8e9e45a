//! Source Rewriting
//!
//! This module turns generator-style JavaScript into code where every call
//! inside a suspendable function is a suspension point, ready to be driven by
//! the trampoline in `yieldify-runtime`.
//!
//! # Architecture
//!
//! There is no syntax tree. Each pass finds the constructs it cares about with
//! patterns and bracket counting, and hides what it has handled behind a
//! placeholder token so that later passes cannot see into it:
//!
//! 1. Literals, comments and regexes are encoded first (`yieldify_scanner`).
//! 2. Ordinary functions, arrows and method shorthands ([`functions`]) are
//!    hidden; their bodies are rewritten recursively as regions of their own,
//!    so suspendable functions nested inside them are still found.
//! 3. Literal-keyed index chains such as `obj["key"]` ([`index_access`]).
//! 4. Classes ([`classes`]); generator and async methods are rewritten in
//!    place and registered for wrapping after the class.
//! 5. Suspendable functions ([`suspendables`]) are rewritten, and their
//!    bodies get suspension markers ([`yields`]).
//!
//! Placeholders are restored in reverse order. Every token is a plain
//! identifier, so a hidden region reads as an opaque expression to whatever
//! pass runs over the surrounding text.
//!
//! # Failure policy
//!
//! Rewriting never fails. When a closing bracket cannot be found the pass
//! records a [`TransformDiagnostic`], logs a warning and carries on with the
//! rest of the text.

mod classes;
mod functions;
mod index_access;
mod suspendables;
mod yields;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, debug_span, warn};

use yieldify_common::limits::MAX_REGION_DEPTH;
use yieldify_scanner::{
    Bracket, KeyGen, PlaceholderMap, TokenFamily, decode, encode, find_closing_bracket,
};

use crate::config::TransformOptions;

/// The pass that produced a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Pass {
    Functions,
    IndexChains,
    Classes,
    Suspendables,
    Yields,
    Chains,
    Depth,
}

/// A problem the rewriter worked around.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransformDiagnostic {
    pub pass: Pass,
    pub message: String,
}

/// Result of [`transform`].
#[derive(Clone, Debug, Serialize)]
pub struct TransformOutput {
    pub code: String,
    pub diagnostics: Vec<TransformDiagnostic>,
}

/// Rewrite `source` with default options.
pub fn transform(source: &str) -> TransformOutput {
    transform_with_options(source, &TransformOptions::default())
}

/// Rewrite `source`.
///
/// ```
/// use yieldify::config::TransformOptions;
/// use yieldify::transforms::transform_with_options;
///
/// let options = TransformOptions { seed: Some(1), ..TransformOptions::default() };
/// let out = transform_with_options("function* f() { return g() }", &options);
/// assert_eq!(
///     out.code,
///     "var f = Yieldify.runGenerator(function*() { return (yield g()) });"
/// );
/// ```
pub fn transform_with_options(source: &str, options: &TransformOptions) -> TransformOutput {
    let _span = debug_span!("transform", len = source.len()).entered();

    let mut keys = options.seed.map_or_else(KeyGen::from_clock, KeyGen::new);
    let prefix = options.invocation_prefix();

    let encoded = encode(source, &mut keys);
    debug!(literals = encoded.map.len(), "literals protected");

    // Code that was already rewritten must not be matched as a generator again.
    let sentinel = keys.next_token(TokenFamily::Sentinel);
    let text = encoded.text.replace(&prefix, &sentinel);

    let mut rewriter = Rewriter::new(keys, &options.runtime_name, &prefix, &encoded.map);
    let text = rewriter.transform_region(&text);
    let diagnostics = rewriter.into_diagnostics();

    let text = text.replace(&sentinel, &prefix);
    let text = rename_await(&text);
    let code = decode(&text, encoded.map);

    TransformOutput { code, diagnostics }
}

static AWAIT_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\w$.])await(\s+|\()").expect("await regex"));

/// Rename the `await` keyword to `yield`. Literals must still be encoded.
fn rename_await(text: &str) -> String {
    AWAIT_KEYWORD.replace_all(text, "${1}yield${2}").into_owned()
}

/// Shared state of one transform run.
pub(crate) struct Rewriter<'a> {
    keys: KeyGen,
    runtime: &'a str,
    prefix: &'a str,
    literals: &'a PlaceholderMap,
    diagnostics: Vec<TransformDiagnostic>,
    depth: u32,
}

impl<'a> Rewriter<'a> {
    pub(crate) fn new(
        keys: KeyGen,
        runtime: &'a str,
        prefix: &'a str,
        literals: &'a PlaceholderMap,
    ) -> Self {
        Rewriter {
            keys,
            runtime,
            prefix,
            literals,
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    pub(crate) fn into_diagnostics(self) -> Vec<TransformDiagnostic> {
        self.diagnostics
    }

    /// Rewrite one region: a whole source unit or an ordinary function body.
    pub(crate) fn transform_region(&mut self, text: &str) -> String {
        if !self.enter() {
            return text.to_string();
        }

        let (text, functions) = self.protect_functions(text);
        let (text, indexes) = self.protect_index_chains(&text);
        let (text, classes) = self.protect_classes(&text);
        let text = self.rewrite_suspendables(&text);

        let text = decode(&text, classes);
        let text = decode(&text, indexes);
        let text = decode(&text, functions);

        self.depth -= 1;
        text
    }

    /// Step one level deeper, refusing past the nesting limit.
    fn enter(&mut self) -> bool {
        if self.depth >= MAX_REGION_DEPTH {
            self.diagnose(
                Pass::Depth,
                format!("nesting deeper than {MAX_REGION_DEPTH} levels, region left as is"),
            );
            return false;
        }
        self.depth += 1;
        true
    }

    fn token(&mut self, family: TokenFamily) -> String {
        self.keys.next_token(family)
    }

    fn diagnose(&mut self, pass: Pass, message: String) {
        warn!(?pass, "{message}");
        self.diagnostics.push(TransformDiagnostic { pass, message });
    }

    /// Offset of the closing bracket, or the end of `text` after recording a
    /// diagnostic.
    fn closing_or_end(
        &mut self,
        pass: Pass,
        text: &str,
        bracket: Bracket,
        nth: usize,
        start: usize,
    ) -> usize {
        match find_closing_bracket(text, bracket, nth, start) {
            Some(pos) => pos,
            None => {
                let snippet: String = text[start.min(text.len())..].chars().take(40).collect();
                self.diagnose(
                    pass,
                    format!(
                        "no closing '{}' after {:?}, using end of text",
                        bracket.close() as char,
                        self.literals.resolve(&snippet)
                    ),
                );
                text.len()
            }
        }
    }
}

// =============================================================================
// Text helpers
// =============================================================================

/// Identifier byte. Non-ASCII bytes count so that multi-byte characters are
/// never split.
pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

pub(crate) fn skip_ws(text: &str, mut pos: usize) -> usize {
    let bytes = text.as_bytes();
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Last non-whitespace byte before `pos`, with its offset.
pub(crate) fn prev_significant(text: &str, pos: usize) -> Option<(usize, u8)> {
    text.as_bytes()[..pos]
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|i| (i, text.as_bytes()[i]))
}

/// The identifier that ends right before `pos`, ignoring whitespace, and the
/// offset it starts at.
pub(crate) fn prev_word(text: &str, pos: usize) -> Option<(usize, &str)> {
    let (last, b) = prev_significant(text, pos)?;
    if !is_ident_byte(b) {
        return None;
    }
    let bytes = text.as_bytes();
    let mut start = last;
    while start > 0 && is_ident_byte(bytes[start - 1]) {
        start -= 1;
    }
    Some((start, &text[start..=last]))
}

/// Offset of the opening bracket matching the closing one at `close`.
pub(crate) fn find_opening_bracket(text: &str, bracket: Bracket, close: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for i in (0..close).rev() {
        if bytes[i] == bracket.close() {
            depth += 1;
        } else if bytes[i] == bracket.open() {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}

/// Whether the text before `pos` is an expression position, i.e. a function
/// or class starting at `pos` is a value rather than a declaration.
pub(crate) fn in_expression_position(text: &str, pos: usize) -> bool {
    if let Some((_, word)) = prev_word(text, pos) {
        return matches!(
            word,
            "return" | "yield" | "await" | "throw" | "typeof" | "void" | "default" | "new"
        );
    }
    matches!(
        prev_significant(text, pos),
        Some((_, b'=' | b'(' | b',' | b':' | b'?' | b'[' | b'!' | b'&' | b'|' | b'+' | b'-' | b'>'))
    )
}

/// Split an argument list at top-level commas.
pub(crate) fn split_arguments(args: &str) -> Vec<&str> {
    let bytes = args.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b',' if depth == 0 => {
                parts.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if !args.trim().is_empty() {
        parts.push(&args[start..]);
    }
    parts
}

/// A parenthesized integer marking the callback slot, e.g. `(0)`.
pub(crate) fn is_callback_sentinel(arg: &str) -> bool {
    let arg = arg.trim();
    arg.len() > 2
        && arg.starts_with('(')
        && arg.ends_with(')')
        && arg[1..arg.len() - 1].trim().bytes().all(|b| b.is_ascii_digit())
        && !arg[1..arg.len() - 1].trim().is_empty()
}

#[cfg(test)]
mod transform_tests;


#[cfg(test)]
mod functions_tests;

#[cfg(test)]
mod classes_tests;
