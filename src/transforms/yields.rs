//! Suspension marker insertion.
//!
//! Every call in a suspendable body becomes a suspension point by wrapping it
//! as `(yield call())`. The body has already been protected: literals,
//! ordinary functions, literal index chains, classes and nested suspendable
//! functions are all opaque identifier tokens by now.
//!
//! The work is split into four passes over the body:
//!
//! 1. [`Rewriter::initial_pass`] wraps every call, innermost first.
//! 2. [`Rewriter::chained_pass`] nests chains, so `a().b()` becomes
//!    `(yield (yield a()).b())`.
//! 3. [`cleanup_parameters`] drops markers that ended up in a parameter list.
//! 4. [`repair_statements`] adds the `;` that a line starting with `(` needs.
//!
//! A call that passes a parenthesized integer such as `(0)` in one of its
//! argument slots is a callback-style call. It is routed through the runtime's
//! `catchCallback` adapter instead, with the marker argument removed.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use yieldify_common::keywords::{is_condition_head, is_non_call_keyword, is_operand_keyword};
use yieldify_common::limits::MAX_CALL_NESTING_DEPTH;
use yieldify_scanner::{Bracket, find_closing_bracket};

use super::{
    Pass, Rewriter, is_callback_sentinel, is_ident_byte, prev_word, skip_ws, split_arguments,
};

/// Text every inserted marker starts with.
pub(crate) const MARK: &str = "(yield ";

/// `[foreword ]callee(` or `[foreword ]callee[`. `\w` is Unicode, like
/// `is_ident_byte`, so a non-ASCII identifier is never split.
static CALL_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:([\w$]+) )?([\w$.]*[\w$])([(\[])")
        .expect("call head regex")
});

static PARAMETER_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"function\b\s*\*?\s*[\w$]*\s*\(").expect("parameter list regex"));

/// Bytes after which a line continues the previous expression.
const CONTINUATION_BYTES: &[u8] = b";,.:+-*/={[(<>&|?!%~^";

/// `.name(` or `.name[...](` following a call.
struct MemberLink<'t> {
    name: &'t str,
    /// Whether the member is indexed, as in `.handlers[i](x)`.
    indexed: bool,
    /// Offset of the `(` opening the arguments.
    args_open: usize,
}

impl Rewriter<'_> {
    /// Wrap every call in a suspendable body.
    pub(crate) fn insert_yields(&mut self, body: &str) -> String {
        let text = self.initial_pass(body, 0);
        let text = self.chained_pass(text);
        let text = cleanup_parameters(&text);
        repair_statements(&text)
    }

    /// Wrap each `callee(args)` in a marker after rewriting its arguments.
    pub(crate) fn initial_pass(&mut self, text: &str, depth: u32) -> String {
        if depth > MAX_CALL_NESTING_DEPTH {
            self.diagnose(
                Pass::Depth,
                format!("calls nested deeper than {MAX_CALL_NESTING_DEPTH} levels, left as is"),
            );
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len() + 16);
        let mut offset = 0;

        while let Some(caps) = CALL_HEAD.captures_at(text, offset) {
            let (Some(callee), Some(bracket)) = (caps.get(2), caps.get(3)) else {
                break;
            };
            let fore = caps.get(1);
            let kind = if bracket.as_str() == "(" {
                Bracket::Paren
            } else {
                Bracket::Square
            };

            let Some(close) = find_closing_bracket(text, kind, 1, bracket.end()) else {
                let snippet: String = text[callee.start()..].chars().take(40).collect();
                self.diagnose(
                    Pass::Yields,
                    format!(
                        "no closing '{}' for {:?}, rest of body left as is",
                        kind.close() as char,
                        self.literals.resolve(&snippet)
                    ),
                );
                break;
            };

            let args = self.initial_pass(&text[bracket.end()..close], depth + 1);
            let call = format!("{}{}{}{}", callee.as_str(), bracket.as_str(), args, kind.close() as char);
            let fore_word = fore.map(|m| m.as_str());
            let start = fore.map_or(callee.start(), |m| m.start());

            out.push_str(&text[offset..start]);
            let wrap = match kind {
                Bracket::Paren => should_wrap(callee.as_str(), fore_word),
                _ => should_wrap(callee.as_str(), fore_word) && member_link(text, close + 1).is_some(),
            };
            if !wrap {
                out.push_str(&text[start..callee.start()]);
                out.push_str(&call);
            } else if let Some(adapted) = (kind == Bracket::Paren)
                .then(|| self.catch_callback(callee.as_str(), None, &args))
                .flatten()
            {
                out.push_str(&wrap_with_fore(fore_word, &adapted));
            } else {
                out.push_str(&wrap_with_fore(fore_word, &call));
            }
            offset = close + 1;
        }

        out.push_str(&text[offset..]);
        out
    }

    /// Nest every wrapped call that continues with `.member(...)`.
    pub(crate) fn chained_pass(&mut self, mut text: String) -> String {
        let mut pos = 0;

        while let Some(rel) = text[pos..].find(MARK) {
            let run_start = pos + rel;
            let mut inner = run_start;
            let mut run = 0;
            while text[inner..].starts_with(MARK) {
                inner += MARK.len();
                run += 1;
            }

            let Some(close) = find_closing_bracket(&text, Bracket::Paren, run, inner) else {
                self.diagnose(Pass::Chains, "unbalanced suspension marker, chains left as is".into());
                break;
            };

            let rewrapped = match member_link(&text, close + 1) {
                Some(link) if link.name != "then" => {
                    match find_closing_bracket(&text, Bracket::Paren, 1, link.args_open + 1) {
                        Some(args_close) => {
                            let receiver = &text[run_start..=close];
                            let args = &text[link.args_open + 1..args_close];
                            let adapted = if link.indexed {
                                None
                            } else {
                                self.catch_callback(link.name, Some(receiver), args)
                            };
                            let replacement = match adapted {
                                Some(adapted) => format!("{MARK}{adapted})"),
                                None => format!("{MARK}{})", &text[run_start..=args_close]),
                            };
                            Some((args_close, replacement))
                        }
                        None => {
                            self.diagnose(
                                Pass::Chains,
                                format!("no closing ')' for chained call .{}", link.name),
                            );
                            None
                        }
                    }
                }
                _ => None,
            };

            match rewrapped {
                Some((args_close, replacement)) => {
                    trace!(at = run_start, depth = run, "nested chained call");
                    text.replace_range(run_start..=args_close, &replacement);
                }
                None => pos = inner,
            }
        }

        text
    }

    /// `catchCallback` form of a call whose arguments hold a callback slot
    /// marker, or `None` if they hold none.
    ///
    /// With a `receiver`, `callee` is the member name called on it. Without
    /// one, a dotted `callee` is split into receiver and member so the
    /// receiver stays the call's `this`.
    fn catch_callback(&self, callee: &str, receiver: Option<&str>, args: &str) -> Option<String> {
        let args = split_arguments(args);
        let slot = args.iter().position(|arg| is_callback_sentinel(arg))?;

        let (target, receiver) = match (receiver, callee.rfind('.')) {
            (Some(receiver), _) => (format!("\"{callee}\""), receiver.to_string()),
            (None, Some(dot)) => (format!("\"{}\"", &callee[dot + 1..]), callee[..dot].to_string()),
            (None, None) => (callee.to_string(), "null".to_string()),
        };

        let mut call = format!("{}.catchCallback({target}, {receiver}", self.runtime);
        for (_, arg) in args.iter().enumerate().filter(|(i, _)| *i != slot) {
            call.push_str(", ");
            call.push_str(arg.trim());
        }
        call.push(')');
        Some(call)
    }
}

fn should_wrap(callee: &str, fore: Option<&str>) -> bool {
    if callee.starts_with('.') || is_non_call_keyword(callee) || is_operand_keyword(callee) {
        return false;
    }
    !fore.is_some_and(is_non_call_keyword)
}

fn wrap_with_fore(fore: Option<&str>, call: &str) -> String {
    match fore {
        Some(word) if is_operand_keyword(word) => format!("{word} {MARK}{call})"),
        Some(word) => format!("{MARK}{word} {call})"),
        None => format!("{MARK}{call})"),
    }
}

fn member_link(text: &str, pos: usize) -> Option<MemberLink<'_>> {
    let bytes = text.as_bytes();
    let mut at = skip_ws(text, pos);
    if bytes.get(at) != Some(&b'.') {
        return None;
    }
    at = skip_ws(text, at + 1);
    let start = at;
    while at < bytes.len() && is_ident_byte(bytes[at]) {
        at += 1;
    }
    if at == start {
        return None;
    }
    let name = &text[start..at];

    at = skip_ws(text, at);
    let indexed = bytes.get(at) == Some(&b'[');
    if indexed {
        let close = find_closing_bracket(text, Bracket::Square, 1, at + 1)?;
        at = skip_ws(text, close + 1);
    }
    (bytes.get(at) == Some(&b'(')).then_some(MemberLink {
        name,
        indexed,
        args_open: at,
    })
}

/// Remove markers from the parameter lists of function heads. A default
/// value is evaluated when the function is called, not where it is written.
pub(crate) fn cleanup_parameters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut offset = 0;

    for head in PARAMETER_LIST.find_iter(text) {
        if head.start() < offset {
            continue;
        }
        let Some(close) = find_closing_bracket(text, Bracket::Paren, 1, head.end()) else {
            continue;
        };
        out.push_str(&text[offset..head.end()]);
        out.push_str(&strip_markers(&text[head.end()..close]));
        offset = close;
    }

    out.push_str(&text[offset..]);
    out
}

fn strip_markers(params: &str) -> String {
    let mut text = params.to_string();
    while let Some(at) = text.find(MARK) {
        if let Some(close) = find_closing_bracket(&text, Bracket::Paren, 1, at + MARK.len()) {
            text.remove(close);
        }
        text.replace_range(at..at + MARK.len(), "");
    }
    text
}

/// Prefix `;` to lines that start with a marker and would otherwise be
/// parsed as a call on the previous line's last expression.
pub(crate) fn repair_statements(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut previous: Option<&str> = None;

    for line in text.split_inclusive('\n') {
        let body = line.trim_start();
        let indent = line.len() - body.len();
        if body.starts_with(MARK) && previous.is_some_and(needs_separator) {
            out.push_str(&line[..indent]);
            out.push(';');
            out.push_str(body);
        } else {
            out.push_str(line);
        }

        let code = code_part(line);
        if !code.is_empty() {
            previous = Some(code);
        }
    }

    out
}

/// Whether a line starting with `(` after `previous` needs a `;` between.
fn needs_separator(previous: &str) -> bool {
    let Some(&last) = previous.as_bytes().last() else {
        return false;
    };
    if CONTINUATION_BYTES.contains(&last) {
        return false;
    }
    if matches!(prev_word(previous, previous.len()), Some((_, "else" | "do"))) {
        return false;
    }

    // `if (...)`, `} else if (...)`, `while (...)` control the next line.
    let head = previous.trim_start_matches('}').trim_start();
    let head = head.strip_prefix("else").map_or(head, str::trim_start);
    let word_len = head.bytes().take_while(|&b| is_ident_byte(b)).count();
    !(last == b')' && is_condition_head(&head[..word_len]))
}

/// A line without its trailing comment tokens and surrounding whitespace.
fn code_part(line: &str) -> &str {
    let mut code = match line.find("//") {
        Some(at) => &line[..at],
        None => line,
    }
    .trim();
    while code.ends_with("*/") {
        match code.rfind("/*") {
            Some(at) => code = code[..at].trim_end(),
            None => break,
        }
    }
    code
}
