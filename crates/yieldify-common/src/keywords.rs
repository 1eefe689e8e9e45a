//! Keyword tables used by the call-site rewriter.
//!
//! The rewriter works on raw text, so an identifier followed by `(` is only a
//! candidate call. These tables decide what happens to a candidate based on
//! the word itself or on the word directly in front of it.

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

/// Words that are never call targets and never precede a wrappable call.
///
/// `if (x)` is a statement head, `function (a)` is a declaration, and a call
/// already preceded by `yield`/`await` is already a suspension point.
static NON_CALL_KEYWORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "yield", "async", "await", "function", "class", "if", "for", "while", "break",
        "continue", "switch", "do", "delete", "false", "true", "try", "catch", "with",
        "super", "import", "export", "let", "const", "var",
    ]
    .into_iter()
    .collect()
});

/// Words whose operand is the call: the marker goes between the keyword and
/// the call (`return (yield f())`), never around the keyword.
static OPERAND_KEYWORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "return", "throw", "typeof", "void", "else", "case", "of", "in", "instanceof",
    ]
    .into_iter()
    .collect()
});

/// Console methods are synchronous and never wrapped.
const CONSOLE_PREFIX: &str = "console.";

/// Returns true if `word` may never be wrapped or be treated as a call target.
pub fn is_non_call_keyword(word: &str) -> bool {
    NON_CALL_KEYWORDS.contains(word) || word.starts_with(CONSOLE_PREFIX)
}

/// Returns true if a call directly after `word` is the keyword's operand.
pub fn is_operand_keyword(word: &str) -> bool {
    OPERAND_KEYWORDS.contains(word)
}

/// Returns true for the suspension keywords themselves.
pub fn is_marker_keyword(word: &str) -> bool {
    matches!(word, "yield" | "await")
}

/// Statement heads whose parenthesized condition controls the next statement.
pub fn is_condition_head(word: &str) -> bool {
    matches!(word, "if" | "while" | "for" | "with")
}

/// Words that may precede `name(params) {` in a class body or object literal
/// without changing it into something other than a method definition.
pub fn is_method_modifier(word: &str) -> bool {
    matches!(word, "get" | "set" | "static")
}

/// Words that look like `name(args) {` but are statement heads.
pub fn is_block_statement_head(word: &str) -> bool {
    matches!(
        word,
        "if" | "for" | "while" | "switch" | "catch" | "with" | "function" | "return"
    )
}
