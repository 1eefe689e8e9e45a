//! Placeholder tokens and the ordered maps that restore them.
//!
//! Every protection pass swaps a region of text for a short synthetic token
//! and records the original text under that token. Decoding walks the map in
//! insertion order and never looks back in the text, so a map must list its
//! tokens in the same left-to-right order they occupy in the text.

use indexmap::IndexMap;
use memchr::memmem;
use std::time::{SystemTime, UNIX_EPOCH};

/// What kind of region a token stands for.
///
/// The family letter is embedded in the token so tokens from different passes
/// can never collide even when they share a counter value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenFamily {
    /// String, comment and regex literals.
    Literal,
    /// Ordinary (non-suspendable) functions, arrows and method shorthands.
    Function,
    /// Bracketed index chains such as `obj["key"]`.
    Index,
    /// Class literals.
    Class,
    /// Already rewritten suspendable functions.
    Suspendable,
    /// Stand-in for the runtime's own invocation prefix.
    Sentinel,
}

impl TokenFamily {
    const fn letter(self) -> char {
        match self {
            TokenFamily::Literal => 'l',
            TokenFamily::Function => 'f',
            TokenFamily::Index => 'i',
            TokenFamily::Class => 'c',
            TokenFamily::Suspendable => 's',
            TokenFamily::Sentinel => 'k',
        }
    }
}

/// Generates unique placeholder tokens.
///
/// Tokens look like `__y1700000000000f12__`: a seed (by default the current
/// time in milliseconds), the family letter and a monotonically increasing
/// counter, terminated so that no token is a prefix of another. They are
/// valid identifiers, so a token can stand wherever an expression could.
#[derive(Clone, Debug)]
pub struct KeyGen {
    seed: u64,
    next: u64,
}

impl KeyGen {
    pub fn new(seed: u64) -> Self {
        KeyGen { seed, next: 0 }
    }

    /// Seed from the wall clock.
    pub fn from_clock() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        KeyGen::new(millis)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Produce the next token for `family`.
    pub fn next_token(&mut self, family: TokenFamily) -> String {
        let index = self.next;
        self.next += 1;
        format!("__y{}{}{}__", self.seed, family.letter(), index)
    }
}

/// The original text a token replaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placeholder {
    /// How many times the token was emitted into the text.
    pub occurrences: u32,
    pub replacement: String,
}

/// Ordered token → original-text map.
#[derive(Clone, Debug, Default)]
pub struct PlaceholderMap {
    entries: IndexMap<String, Placeholder>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one emission of `token`.
    ///
    /// Re-inserting an existing token bumps its occurrence count; the stored
    /// replacement must be identical, which callers guarantee by construction.
    pub fn insert(&mut self, token: impl Into<String>, replacement: impl Into<String>) {
        let token = token.into();
        match self.entries.get_mut(&token) {
            Some(existing) => existing.occurrences += 1,
            None => {
                self.entries.insert(
                    token,
                    Placeholder {
                        occurrences: 1,
                        replacement: replacement.into(),
                    },
                );
            }
        }
    }

    pub fn get(&self, token: &str) -> Option<&Placeholder> {
        self.entries.get(token)
    }

    /// Original text for `token`, if it is one of ours.
    pub fn replacement(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(|p| p.replacement.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Placeholder)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Expand every token inside `text` that belongs to this map, without
    /// consuming the map. Used where a snippet must be shown in its original
    /// form while the surrounding text is still protected.
    pub fn resolve(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (token, placeholder) in &self.entries {
            if out.contains(token.as_str()) {
                out = out.replace(token.as_str(), &placeholder.replacement);
            }
        }
        out
    }
}

impl IntoIterator for PlaceholderMap {
    type Item = (String, Placeholder);
    type IntoIter = indexmap::map::IntoIter<String, Placeholder>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Restore every token in `text` from `map`.
///
/// Pass 1 replaces tokens that occur more than once with a global
/// find-and-replace; their replacements are identical, so order does not
/// matter. Pass 2 restores single-occurrence tokens with one forward scan
/// that never revisits emitted text, which is why the map must be in
/// document order. A token that cannot be found ahead of the cursor is
/// looked up in the already emitted output instead.
pub fn decode(text: &str, map: PlaceholderMap) -> String {
    if map.is_empty() {
        return text.to_string();
    }

    let mut source = text.to_string();
    for (token, placeholder) in map.iter() {
        if placeholder.occurrences != 1 {
            source = source.replace(token, &placeholder.replacement);
        }
    }

    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut offset = 0usize;

    for (token, placeholder) in map {
        if placeholder.occurrences != 1 {
            continue;
        }

        match memmem::find(&bytes[offset..], token.as_bytes()) {
            Some(rel) => {
                out.push_str(&source[offset..offset + rel]);
                out.push_str(&placeholder.replacement);
                offset += rel + token.len();
            }
            None => {
                if let Some(pos) = out.find(token.as_str()) {
                    out.replace_range(pos..pos + token.len(), &placeholder.replacement);
                }
            }
        }
    }

    out.push_str(&source[offset..]);
    out
}
