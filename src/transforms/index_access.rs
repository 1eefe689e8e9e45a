//! Index chain protection.
//!
//! `obj["key"]` looks like a call head to the marker pass (`identifier[`),
//! but reading a property is not a suspension point. Chains indexed only by
//! literals, numbers or plain identifiers are hidden here, so
//! `obj["key"] = 1` is left alone while `obj["method"](x)` becomes a call on
//! an opaque token and is still wrapped.

use once_cell::sync::Lazy;
use regex::Regex;

use yieldify_scanner::{PlaceholderMap, TokenFamily};

use super::Rewriter;

static INDEX_CHAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:^|[^\w$.])([A-Za-z_$][\w$]*(?:\s*\.\s*[A-Za-z_$][\w$]*)*(?:\[\s*(?:"[^"\n]*"|'[^'\n]*'|`[^`]*`|\d+|[A-Za-z_$][\w$]*)\s*\])+)"#,
    )
    .expect("index chain regex")
});

impl Rewriter<'_> {
    pub(crate) fn protect_index_chains(&mut self, text: &str) -> (String, PlaceholderMap) {
        let mut map = PlaceholderMap::new();
        let mut out = String::with_capacity(text.len());
        let mut offset = 0;

        for caps in INDEX_CHAIN.captures_iter(text) {
            let Some(chain) = caps.get(1) else {
                continue;
            };
            let token = self.token(TokenFamily::Index);
            out.push_str(&text[offset..chain.start()]);
            out.push_str(&token);
            map.insert(token, chain.as_str());
            offset = chain.end();
        }

        out.push_str(&text[offset..]);
        (out, map)
    }
}
