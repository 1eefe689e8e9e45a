//! Class rewriting.
//!
//! Generator methods keep their `*name() {}` syntax so the class stays a
//! valid class body; `async` methods are turned into generator methods. Each
//! of them is recorded and, once the class is complete, rebound to its
//! trampoline-wrapped version:
//!
//! ```javascript
//! class A { *m() { ... } };A.prototype["m"] = Yieldify.runGenerator(A.prototype["m"]);
//! ```
//!
//! Static methods are rebound on the class itself. A class expression cannot
//! be followed by statements, so it is passed through an arrow that rebinds
//! the methods on its argument and returns it.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use yieldify_scanner::{Bracket, PlaceholderMap, TokenFamily, decode, find_closing_bracket};

use super::{Pass, Rewriter, in_expression_position, is_ident_byte, skip_ws};

static CLASS_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\w$.])(class)\b").expect("class regex"));

static SUSPENDABLE_MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:^|[;{}\s])(?P<head>(?P<static>static\s+)?(?:(?P<async>async)\s+)?(?P<star>\*\s*)?(?P<name>[A-Za-z_$][\w$]*|"[^"\n]*"|'[^'\n]*')\s*\()"#,
    )
    .expect("class member regex")
});

/// Facts about one class literal, gathered while its body is rewritten.
#[derive(Debug, Default)]
struct ClassRecord {
    name: Option<String>,
    /// Property keys of generator methods, already quoted: `"m"`.
    generator_methods: Vec<String>,
    static_generator_methods: Vec<String>,
}

impl ClassRecord {
    fn is_empty(&self) -> bool {
        self.generator_methods.is_empty() && self.static_generator_methods.is_empty()
    }

    /// Statements rebinding every recorded method on `target`.
    fn rebind_statements(&self, target: &str, runtime: &str) -> String {
        let mut out = String::new();
        for key in &self.generator_methods {
            let slot = format!("{target}.prototype[{key}]");
            out.push_str(&format!("{slot} = {runtime}.runGenerator({slot});"));
        }
        for key in &self.static_generator_methods {
            let slot = format!("{target}[{key}]");
            out.push_str(&format!("{slot} = {runtime}.runGenerator({slot});"));
        }
        out
    }
}

impl Rewriter<'_> {
    pub(crate) fn protect_classes(&mut self, text: &str) -> (String, PlaceholderMap) {
        let mut map = PlaceholderMap::new();
        let mut out = String::with_capacity(text.len());
        let mut offset = 0;

        while let Some(caps) = CLASS_KEYWORD.captures_at(text, offset) {
            let Some(keyword) = caps.get(1) else {
                break;
            };
            let start = keyword.start();

            let mut record = ClassRecord::default();
            let mut pos = skip_ws(text, keyword.end());
            let name_end = ident_end(text, pos);
            if name_end > pos && &text[pos..name_end] != "extends" {
                record.name = Some(text[pos..name_end].to_string());
                pos = name_end;
            }
            let Some(open) = body_open(text, pos) else {
                // `class` used as a property name or similar.
                out.push_str(&text[offset..keyword.end()]);
                offset = keyword.end();
                continue;
            };

            let close = self.closing_or_end(Pass::Classes, text, Bracket::Brace, 1, open + 1);
            let body = self.rewrite_class_body(&text[open + 1..close], &mut record);
            let tail = if close < text.len() { "}" } else { "" };
            let class_text = format!("{}{}{}", &text[start..=open], body, tail);

            let expression = record.name.is_none() || in_expression_position(text, start);
            let content = if record.is_empty() {
                class_text
            } else if expression {
                format!(
                    "((c) => {{ {}return c }})({})",
                    record.rebind_statements("c", self.runtime),
                    class_text
                )
            } else {
                let name = record.name.as_deref().unwrap_or_default();
                format!("{};{}", class_text, record.rebind_statements(name, self.runtime))
            };
            debug!(
                name = record.name.as_deref().unwrap_or("<anonymous>"),
                methods = record.generator_methods.len() + record.static_generator_methods.len(),
                "rewrote class"
            );

            let token = self.token(TokenFamily::Class);
            out.push_str(&text[offset..start]);
            out.push_str(&token);
            map.insert(token, content);
            offset = (close + 1).min(text.len());
        }

        out.push_str(&text[offset..]);
        (out, map)
    }

    /// Rewrite generator and async methods in a class body and record them.
    fn rewrite_class_body(&mut self, body: &str, record: &mut ClassRecord) -> String {
        let mut methods = PlaceholderMap::new();
        let mut out = String::with_capacity(body.len());
        let mut offset = 0;

        while let Some(caps) = SUSPENDABLE_MEMBER.captures_at(body, offset) {
            let (Some(head), Some(name)) = (caps.name("head"), caps.name("name")) else {
                break;
            };
            let is_async = caps.name("async").is_some();
            let is_generator = caps.name("star").is_some();
            let is_static = caps.name("static").is_some();

            let params_close = find_closing_bracket(body, Bracket::Paren, 1, head.end());
            let open = params_close.map(|close| skip_ws(body, close + 1));
            let (Some(params_close), Some(open)) = (params_close, open) else {
                out.push_str(&body[offset..head.end()]);
                offset = head.end();
                continue;
            };
            if !(is_async || is_generator) || body.as_bytes().get(open) != Some(&b'{') {
                // Ordinary members were protected earlier; this is a field or
                // computed key. Step past it.
                out.push_str(&body[offset..head.end()]);
                offset = head.end();
                continue;
            }

            let close = self.closing_or_end(Pass::Classes, body, Bracket::Brace, 1, open + 1);
            let inner = self.rewrite_body(&body[open + 1..close]);
            let tail = if close < body.len() { "}" } else { "" };
            let method = format!(
                "{}*{}({}){}{{{}{}",
                if is_static { "static " } else { "" },
                name.as_str(),
                &body[head.end()..params_close],
                &body[params_close + 1..open],
                inner,
                tail
            );

            let key = self.method_key(name.as_str());
            if is_static {
                record.static_generator_methods.push(key);
            } else {
                record.generator_methods.push(key);
            }

            let token = self.token(TokenFamily::Suspendable);
            out.push_str(&body[offset..head.start()]);
            out.push_str(&token);
            methods.insert(token, method);
            offset = (close + 1).min(body.len());
        }
        out.push_str(&body[offset..]);

        // Field initialisers may still hold suspendable functions.
        let out = self.rewrite_suspendables(&out);
        decode(&out, methods)
    }

    /// Quoted property key for a method name. String-literal names are
    /// placeholders at this point and are resolved to their source text.
    fn method_key(&self, name: &str) -> String {
        if name.starts_with('"') || name.starts_with('\'') {
            self.literals.replacement(name).unwrap_or(name).to_string()
        } else {
            format!("\"{name}\"")
        }
    }
}

fn ident_end(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut end = start;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }
    end
}

/// Offset of the `{` opening a class body, skipping an `extends` clause.
fn body_open(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b'{' if depth == 0 => return Some(i),
            b';' | b'}' | b',' if depth == 0 => return None,
            _ => {}
        }
    }
    None
}
