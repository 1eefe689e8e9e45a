//! Configuration: transform options and the `yieldify.json` project file.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use yieldify_runtime::RuntimeOptions;

use crate::cache::RewriteCache;
use yieldify_scanner::{SpanKind, scan};

/// Project file looked up from the working directory upward.
pub const CONFIG_FILE_NAME: &str = "yieldify.json";

/// Default name of the runtime object rewritten code calls into.
pub const DEFAULT_RUNTIME_NAME: &str = "Yieldify";

/// Options for a single `transform` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Expression naming the runtime object, e.g. `Yieldify` or `lib.rt`.
    pub runtime_name: String,
    /// Fixed placeholder seed. Only useful for reproducible output in tests;
    /// the default derives it from the clock.
    pub seed: Option<u64>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions {
            runtime_name: DEFAULT_RUNTIME_NAME.to_string(),
            seed: None,
        }
    }
}

impl TransformOptions {
    /// Text every rewritten suspendable function starts with.
    pub fn invocation_prefix(&self) -> String {
        format!("{}.runGenerator(function*(", self.runtime_name)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_member_path(&self.runtime_name) {
            bail!(
                "runtimeName must be an identifier or dotted path, got '{}'",
                self.runtime_name
            );
        }
        Ok(())
    }
}

/// Custom deserializer for boolean options that accepts both bool and string values.
fn deserialize_bool_or_string<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(b)) => Ok(Some(b)),
        Some(BoolOrString::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(Error::custom(format!(
                "invalid boolean value: '{}'. Expected true, false, 'true', or 'false'",
                s
            ))),
        },
    }
}

/// Contents of `yieldify.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub transform: TransformOptions,
    #[serde(default)]
    pub runtime: RuntimeOptions,
    /// Overrides the rewrite cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub no_cache: Option<bool>,
}

impl ProjectConfig {
    pub fn cache_enabled(&self) -> bool {
        !self.no_cache.unwrap_or(false)
    }

    /// The rewrite cache this project uses, or `None` when caching is off.
    pub fn rewrite_cache(&self) -> Option<RewriteCache> {
        self.cache_enabled().then(|| match &self.cache_dir {
            Some(dir) => RewriteCache::new(dir.clone()),
            None => RewriteCache::default(),
        })
    }
}

/// Parse a project file. Comments are allowed.
pub fn parse_project_config(source: &str) -> Result<ProjectConfig> {
    let stripped = strip_comments(source);
    let config: ProjectConfig =
        serde_json::from_str(&stripped).context("failed to parse yieldify.json")?;
    config.transform.validate()?;
    Ok(config)
}

pub fn load_project_config(path: &Path) -> Result<ProjectConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    parse_project_config(&source)
        .with_context(|| format!("failed to load config: {}", path.display()))
}

/// Walk from `start` towards the root looking for `yieldify.json`.
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Drop `//` and `/* */` comments, leaving strings intact.
fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for span in scan(input) {
        if matches!(span.kind, SpanKind::Comment | SpanKind::BlockComment) {
            out.push_str(&input[last..span.start as usize]);
            last = span.end as usize;
        }
    }
    out.push_str(&input[last..]);
    out
}

fn is_member_path(value: &str) -> bool {
    !value.is_empty()
        && value.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}
