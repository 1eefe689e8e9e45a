//! Tracing configuration for debugging rewrites.
//!
//! `YIELDIFY_LOG` takes the usual `EnvFilter` directives. A bare level is
//! scoped to the yieldify crates, so `YIELDIFY_LOG=debug` shows what each
//! pass rewrote without the file watcher's or the thread pool's chatter:
//!
//! | `YIELDIFY_LOG`        | effective filter                                        |
//! |-----------------------|---------------------------------------------------------|
//! | `debug`               | `warn,yieldify=debug,yieldify_runtime=debug,yieldify_scanner=debug` |
//! | `passes`              | `warn,yieldify::transforms=trace`                       |
//! | `yieldify::cache=trace` | used as written                                       |
//!
//! `RUST_LOG` is used as written when `YIELDIFY_LOG` is unset.
//!
//! `YIELDIFY_LOG_FORMAT` picks the output: `text` (default), `tree` (indented
//! by span, one file's passes nest under its `transform` span) or `json`.
//! Everything goes to stderr; rewritten code owns stdout.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Crates whose targets a bare level applies to.
const OWN_TARGETS: &[&str] = &["yieldify", "yieldify_runtime", "yieldify_scanner"];

/// Level kept for every other target when a bare level is given.
const OTHER_TARGETS_LEVEL: &str = "warn";

const LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Tree,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Expand the `YIELDIFY_LOG` shorthands into filter directives.
fn expand_directives(value: &str) -> String {
    let value = value.trim();
    let lower = value.to_lowercase();
    if lower == "passes" {
        return format!("{OTHER_TARGETS_LEVEL},yieldify::transforms=trace");
    }
    if LEVELS.contains(&lower.as_str()) {
        let mut directives = OTHER_TARGETS_LEVEL.to_string();
        for target in OWN_TARGETS {
            directives.push_str(&format!(",{target}={lower}"));
        }
        return directives;
    }
    value.to_string()
}

/// Initialise the global tracing subscriber.
///
/// Does nothing when neither `YIELDIFY_LOG` nor `RUST_LOG` is set.
pub fn init_tracing() {
    let filter = match std::env::var("YIELDIFY_LOG") {
        Ok(value) => EnvFilter::builder().parse_lossy(expand_directives(&value)),
        Err(_) if std::env::var("RUST_LOG").is_ok() => EnvFilter::from_default_env(),
        Err(_) => return,
    };
    let format = LogFormat::parse(&std::env::var("YIELDIFY_LOG_FORMAT").unwrap_or_default());

    match format {
        LogFormat::Tree => {
            let tree_layer = tracing_tree::HierarchicalLayer::default()
                .with_writer(std::io::stderr)
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_targets(true);
            Registry::default().with(filter).with(tree_layer).init();
        }
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);
            Registry::default().with(filter).with(json_layer).init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LogFormat, expand_directives};

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("TREE"), LogFormat::Tree);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("fancy"), LogFormat::Text);
    }

    #[test]
    fn test_bare_level_is_scoped_to_own_crates() {
        assert_eq!(
            expand_directives("Debug"),
            "warn,yieldify=debug,yieldify_runtime=debug,yieldify_scanner=debug"
        );
    }

    #[test]
    fn test_passes_shorthand_traces_transforms() {
        assert_eq!(expand_directives(" passes "), "warn,yieldify::transforms=trace");
    }

    #[test]
    fn test_explicit_directives_are_kept() {
        assert_eq!(
            expand_directives("yieldify::cache=trace,notify=off"),
            "yieldify::cache=trace,notify=off"
        );
    }
}
