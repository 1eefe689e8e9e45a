use colored::Colorize;
use std::path::Path;

use crate::transforms::{Pass, TransformDiagnostic};

/// Renders rewrite diagnostics and per-file status lines.
pub struct Reporter {
    color: bool,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Reporter { color }
    }

    pub fn render(&self, file: &Path, diagnostics: &[TransformDiagnostic]) -> String {
        let mut out = String::new();
        for (index, diagnostic) in diagnostics.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&self.format_diagnostic(file, diagnostic));
        }
        out
    }

    pub fn format_diagnostic(&self, file: &Path, diagnostic: &TransformDiagnostic) -> String {
        let location = file.display().to_string();
        let label = if self.color {
            "warning".yellow().bold().to_string()
        } else {
            "warning".to_string()
        };
        let pass = format!("[{}]", pass_name(diagnostic.pass));
        let pass = if self.color {
            pass.dimmed().to_string()
        } else {
            pass
        };
        format!("{location} - {label} {pass}: {}", diagnostic.message)
    }

    pub fn format_error(&self, file: &Path, error: &anyhow::Error) -> String {
        let label = if self.color {
            "error".red().bold().to_string()
        } else {
            "error".to_string()
        };
        format!("{} - {label}: {error:#}", file.display())
    }

    pub fn format_written(&self, source: &Path, target: &Path) -> String {
        let arrow = if self.color {
            "->".green().to_string()
        } else {
            "->".to_string()
        };
        format!("{} {arrow} {}", source.display(), target.display())
    }
}

fn pass_name(pass: Pass) -> &'static str {
    match pass {
        Pass::Functions => "functions",
        Pass::IndexChains => "index-chains",
        Pass::Classes => "classes",
        Pass::Suspendables => "suspendables",
        Pass::Yields => "yields",
        Pass::Chains => "chains",
        Pass::Depth => "depth",
    }
}
