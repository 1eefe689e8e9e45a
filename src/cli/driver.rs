//! Batch rewriting for the `transform` and `cache` commands.

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info_span};
use walkdir::WalkDir;

use crate::cache::RewriteCache;
use crate::config::{ProjectConfig, TransformOptions, find_project_config, load_project_config};
use crate::loader::transform_module_file;
use crate::transforms::{TransformDiagnostic, transform_with_options};

use super::args::{CacheAction, CliArgs, TransformArgs};

/// File extensions picked up when walking a directory.
pub const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs"];

/// Options and cache the commands run with, after merging the project file
/// and command-line flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub transform: TransformOptions,
    pub cache: Option<RewriteCache>,
}

impl Settings {
    pub fn from_config(config: ProjectConfig) -> Self {
        Settings {
            cache: config.rewrite_cache(),
            transform: config.transform,
        }
    }

    /// Apply `transform` flags on top of the project file.
    pub fn with_transform_args(mut self, args: &TransformArgs) -> Result<Self> {
        if let Some(name) = &args.runtime_name {
            self.transform.runtime_name = name.clone();
        }
        if args.seed.is_some() {
            self.transform.seed = args.seed;
        }
        if args.no_cache {
            self.cache = None;
        }
        self.transform.validate()?;
        Ok(self)
    }
}

/// Load the project file named on the command line, or the nearest one
/// above `cwd`.
pub fn load_settings(args: &CliArgs, cwd: &Path) -> Result<Settings> {
    let path = match &args.config {
        Some(path) => Some(cwd.join(path)),
        None => find_project_config(cwd),
    };
    let config = match path {
        Some(path) => {
            debug!(config = %path.display(), "using project file");
            load_project_config(&path)?
        }
        None => ProjectConfig::default(),
    };
    Ok(Settings::from_config(config))
}

/// A script to rewrite and the input root it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub root: PathBuf,
    pub path: PathBuf,
}

impl SourceFile {
    /// Location under `out_dir`, mirroring the layout below the root.
    pub fn output_path(&self, out_dir: &Path) -> PathBuf {
        match self.path.strip_prefix(&self.root) {
            Ok(relative) if !relative.as_os_str().is_empty() => out_dir.join(relative),
            _ => out_dir.join(self.path.file_name().unwrap_or(self.path.as_os_str())),
        }
    }
}

pub fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
}

/// Expand files and directories into the scripts to rewrite. Directories
/// are walked recursively, skipping `node_modules` and hidden entries.
pub fn collect_sources(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    for path in paths {
        if path.is_file() {
            sources.push(SourceFile {
                root: path.parent().map(Path::to_path_buf).unwrap_or_default(),
                path: path.clone(),
            });
            continue;
        }
        if !path.is_dir() {
            bail!("no such file or directory: {}", path.display());
        }

        let walker = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| name.starts_with('.') || name == "node_modules")
            });
        for entry in walker {
            let entry =
                entry.with_context(|| format!("failed to walk {}", path.display()))?;
            if entry.file_type().is_file() && is_script(entry.path()) {
                sources.push(SourceFile {
                    root: path.clone(),
                    path: entry.into_path(),
                });
            }
        }
    }
    Ok(sources)
}

/// Rewritten form of one file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    pub file: PathBuf,
    pub code: String,
    pub diagnostics: Vec<TransformDiagnostic>,
}

/// Rewrite one file. In module mode the file is wrapped in the module
/// envelope and goes through the rewrite cache.
pub fn transform_file(path: &Path, settings: &Settings, module: bool) -> Result<FileResult> {
    if module {
        let output = transform_module_file(path, &settings.transform, settings.cache.as_ref())?;
        return Ok(FileResult {
            file: output.file,
            code: output.code,
            diagnostics: output.diagnostics,
        });
    }

    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let output = transform_with_options(&source, &settings.transform);
    Ok(FileResult {
        file: path.to_path_buf(),
        code: output.code,
        diagnostics: output.diagnostics,
    })
}

/// Rewrite every file in parallel. Results keep the input order.
pub fn transform_files(
    sources: &[SourceFile],
    settings: &Settings,
    module: bool,
) -> Vec<Result<FileResult>> {
    let _span = info_span!("transform_files", count = sources.len()).entered();
    sources
        .par_iter()
        .map(|source| transform_file(&source.path, settings, module))
        .collect()
}

pub fn write_output(source: &SourceFile, out_dir: &Path, code: &str) -> Result<PathBuf> {
    let target = source.output_path(out_dir);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&target, code)
        .with_context(|| format!("failed to write {}", target.display()))?;
    debug!(output = %target.display(), "wrote rewritten file");
    Ok(target)
}

/// Outcome of a `cache` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheReport {
    Dir(PathBuf),
    Cleared { dir: PathBuf, removed: usize },
}

pub fn run_cache(action: CacheAction, settings: &Settings) -> Result<CacheReport> {
    let cache = settings.cache.clone().unwrap_or_default();
    match action {
        CacheAction::Path => Ok(CacheReport::Dir(cache.cache_dir().to_path_buf())),
        CacheAction::Clear => {
            let removed = cache.clear()?;
            Ok(CacheReport::Cleared {
                dir: cache.cache_dir().to_path_buf(),
                removed,
            })
        }
    }
}
