//! Module loading for rewritten sources.
//!
//! A module file is wrapped in a generator envelope, rewritten (or taken from
//! the [`RewriteCache`]), handed to a [`ModuleHost`] for evaluation, and the
//! resulting suspendable function is driven by the trampoline. The deferred
//! it returns settles with the module's exports.
//!
//! Resolution of `require` specifiers:
//!
//! - absolute paths are used as is;
//! - `./` and `../` specifiers are joined to the requiring module's directory
//!   and tried as `<p>`, `<p>.js` and `<p>/index.js`;
//! - bare specifiers are looked up in `node_modules` directories walking
//!   upward. A package is rewritten only when its `package.json` opts in with
//!   `"yieldify": true`; anything else, including unresolvable names such as
//!   host built-ins, goes to the host's native require.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, debug_span, trace};

use yieldify_runtime::{Deferred, EventLoop, SuspendableFn, Trampoline, Value};

use crate::cache::{CacheError, RewriteCache};
use crate::config::{ProjectConfig, TransformOptions};
use crate::transforms::{TransformDiagnostic, transform_with_options};

/// Parameters every module body can refer to.
pub const MODULE_PARAMETERS: &str = "module, exports, require, __filename, __dirname";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read module {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid package manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("failed to evaluate module {path}: {message}")]
    Evaluate { path: PathBuf, message: String },

    #[error("native require of '{specifier}' failed: {message}")]
    Native { specifier: String, message: String },
}

/// A rewritten module, ready for evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOutput {
    pub code: String,
    /// Directory of the rewrite cache the code went through, if any.
    pub cache_dir: Option<PathBuf>,
    pub file: PathBuf,
    /// Problems met while rewriting. Empty for a cache hit, since they were
    /// reported when the cached rewrite was made.
    pub diagnostics: Vec<TransformDiagnostic>,
}

/// Wrap raw module source in the suspendable module envelope.
pub fn wrap_module(code: &str) -> String {
    format!("(function*({MODULE_PARAMETERS}) {{\"use strict\";\r\n{code}\r\n}});")
}

/// Read, wrap and rewrite one module file.
///
/// With a cache, a fresh cached rewrite is returned without touching the
/// rewriter, and a new rewrite is stored before returning.
pub fn transform_module_file(
    path: &Path,
    options: &TransformOptions,
    cache: Option<&RewriteCache>,
) -> Result<ModuleOutput, LoadError> {
    let _span = debug_span!("transform_module_file", path = %path.display()).entered();
    let cache_dir = cache.map(|c| c.cache_dir().to_path_buf());

    if let Some(cache) = cache
        && cache.is_cached(path)
    {
        let code = cache.get_cached(path)?;
        return Ok(ModuleOutput {
            code,
            cache_dir,
            file: path.to_path_buf(),
            diagnostics: Vec::new(),
        });
    }

    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let output = transform_with_options(&wrap_module(&source), options);
    debug!(
        diagnostics = output.diagnostics.len(),
        "rewrote module"
    );

    if let Some(cache) = cache {
        cache.write_cached(path, &output.code)?;
    }

    Ok(ModuleOutput {
        code: output.code,
        cache_dir,
        file: path.to_path_buf(),
        diagnostics: output.diagnostics,
    })
}

// =============================================================================
// Resolution
// =============================================================================

/// Where a `require` specifier leads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// A file to rewrite and evaluate as a module.
    Rewrite(PathBuf),
    /// A specifier or path for the host's own require.
    Native(String),
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    main: Option<String>,
    #[serde(default)]
    yieldify: bool,
}

/// Resolve `specifier` as required from a module in `from_dir`.
pub fn resolve(specifier: &str, from_dir: &Path) -> Result<Resolved, LoadError> {
    let path = Path::new(specifier);
    let resolved = if path.is_absolute() {
        Resolved::Rewrite(path.to_path_buf())
    } else if specifier.starts_with("./") || specifier.starts_with("../") {
        match try_file_or_directory(&from_dir.join(path)) {
            Some(found) => Resolved::Rewrite(found),
            None => Resolved::Native(specifier.to_string()),
        }
    } else {
        resolve_package(specifier, from_dir)?
    };
    debug!(specifier, ?resolved, "resolved require");
    Ok(resolved)
}

fn try_file_or_directory(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    let mut with_ext = candidate.as_os_str().to_owned();
    with_ext.push(".js");
    let with_ext = PathBuf::from(with_ext);
    if with_ext.is_file() {
        return Some(with_ext);
    }
    let index = candidate.join("index.js");
    index.is_file().then_some(index)
}

fn resolve_package(specifier: &str, from_dir: &Path) -> Result<Resolved, LoadError> {
    for dir in from_dir.ancestors() {
        let package_dir = dir.join("node_modules").join(specifier);
        trace!(candidate = %package_dir.display(), "looking for package");
        if !package_dir.exists() {
            continue;
        }

        let manifest_path = package_dir.join("package.json");
        let manifest = read_package_json(&manifest_path)?;
        if !manifest.yieldify {
            return Ok(Resolved::Native(package_dir.to_string_lossy().into_owned()));
        }

        let entry = package_dir.join(manifest.main.as_deref().unwrap_or("index.js"));
        return Ok(match try_file_or_directory(&entry) {
            Some(found) => Resolved::Rewrite(found),
            None => Resolved::Native(package_dir.to_string_lossy().into_owned()),
        });
    }
    Ok(Resolved::Native(specifier.to_string()))
}

fn read_package_json(path: &Path) -> Result<PackageJson, LoadError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(PackageJson::default()),
        Err(source) => {
            return Err(LoadError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&content).map_err(|source| LoadError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

// =============================================================================
// Loading
// =============================================================================

/// The execution environment rewritten modules run in.
pub trait ModuleHost {
    /// Turn rewritten module code into a suspendable function.
    ///
    /// The function is called with `__filename` and `__dirname`; the host
    /// supplies `module`, `exports` and a `require` bound to `loader`, and
    /// its routine returns `module.exports` once the body has finished.
    fn evaluate(
        &mut self,
        module: &ModuleOutput,
        loader: &ModuleLoader,
    ) -> Result<SuspendableFn, String>;

    /// Load a module the host's own way.
    fn native_require(&mut self, specifier: &str) -> Result<Value, String>;
}

/// Exports of loaded modules, keyed by resolved path.
#[derive(Default)]
pub struct ModuleCache {
    modules: FxHashMap<PathBuf, Deferred>,
}

impl ModuleCache {
    pub fn get(&self, path: &Path) -> Option<Deferred> {
        self.modules.get(path).cloned()
    }

    pub fn insert(&mut self, path: PathBuf, exports: Deferred) {
        self.modules.insert(path, exports);
    }

    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.modules.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.modules.clear();
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

struct LoaderInner {
    host: RefCell<Box<dyn ModuleHost>>,
    modules: RefCell<ModuleCache>,
    trampoline: Trampoline,
    options: TransformOptions,
    cache: Option<RewriteCache>,
}

/// Loads, caches and runs rewritten modules.
///
/// Cloning is cheap; clones share the module cache, so a host can keep one
/// inside its `require` binding.
#[derive(Clone)]
pub struct ModuleLoader {
    inner: Rc<LoaderInner>,
}

impl ModuleLoader {
    pub fn new(
        host: Box<dyn ModuleHost>,
        trampoline: Trampoline,
        options: TransformOptions,
        cache: Option<RewriteCache>,
    ) -> Self {
        ModuleLoader {
            inner: Rc::new(LoaderInner {
                host: RefCell::new(host),
                modules: RefCell::new(ModuleCache::default()),
                trampoline,
                options,
                cache,
            }),
        }
    }

    /// Loader for a project: its transform options, its rewrite cache and a
    /// trampoline on `event_loop` running with its `runtime` options.
    pub fn from_config(
        host: Box<dyn ModuleHost>,
        event_loop: EventLoop,
        config: &ProjectConfig,
    ) -> Self {
        let trampoline = Trampoline::new(event_loop, config.runtime.clone());
        Self::new(host, trampoline, config.transform.clone(), config.rewrite_cache())
    }

    pub fn trampoline(&self) -> &Trampoline {
        &self.inner.trampoline
    }

    /// Require `specifier` from a module in `from_dir`.
    ///
    /// Each module file is evaluated once; later requires share its exports.
    /// A circular require sees the pending exports of the module that is
    /// still loading.
    pub fn require(&self, specifier: &str, from_dir: &Path) -> Result<Deferred, LoadError> {
        match resolve(specifier, from_dir)? {
            Resolved::Native(specifier) => {
                let value = self
                    .inner
                    .host
                    .borrow_mut()
                    .native_require(&specifier)
                    .map_err(|message| LoadError::Native {
                        specifier: specifier.clone(),
                        message,
                    })?;
                Ok(Deferred::resolved(value))
            }
            Resolved::Rewrite(path) => self.load(&path),
        }
    }

    /// Load the module file at `path`.
    pub fn load(&self, path: &Path) -> Result<Deferred, LoadError> {
        if let Some(exports) = self.inner.modules.borrow().get(path) {
            trace!(path = %path.display(), "module cache hit");
            return Ok(exports);
        }

        let module = transform_module_file(path, &self.inner.options, self.inner.cache.as_ref())?;
        let module_fn = self
            .inner
            .host
            .borrow_mut()
            .evaluate(&module, self)
            .map_err(|message| LoadError::Evaluate {
                path: path.to_path_buf(),
                message,
            })?;

        let (exports, resolver) = Deferred::pending();
        self.inner
            .modules
            .borrow_mut()
            .insert(path.to_path_buf(), exports.clone());

        let dirname = path.parent().unwrap_or(Path::new(""));
        let result = module_fn.call(vec![
            Value::from(path.to_string_lossy().into_owned()),
            Value::from(dirname.to_string_lossy().into_owned()),
        ]);
        result.then(move |settlement| resolver.settle(settlement));
        debug!(path = %path.display(), "module started");
        Ok(exports)
    }

    /// Forget one module's exports and cached rewrite.
    pub fn invalidate(&self, path: &Path) {
        let dropped = self.inner.modules.borrow_mut().invalidate(path);
        let uncached = self.inner.cache.as_ref().is_some_and(|c| c.invalidate(path));
        debug!(path = %path.display(), dropped, uncached, "invalidated module");
    }

    /// Forget every loaded module.
    pub fn clear(&self) {
        self.inner.modules.borrow_mut().clear();
    }

    pub fn loaded_count(&self) -> usize {
        self.inner.modules.borrow().len()
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod loader_tests;
