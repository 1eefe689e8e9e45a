//! yieldify: rewrites generator-style JavaScript so that every call inside a
//! suspendable function becomes a suspension point, and drives the result
//! with a trampoline.
//!
//! - [`transforms`] - The source rewriter (pure, no I/O)
//! - [`cache`] - On-disk cache of rewritten sources
//! - [`loader`] - Module envelope, `require` resolution and module loading
//! - [`config`] - Transform/runtime options and the `yieldify.json` file
//! - [`tracing_config`] - Log output setup
//!
//! The runtime side (deferreds, trampoline, callback adaptation) lives in the
//! `yieldify-runtime` crate and is re-exported as [`runtime`].

// Source rewriting passes
pub mod transforms;
pub use transforms::{
    Pass, TransformDiagnostic, TransformOutput, transform, transform_with_options,
};

// Options and project file
pub mod config;
pub use config::{ProjectConfig, TransformOptions};

// Rewrite cache
pub mod cache;
pub use cache::{CacheError, RewriteCache};

// Module loading
pub mod loader;
pub use loader::{
    LoadError, ModuleCache, ModuleHost, ModuleLoader, ModuleOutput, Resolved, transform_module_file,
    wrap_module,
};

// Tracing subscriber setup
pub mod tracing_config;

#[cfg(feature = "cli")]
pub mod cli;

pub use yieldify_runtime as runtime;
pub use yieldify_scanner as scanner;
