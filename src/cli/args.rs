use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the yieldify binary.
#[derive(Parser, Debug)]
#[command(
    name = "yieldify",
    version,
    about = "Rewrites generator-style JavaScript so every call becomes a suspension point"
)]
pub struct CliArgs {
    /// Path to yieldify.json. Searched for upward from the working directory
    /// when omitted.
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rewrite files, or every script under directories.
    Transform(TransformArgs),

    /// Inspect or empty the rewrite cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Watch directories and keep the rewrite cache current.
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Files or directories to rewrite.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Write rewritten files under this directory instead of printing them.
    #[arg(short = 'o', long = "out-dir")]
    pub out_dir: Option<PathBuf>,

    /// Wrap each file in the module envelope before rewriting.
    #[arg(short = 'm', long)]
    pub module: bool,

    /// Do not read or write the rewrite cache.
    #[arg(long = "no-cache")]
    pub no_cache: bool,

    /// Expression naming the runtime object, e.g. `lib.rt`.
    #[arg(long = "runtime-name")]
    pub runtime_name: Option<String>,

    /// Fixed placeholder seed, for reproducible output.
    #[arg(long, hide = true)]
    pub seed: Option<u64>,

    /// Print results as JSON lines.
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Print the cache directory.
    Path,
    /// Delete every cached rewrite.
    Clear,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Directories to watch.
    #[arg(required = true)]
    pub dirs: Vec<PathBuf>,

    /// Quiet period before a burst of changes is processed, in milliseconds.
    #[arg(long, default_value_t = 200)]
    pub debounce_ms: u64,
}
