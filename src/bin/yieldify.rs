#![allow(clippy::print_stderr)]

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;

use yieldify::cli::args::{CliArgs, Command, TransformArgs, WatchArgs};
use yieldify::cli::driver::{self, CacheReport, Settings};
use yieldify::cli::reporter::Reporter;
use yieldify::cli::watch::{self, WatchOutcome};

const EXIT_SUCCESS: i32 = 0;
const EXIT_FILES_FAILED: i32 = 1;

fn main() -> Result<()> {
    // Initialize tracing if YIELDIFY_LOG or RUST_LOG is set (zero cost otherwise).
    // Supports YIELDIFY_LOG_FORMAT=tree|json|text (see src/tracing_config.rs).
    yieldify::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    let settings = driver::load_settings(&args, &cwd)?;
    let reporter = Reporter::new(!args.no_color && std::io::stderr().is_terminal());

    let status = match &args.command {
        Command::Transform(transform) => {
            handle_transform(transform, settings.with_transform_args(transform)?, &reporter)?
        }
        Command::Cache { action } => {
            match driver::run_cache(*action, &settings)? {
                CacheReport::Dir(dir) => println!("{}", dir.display()),
                CacheReport::Cleared { dir, removed } => {
                    println!("removed {removed} cached file(s) from {}", dir.display());
                }
            }
            EXIT_SUCCESS
        }
        Command::Watch(watch_args) => handle_watch(watch_args, &settings, &reporter)?,
    };

    std::process::exit(status);
}

fn handle_transform(args: &TransformArgs, settings: Settings, reporter: &Reporter) -> Result<i32> {
    let sources = driver::collect_sources(&args.paths)?;
    let results = driver::transform_files(&sources, &settings, args.module);

    let mut status = EXIT_SUCCESS;
    for (source, result) in sources.iter().zip(results) {
        let output = match result {
            Ok(output) => output,
            Err(err) => {
                eprintln!("{}", reporter.format_error(&source.path, &err));
                status = EXIT_FILES_FAILED;
                continue;
            }
        };

        if !output.diagnostics.is_empty() {
            eprintln!("{}", reporter.render(&source.path, &output.diagnostics));
        }

        if args.json {
            println!("{}", serde_json::to_string(&output)?);
        } else if let Some(out_dir) = &args.out_dir {
            let target = driver::write_output(source, out_dir, &output.code)?;
            eprintln!("{}", reporter.format_written(&source.path, &target));
        } else {
            println!("{}", output.code);
        }
    }
    Ok(status)
}

fn handle_watch(args: &WatchArgs, settings: &Settings, reporter: &Reporter) -> Result<i32> {
    if let Some(cache) = &settings.cache {
        eprintln!("caching rewrites in {}", cache.cache_dir().display());
    }
    watch::run(args, settings, |outcome| match outcome {
        Ok(WatchOutcome::Rewrote(path)) => eprintln!("rewrote {}", path.display()),
        Ok(WatchOutcome::Dropped(path)) => eprintln!("dropped {}", path.display()),
        Ok(WatchOutcome::Skipped(_)) => {}
        Err(err) => eprintln!("{}", reporter.format_error(std::path::Path::new("<watch>"), &err)),
    })?;
    Ok(EXIT_SUCCESS)
}
