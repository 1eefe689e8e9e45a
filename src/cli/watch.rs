//! Watch mode: keep the rewrite cache in step with the files on disk.
//!
//! Changed scripts are dropped from the cache and rewritten again right away;
//! removed scripts are only dropped. Bursts of events are coalesced over a
//! short quiet period so an editor's save sequence triggers one rewrite.
//! Writes into the cache directory itself are never treated as changes, so a
//! cache kept inside a watched directory does not feed back into the watcher.

use anyhow::{Context, Result, bail};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use tracing::{debug, warn};

use crate::loader::transform_module_file;

use super::args::WatchArgs;
use super::driver::{Settings, is_script};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Updated,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    Rewrote(PathBuf),
    Dropped(PathBuf),
    /// Nothing to keep up to date: caching is off.
    Skipped(PathBuf),
}

/// Script changes carried by one filesystem event.
pub fn changes(event: &Event) -> Vec<(PathBuf, Change)> {
    let change = match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => Change::Updated,
        EventKind::Remove(_) => Change::Removed,
        _ => return Vec::new(),
    };
    event
        .paths
        .iter()
        .filter(|path| is_script(path))
        .map(|path| (path.clone(), change))
        .collect()
}

/// Whether `path` is a file the rewrite cache wrote.
pub fn is_cache_output(settings: &Settings, path: &Path) -> bool {
    settings.cache.as_ref().is_some_and(|cache| {
        let dir = cache.cache_dir();
        let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
        path.starts_with(&dir)
    })
}

/// Merge changes, the last one per path winning.
pub fn coalesce(batch: impl IntoIterator<Item = (PathBuf, Change)>) -> BTreeMap<PathBuf, Change> {
    batch.into_iter().collect()
}

/// Bring the cache up to date for one changed path.
pub fn apply_change(settings: &Settings, path: &Path, change: Change) -> Result<WatchOutcome> {
    let Some(cache) = &settings.cache else {
        return Ok(WatchOutcome::Skipped(path.to_path_buf()));
    };
    cache.invalidate(path);
    match change {
        Change::Removed => Ok(WatchOutcome::Dropped(path.to_path_buf())),
        // A rename can report the old name as modified.
        Change::Updated if !path.is_file() => Ok(WatchOutcome::Dropped(path.to_path_buf())),
        Change::Updated => {
            transform_module_file(path, &settings.transform, Some(cache))?;
            Ok(WatchOutcome::Rewrote(path.to_path_buf()))
        }
    }
}

/// Watch `args.dirs` until the watcher shuts down, passing each outcome to
/// `report`.
pub fn run(
    args: &WatchArgs,
    settings: &Settings,
    mut report: impl FnMut(Result<WatchOutcome>),
) -> Result<()> {
    if settings.cache.is_none() {
        bail!("watch keeps the rewrite cache current and cannot run with caching disabled");
    }

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx).context("failed to start file watcher")?;
    for dir in &args.dirs {
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;
        debug!(dir = %dir.display(), "watching");
    }

    let quiet = Duration::from_millis(args.debounce_ms);
    let mut pending = Vec::new();
    loop {
        let received = if pending.is_empty() {
            rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            rx.recv_timeout(quiet)
        };
        match received {
            Ok(Ok(event)) => pending.extend(
                changes(&event)
                    .into_iter()
                    .filter(|(path, _)| !is_cache_output(settings, path)),
            ),
            Ok(Err(err)) => warn!("watch error: {err}"),
            Err(RecvTimeoutError::Timeout) => {
                for (path, change) in coalesce(pending.drain(..)) {
                    report(apply_change(settings, &path, change));
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}
