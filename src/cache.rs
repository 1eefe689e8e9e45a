//! On-disk cache of rewritten sources.
//!
//! Each source file maps to one plain-text file in the cache directory, named
//! after the source's absolute path with separators and `:` replaced by `-`.
//! A cached rewrite is fresh while the source's modification time is older
//! than the cache file's.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, trace};

use yieldify_common::limits::CACHE_DIR_NAME;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("the file is not cached: {0}")]
    NotCached(PathBuf),

    #[error("failed to read cached rewrite {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write cached rewrite {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to clear cache directory {path}: {source}")]
    Clear {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Rewritten-source cache rooted at one directory.
#[derive(Debug, Clone)]
pub struct RewriteCache {
    dir: PathBuf,
}

impl Default for RewriteCache {
    fn default() -> Self {
        RewriteCache::new(std::env::temp_dir().join(CACHE_DIR_NAME))
    }
}

impl RewriteCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        RewriteCache { dir: dir.into() }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.dir
    }

    /// Where the rewrite of `source` is stored.
    pub fn cache_path(&self, source: &Path) -> PathBuf {
        self.dir.join(cache_file_name(&absolute(source)))
    }

    /// Whether a rewrite of `source` exists and is newer than `source`.
    pub fn is_cached(&self, source: &Path) -> bool {
        let cached = self.cache_path(source);
        let fresh = match (modified(&cached), modified(&absolute(source))) {
            (Some(cached), Some(original)) => original < cached,
            _ => false,
        };
        trace!(source = %source.display(), fresh, "cache lookup");
        fresh
    }

    pub fn get_cached(&self, source: &Path) -> Result<String, CacheError> {
        if !self.is_cached(source) {
            return Err(CacheError::NotCached(source.to_path_buf()));
        }
        let path = self.cache_path(source);
        let code = fs::read_to_string(&path).map_err(|source| CacheError::Read {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "cache hit");
        Ok(code)
    }

    pub fn write_cached(&self, source: &Path, code: &str) -> Result<(), CacheError> {
        let path = self.cache_path(source);
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Write {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, code).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = code.len(), "cached rewrite");
        Ok(())
    }

    /// Drop the rewrite of one source. Returns whether one existed.
    pub fn invalidate(&self, source: &Path) -> bool {
        let removed = fs::remove_file(self.cache_path(source)).is_ok();
        if removed {
            debug!(source = %source.display(), "invalidated cached rewrite");
        }
        removed
    }

    /// Delete every cached rewrite. Returns how many files were removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(CacheError::Clear {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                fs::remove_file(&path).map_err(|source| CacheError::Clear {
                    path: path.clone(),
                    source,
                })?;
                removed += 1;
            }
        }
        debug!(dir = %self.dir.display(), removed, "cleared rewrite cache");
        Ok(removed)
    }
}

/// Flatten an absolute path into a single file name.
pub fn cache_file_name(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            c => c,
        })
        .collect()
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn modified(path: &Path) -> Option<SystemTime> {
    let meta = fs::metadata(path).ok()?;
    if !meta.is_file() {
        return None;
    }
    meta.modified().ok()
}
