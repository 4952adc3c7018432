//! On-disk snapshot cache.
//!
//! The cache file is a pretty-printed JSON object mapping hostname to record.
//! Its modification time is the build timestamp. Writes go through a temp
//! file in the same directory followed by a rename, so readers in other
//! processes see either the old or the new snapshot, never a partial one.
//! Concurrent rebuilds are not coordinated; the last rename wins.

use super::inventory::InventorySnapshot;
use crate::traits::{SourceError, SourceResult};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

#[cfg(unix)]
const CACHE_FILE_MODE: u32 = 0o644;

/// Point-in-time view of the cache file.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub path: PathBuf,
    pub exists: bool,
    /// Time since the last rebuild, when known.
    pub age_secs: Option<u64>,
    pub fresh: bool,
    /// Entries in the snapshot; `None` when the file is missing or unreadable.
    pub entries: Option<usize>,
}

/// Persists and serves one inventory snapshot.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Age of the snapshot according to its modification time.
    ///
    /// A modification time in the future counts as age zero.
    pub fn age(&self) -> Option<Duration> {
        let modified = std::fs::metadata(&self.path).and_then(|m| m.modified()).ok()?;
        Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        )
    }

    /// True iff the snapshot exists and is younger than `ttl`.
    ///
    /// Never fails: a missing or unreadable file is stale.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age().is_some_and(|age| age < ttl)
    }

    /// Reads the snapshot.
    ///
    /// Returns `Ok(None)` when no cache file exists and a `DataFormat` error
    /// when the file cannot be parsed.
    pub fn load(&self) -> SourceResult<Option<InventorySnapshot>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SourceError::Io(format!(
                    "failed to read cache {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&json).map(Some).map_err(|e| {
            SourceError::DataFormat(format!("corrupt cache {}: {}", self.path.display(), e))
        })
    }

    /// Atomically replaces the snapshot.
    pub fn store(&self, snapshot: &InventorySnapshot) -> SourceResult<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| io_error(&parent, e))?;

        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| SourceError::DataFormat(format!("failed to encode snapshot: {}", e)))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| io_error(&parent, e))?;
        tmp.write_all(&json).map_err(|e| io_error(tmp.path(), e))?;
        tmp.as_file().sync_all().map_err(|e| io_error(tmp.path(), e))?;
        // Temp files are created 0600; the snapshot is shared across users.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(CACHE_FILE_MODE))
                .map_err(|e| io_error(tmp.path(), e))?;
        }
        tmp.persist(&self.path)
            .map_err(|e| io_error(&self.path, e.error))?;

        debug!(path = %self.path.display(), entries = snapshot.len(), "Snapshot persisted");
        Ok(())
    }

    pub fn status(&self, ttl: Duration) -> CacheStatus {
        let age = self.age();
        CacheStatus {
            path: self.path.clone(),
            exists: age.is_some(),
            age_secs: age.map(|a| a.as_secs()),
            fresh: age.is_some_and(|a| a < ttl),
            entries: self.load().ok().flatten().map(|s| s.len()),
        }
    }
}

fn io_error(path: &Path, e: std::io::Error) -> SourceError {
    SourceError::Io(format!("{}: {}", path.display(), e))
}
