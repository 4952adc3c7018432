//! CSV flat-file adapter with a TTL-gated snapshot cache.
//!
//! The adapter never reads the CSV while the cached snapshot is fresh. A
//! stale, missing or corrupt cache triggers one rebuild from the CSV.

pub mod cache_store;
pub mod inventory;

pub use cache_store::{CacheStatus, CacheStore};
pub use inventory::{parse_inventory, InventorySnapshot, ParseStats};

use crate::traits::{
    Applicability, AssetRecord, SourceAdapter, SourceError, SourceKind, SourceResult,
};
use async_trait::async_trait;
use hg_observability::metrics::{CACHE_HITS_TOTAL, CACHE_REBUILDS_TOTAL};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Flat-file source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatFileConfig {
    pub csv_path: PathBuf,
    pub cache_path: PathBuf,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

impl Default for FlatFileConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("/opt/keyfactor/asset-inventory/asset-inventory.csv"),
            cache_path: std::env::temp_dir().join("asset-inventory-cache.json"),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl FlatFileConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Counters for cache behaviour within one process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlatFileStats {
    /// Lookups answered from a fresh cached snapshot.
    pub hits: u64,
    /// Lookups that found the cache stale, missing or corrupt.
    pub misses: u64,
    /// Snapshots rebuilt from the CSV.
    pub rebuilds: u64,
}

/// Summary of one rebuild.
#[derive(Debug, Clone, Serialize)]
pub struct RebuildSummary {
    pub entries: usize,
    pub stats: ParseStats,
    /// False when the snapshot could not be written to the cache path.
    pub persisted: bool,
}

/// Last-resort adapter backed by the CSV inventory.
pub struct FlatFileAdapter {
    config: FlatFileConfig,
    store: CacheStore,
    hits: AtomicU64,
    misses: AtomicU64,
    rebuilds: AtomicU64,
}

impl FlatFileAdapter {
    pub fn new(config: FlatFileConfig) -> Self {
        let store = CacheStore::new(config.cache_path.clone());
        Self {
            config,
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            rebuilds: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &FlatFileConfig {
        &self.config
    }

    pub fn stats(&self) -> FlatFileStats {
        FlatFileStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
        }
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.store.status(self.config.cache_ttl())
    }

    /// Rebuilds the snapshot from the CSV regardless of freshness.
    pub fn rebuild(&self) -> SourceResult<RebuildSummary> {
        self.build().map(|(_, summary)| summary)
    }

    fn build(&self) -> SourceResult<(InventorySnapshot, RebuildSummary)> {
        let file = std::fs::File::open(&self.config.csv_path).map_err(|e| {
            SourceError::Io(format!(
                "failed to open inventory {}: {}",
                self.config.csv_path.display(),
                e
            ))
        })?;

        let (snapshot, stats) = parse_inventory(std::io::BufReader::new(file))?;
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(CACHE_REBUILDS_TOTAL).increment(1);

        let persisted = match self.store.store(&snapshot) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to persist inventory snapshot; serving from memory");
                false
            }
        };

        info!(
            csv = %self.config.csv_path.display(),
            entries = snapshot.len(),
            inactive = stats.inactive,
            malformed = stats.malformed,
            "Inventory snapshot rebuilt"
        );

        let summary = RebuildSummary {
            entries: snapshot.len(),
            stats,
            persisted,
        };
        Ok((snapshot, summary))
    }

    /// Returns the cached snapshot when fresh and readable, else rebuilds.
    fn snapshot(&self) -> SourceResult<InventorySnapshot> {
        if self.store.is_fresh(self.config.cache_ttl()) {
            match self.store.load() {
                Ok(Some(snapshot)) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!(CACHE_HITS_TOTAL).increment(1);
                    return Ok(snapshot);
                }
                Ok(None) => debug!("Cache vanished after freshness check"),
                Err(e) => warn!(error = %e, "Cached snapshot unusable; rebuilding"),
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        self.build().map(|(snapshot, _)| snapshot)
    }
}

#[async_trait]
impl SourceAdapter for FlatFileAdapter {
    fn name(&self) -> &str {
        "flat_file"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::FlatFile
    }

    fn applicability(&self, _hostname: &str) -> Applicability {
        Applicability::Applicable
    }

    #[instrument(skip(self), fields(csv = %self.config.csv_path.display()))]
    async fn lookup(&self, hostname: &str) -> SourceResult<Option<AssetRecord>> {
        let snapshot = self.snapshot()?;
        Ok(snapshot.get(hostname).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ResolutionAttempt;
    use std::time::SystemTime;
    use tempfile::TempDir;

    const INVENTORY: &str = "hostname,owner_email,owner_team,environment,cost_center,status\n\
        app01.contoso.com,web@contoso.com,web-apps,prod,1001,active\n\
        old01.contoso.com,legacy@contoso.com,legacy,prod,1001,decommissioned\n";

    fn adapter_with(dir: &TempDir, csv: &str) -> FlatFileAdapter {
        let csv_path = dir.path().join("asset-inventory.csv");
        std::fs::write(&csv_path, csv).unwrap();
        FlatFileAdapter::new(FlatFileConfig {
            csv_path,
            cache_path: dir.path().join("cache").join("asset-inventory-cache.json"),
            cache_ttl_secs: 3600,
        })
    }

    fn backdate(path: &std::path::Path, by: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    #[tokio::test]
    async fn test_lookup_builds_cache_on_first_use() {
        let dir = TempDir::new().unwrap();
        let adapter = adapter_with(&dir, INVENTORY);

        let record = adapter.lookup("app01.contoso.com").await.unwrap().unwrap();
        assert_eq!(record.owner_team, "web-apps");
        assert!(adapter.config().cache_path.exists());
        assert_eq!(
            adapter.stats(),
            FlatFileStats {
                hits: 0,
                misses: 1,
                rebuilds: 1
            }
        );
    }

    #[tokio::test]
    async fn test_inactive_row_resolves_like_unknown_host() {
        let dir = TempDir::new().unwrap();
        let adapter = adapter_with(&dir, INVENTORY);

        assert_eq!(
            adapter.resolve("old01.contoso.com").await,
            ResolutionAttempt::NoMatch
        );
        assert_eq!(
            adapter.resolve("never-listed.contoso.com").await,
            ResolutionAttempt::NoMatch
        );
    }

    #[tokio::test]
    async fn test_fresh_cache_does_not_reread_csv() {
        let dir = TempDir::new().unwrap();
        let adapter = adapter_with(&dir, INVENTORY);
        adapter.lookup("app01.contoso.com").await.unwrap();

        std::fs::remove_file(&adapter.config().csv_path).unwrap();

        for _ in 0..3 {
            let record = adapter.lookup("app01.contoso.com").await.unwrap();
            assert!(record.is_some());
        }
        let stats = adapter.stats();
        assert_eq!(stats.rebuilds, 1);
        assert_eq!(stats.hits, 3);
    }

    #[tokio::test]
    async fn test_expired_cache_rebuilds_exactly_once() {
        let dir = TempDir::new().unwrap();
        let adapter = adapter_with(&dir, INVENTORY);
        adapter.lookup("app01.contoso.com").await.unwrap();

        backdate(&adapter.config().cache_path, Duration::from_secs(7200));

        adapter.lookup("app01.contoso.com").await.unwrap();
        adapter.lookup("app01.contoso.com").await.unwrap();

        let stats = adapter.stats();
        assert_eq!(stats.rebuilds, 2);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_rebuild_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let adapter = adapter_with(&dir, INVENTORY);

        adapter.rebuild().unwrap();
        let first = std::fs::read(&adapter.config().cache_path).unwrap();
        adapter.rebuild().unwrap();
        let second = std::fs::read(&adapter.config().cache_path).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_rebuilt() {
        let dir = TempDir::new().unwrap();
        let adapter = adapter_with(&dir, INVENTORY);
        let cache_path = adapter.config().cache_path.clone();
        std::fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
        std::fs::write(&cache_path, "{not json").unwrap();

        let record = adapter.lookup("app01.contoso.com").await.unwrap();
        assert!(record.is_some());
        assert_eq!(adapter.stats().rebuilds, 1);
        assert!(CacheStore::new(&cache_path).load().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_csv_is_adapter_error() {
        let dir = TempDir::new().unwrap();
        let adapter = FlatFileAdapter::new(FlatFileConfig {
            csv_path: dir.path().join("missing.csv"),
            cache_path: dir.path().join("cache.json"),
            cache_ttl_secs: 3600,
        });

        assert!(matches!(
            adapter.resolve("app01.contoso.com").await,
            ResolutionAttempt::AdapterError(SourceError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_unwritable_cache_still_answers() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("asset-inventory.csv");
        std::fs::write(&csv_path, INVENTORY).unwrap();
        // A regular file where the cache directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let adapter = FlatFileAdapter::new(FlatFileConfig {
            csv_path,
            cache_path: blocker.join("cache.json"),
            cache_ttl_secs: 3600,
        });

        let record = adapter.lookup("app01.contoso.com").await.unwrap();
        assert!(record.is_some());
        assert!(!adapter.rebuild().unwrap().persisted);
    }
}
