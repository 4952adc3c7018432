//! Fixtures shared by adapter and resolver tests.

use crate::flat_file::FlatFileConfig;
use crate::traits::{AssetRecord, ACTIVE_STATUS};
use std::path::Path;

/// Canonical CSV header.
pub const INVENTORY_HEADER: &str =
    "hostname,owner_email,owner_team,environment,cost_center,status";

/// Creates an active record with ownership fields populated.
pub fn active_record(
    hostname: &str,
    team: &str,
    environment: &str,
    cost_center: &str,
) -> AssetRecord {
    AssetRecord::known(hostname, ACTIVE_STATUS)
        .with_owner_email(format!("{}@contoso.com", team))
        .with_owner_team(team)
        .with_environment(environment)
        .with_cost_center(cost_center)
}

/// Writes `csv` into `dir` and returns a flat-file config pointing at it,
/// with the cache file placed alongside.
pub fn flat_file_config_in(dir: &Path, csv: &str) -> std::io::Result<FlatFileConfig> {
    let csv_path = dir.join("asset-inventory.csv");
    std::fs::write(&csv_path, csv)?;
    Ok(FlatFileConfig {
        csv_path,
        cache_path: dir.join("asset-inventory-cache.json"),
        cache_ttl_secs: 3600,
    })
}
