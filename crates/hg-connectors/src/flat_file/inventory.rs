//! CSV inventory parsing.
//!
//! The first row names the columns; rows are mapped by header name so column
//! order is free. Only active rows make it into the snapshot.

use crate::traits::{AssetRecord, SourceError, SourceResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use tracing::debug;

const HOSTNAME: &str = "hostname";
const OWNER_EMAIL: &str = "owner_email";
const OWNER_TEAM: &str = "owner_team";
const ENVIRONMENT: &str = "environment";
const COST_CENTER: &str = "cost_center";
const STATUS: &str = "status";

/// Active assets indexed by hostname.
///
/// Serializes as a JSON object with keys in sorted order, so two snapshots
/// built from the same input serialize to identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventorySnapshot {
    entries: BTreeMap<String, AssetRecord>,
}

impl InventorySnapshot {
    pub fn get(&self, hostname: &str) -> Option<&AssetRecord> {
        self.entries.get(hostname)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, record: AssetRecord) {
        self.entries.insert(record.hostname.clone(), record);
    }
}

/// Counts gathered while parsing one inventory file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    /// Data rows read, excluding the header.
    pub rows: usize,
    /// Rows indexed into the snapshot.
    pub indexed: usize,
    /// Well-formed rows left out for a non-active status.
    pub inactive: usize,
    /// Rows skipped as malformed (short, unreadable, or without a hostname).
    pub malformed: usize,
}

/// Column positions resolved from the header row.
#[derive(Debug)]
struct ColumnMap {
    width: usize,
    hostname: usize,
    owner_email: Option<usize>,
    owner_team: Option<usize>,
    environment: Option<usize>,
    cost_center: Option<usize>,
    status: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> SourceResult<Self> {
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(SourceError::DataFormat(
                "inventory file has no header row".to_string(),
            ));
        }

        let position = |name: &str| headers.iter().position(|h| h == name);

        let hostname = position(HOSTNAME).ok_or_else(|| {
            SourceError::DataFormat(format!("inventory header has no '{}' column", HOSTNAME))
        })?;

        Ok(Self {
            width: headers.len(),
            hostname,
            owner_email: position(OWNER_EMAIL),
            owner_team: position(OWNER_TEAM),
            environment: position(ENVIRONMENT),
            cost_center: position(COST_CENTER),
            status: position(STATUS),
        })
    }

    fn field(row: &csv::StringRecord, index: Option<usize>) -> String {
        index
            .and_then(|i| row.get(i))
            .map(String::from)
            .unwrap_or_default()
    }

    fn to_record(&self, row: &csv::StringRecord) -> Option<AssetRecord> {
        let hostname = row.get(self.hostname).filter(|h| !h.is_empty())?;

        Some(
            AssetRecord::known(hostname, Self::field(row, self.status))
                .with_owner_email(Self::field(row, self.owner_email))
                .with_owner_team(Self::field(row, self.owner_team))
                .with_environment(Self::field(row, self.environment))
                .with_cost_center(Self::field(row, self.cost_center)),
        )
    }
}

/// Parses an inventory file into a snapshot of its active rows.
///
/// Returns an error only when the file as a whole is unusable (unreadable,
/// empty, or missing a `hostname` column). Individual bad rows are skipped.
pub fn parse_inventory<R: Read>(reader: R) -> SourceResult<(InventorySnapshot, ParseStats)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| SourceError::Io(format!("failed to read inventory header: {}", e)))?
        .clone();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut snapshot = InventorySnapshot::default();
    let mut stats = ParseStats::default();

    for (line, result) in csv_reader.records().enumerate() {
        stats.rows += 1;

        let row = match result {
            Ok(row) => row,
            Err(e) if e.is_io_error() => {
                return Err(SourceError::Io(format!("failed to read inventory: {}", e)))
            }
            Err(e) => {
                debug!(line = line + 2, error = %e, "Skipping unreadable inventory row");
                stats.malformed += 1;
                continue;
            }
        };

        if row.len() < columns.width {
            debug!(
                line = line + 2,
                fields = row.len(),
                expected = columns.width,
                "Skipping short inventory row"
            );
            stats.malformed += 1;
            continue;
        }

        let Some(record) = columns.to_record(&row) else {
            debug!(line = line + 2, "Skipping inventory row without hostname");
            stats.malformed += 1;
            continue;
        };

        if !record.is_active() {
            debug!(
                hostname = %record.hostname,
                status = %record.status,
                "Inventory row is known but not active; leaving it out of the snapshot"
            );
            stats.inactive += 1;
            continue;
        }

        snapshot.insert(record);
    }

    stats.indexed = snapshot.len();
    Ok((snapshot, stats))
}
