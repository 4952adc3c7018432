//! Source adapter trait definitions for hostgate.
//!
//! This module defines the asset record every inventory source produces, the
//! per-attempt outcome the resolver consumes, and the `SourceAdapter`
//! capability that each backend implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The only status value that authorizes an asset.
pub const ACTIVE_STATUS: &str = "active";

/// Errors that can occur while querying an inventory source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("Data format error: {0}")]
    DataFormat(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl SourceError {
    /// Returns true for network-level failures that might succeed on a later run.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Transport(_) | SourceError::Timeout(_) => true,
            SourceError::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Inventory metadata for one hostname.
///
/// Records are immutable once returned by an adapter. A record with
/// `exists == false` never carries populated fields; use [`AssetRecord::absent`]
/// to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Hostname as received (case-sensitive).
    pub hostname: String,
    /// Whether the source knows this hostname.
    pub exists: bool,
    #[serde(default)]
    pub owner_email: String,
    #[serde(default)]
    pub owner_team: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub cost_center: String,
    /// Free-form lifecycle status; only `"active"` authorizes.
    #[serde(default)]
    pub status: String,
}

impl AssetRecord {
    /// Creates a record for a hostname the source knows about.
    pub fn known(hostname: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            exists: true,
            owner_email: String::new(),
            owner_team: String::new(),
            environment: String::new(),
            cost_center: String::new(),
            status: status.into(),
        }
    }

    /// Creates a record for a hostname the source does not know about.
    pub fn absent(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            exists: false,
            owner_email: String::new(),
            owner_team: String::new(),
            environment: String::new(),
            cost_center: String::new(),
            status: String::new(),
        }
    }

    pub fn with_owner_email(mut self, owner_email: impl Into<String>) -> Self {
        self.owner_email = owner_email.into();
        self
    }

    pub fn with_owner_team(mut self, owner_team: impl Into<String>) -> Self {
        self.owner_team = owner_team.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_cost_center(mut self, cost_center: impl Into<String>) -> Self {
        self.cost_center = cost_center.into();
        self
    }

    /// Returns true if the status is exactly `"active"`.
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_STATUS
    }

    /// Known to the source and active.
    pub fn is_authorizable(&self) -> bool {
        self.exists && self.is_active()
    }

    /// Known to the source but carrying a non-active status.
    pub fn is_known_inactive(&self) -> bool {
        self.exists && !self.is_active()
    }
}

/// Why an adapter was skipped without being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Credentials or an enable switch are missing.
    ConfigurationMissing,
    /// The hostname shape is outside what the source can answer for.
    HostnameShape,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ConfigurationMissing => write!(f, "configuration missing"),
            SkipReason::HostnameShape => write!(f, "hostname shape not applicable"),
        }
    }
}

/// Applicability of an adapter for one hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    Applicable,
    NotApplicable(SkipReason),
}

/// Outcome of one adapter invocation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionAttempt {
    /// The source returned a record for the hostname.
    Match(AssetRecord),
    /// The source answered cleanly and does not know the hostname.
    NoMatch,
    /// The adapter cannot answer for this hostname and was not invoked.
    NotApplicable(SkipReason),
    /// The source could not be queried.
    AdapterError(SourceError),
}

impl ResolutionAttempt {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> AttemptKind {
        match self {
            ResolutionAttempt::Match(record) if record.is_known_inactive() => {
                AttemptKind::MatchInactive
            }
            ResolutionAttempt::Match(_) => AttemptKind::Match,
            ResolutionAttempt::NoMatch => AttemptKind::NoMatch,
            ResolutionAttempt::NotApplicable(_) => AttemptKind::NotApplicable,
            ResolutionAttempt::AdapterError(_) => AttemptKind::Error,
        }
    }
}

impl From<SourceResult<Option<AssetRecord>>> for ResolutionAttempt {
    fn from(result: SourceResult<Option<AssetRecord>>) -> Self {
        match result {
            Ok(Some(record)) => ResolutionAttempt::Match(record),
            Ok(None) => ResolutionAttempt::NoMatch,
            Err(e) => ResolutionAttempt::AdapterError(e),
        }
    }
}

/// Label for a [`ResolutionAttempt`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    Match,
    MatchInactive,
    NoMatch,
    NotApplicable,
    Error,
}

impl AttemptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptKind::Match => "match",
            AttemptKind::MatchInactive => "match_inactive",
            AttemptKind::NoMatch => "no_match",
            AttemptKind::NotApplicable => "not_applicable",
            AttemptKind::Error => "error",
        }
    }
}

impl fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of inventory backend behind an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// CMDB web API.
    Directory,
    /// Relational database.
    Database,
    /// Container orchestration control plane.
    Orchestrator,
    /// Flat-file snapshot.
    FlatFile,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Directory => write!(f, "directory"),
            SourceKind::Database => write!(f, "database"),
            SourceKind::Orchestrator => write!(f, "orchestrator"),
            SourceKind::FlatFile => write!(f, "flat_file"),
        }
    }
}

/// Resolves one hostname against exactly one inventory source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Returns the adapter name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Returns the backend kind.
    fn kind(&self) -> SourceKind;

    /// Decides whether the adapter can answer for this hostname.
    ///
    /// Must not perform I/O.
    fn applicability(&self, hostname: &str) -> Applicability;

    /// Queries the backend.
    ///
    /// `Ok(None)` is a clean miss; `Err` means the source could not answer.
    async fn lookup(&self, hostname: &str) -> SourceResult<Option<AssetRecord>>;

    /// Gates on [`applicability`](Self::applicability) and then performs the lookup.
    async fn resolve(&self, hostname: &str) -> ResolutionAttempt {
        match self.applicability(hostname) {
            Applicability::NotApplicable(reason) => ResolutionAttempt::NotApplicable(reason),
            Applicability::Applicable => self.lookup(hostname).await.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_record_has_no_fields() {
        let record = AssetRecord::absent("ghost.contoso.com");
        assert!(!record.exists);
        assert!(record.owner_email.is_empty());
        assert!(record.owner_team.is_empty());
        assert!(record.status.is_empty());
        assert!(!record.is_authorizable());
        assert!(!record.is_known_inactive());
    }

    #[test]
    fn test_known_inactive_is_distinct_from_absent() {
        let record = AssetRecord::known("old.contoso.com", "retired");
        assert!(record.is_known_inactive());
        assert!(!record.is_authorizable());

        let attempt = ResolutionAttempt::Match(record);
        assert_eq!(attempt.kind(), AttemptKind::MatchInactive);
        assert_eq!(ResolutionAttempt::NoMatch.kind(), AttemptKind::NoMatch);
    }

    #[test]
    fn test_status_is_case_sensitive() {
        let record = AssetRecord::known("app01.contoso.com", "Active");
        assert!(!record.is_active());
    }

    #[test]
    fn test_attempt_from_result() {
        let hit: ResolutionAttempt = Ok(Some(AssetRecord::known("a", ACTIVE_STATUS))).into();
        assert!(matches!(hit, ResolutionAttempt::Match(_)));

        let miss: ResolutionAttempt = Ok(None).into();
        assert_eq!(miss, ResolutionAttempt::NoMatch);

        let err: ResolutionAttempt = Err(SourceError::Timeout("5s".into())).into();
        assert_eq!(err.kind(), AttemptKind::Error);
    }

    #[test]
    fn test_transient_errors() {
        assert!(SourceError::Timeout("x".into()).is_transient());
        assert!(SourceError::Transport("x".into()).is_transient());
        assert!(SourceError::UnexpectedStatus {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());
        assert!(!SourceError::UnexpectedStatus {
            status: 401,
            message: "unauthorized".into()
        }
        .is_transient());
        assert!(!SourceError::DataFormat("bad".into()).is_transient());
    }
}
