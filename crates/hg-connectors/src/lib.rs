//! # hg-connectors
//!
//! Inventory source adapters for hostgate.
//!
//! This crate defines the asset record model and the [`SourceAdapter`]
//! capability, plus one adapter per backend: the ServiceNow CMDB, the
//! PostgreSQL asset database, Kubernetes namespaces and the CSV flat file
//! with its snapshot cache.

pub mod database;
pub mod directory;
pub mod flat_file;
pub mod http;
pub mod mock;
pub mod orchestrator;
pub mod secure_string;
pub mod testing;
pub mod traits;

pub use secure_string::SecureString;

pub use traits::{
    Applicability, AssetRecord, AttemptKind, ResolutionAttempt, SkipReason, SourceAdapter,
    SourceError, SourceKind, SourceResult, ACTIVE_STATUS,
};

pub use database::{DatabaseConfig, PostgresAdapter};
pub use directory::{ServiceNowAdapter, ServiceNowConfig};
pub use flat_file::{
    CacheStatus, CacheStore, FlatFileAdapter, FlatFileConfig, FlatFileStats, InventorySnapshot,
    RebuildSummary,
};
pub use mock::MockSourceAdapter;
pub use orchestrator::{
    KubectlNamespaceSource, KubernetesAdapter, KubernetesConfig, NamespaceMetadata,
    NamespaceSource,
};
