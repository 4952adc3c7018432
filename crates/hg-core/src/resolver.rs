//! Fallback resolution across inventory sources.
//!
//! Adapters are consulted one at a time in a fixed priority order. The first
//! `Match` ends the chain; skips, errors and clean misses fall through to the
//! next adapter. Errors never abort the chain.

use crate::config::ResolverConfig;
use crate::error::HostgateError;
use crate::validation::ValidatedHostname;
use hg_connectors::{
    AssetRecord, AttemptKind, FlatFileAdapter, KubernetesAdapter, PostgresAdapter,
    ResolutionAttempt, ServiceNowAdapter, SourceAdapter, SourceKind,
};
use hg_observability::metrics::ADAPTER_ATTEMPTS_TOTAL;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One adapter's contribution to a resolution, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub adapter: String,
    pub kind: SourceKind,
    pub outcome: AttemptKind,
    /// Error message or skip reason, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AttemptRecord {
    fn new(adapter: &dyn SourceAdapter, attempt: &ResolutionAttempt) -> Self {
        let detail = match attempt {
            ResolutionAttempt::NotApplicable(reason) => Some(reason.to_string()),
            ResolutionAttempt::AdapterError(e) => Some(e.to_string()),
            ResolutionAttempt::Match(record) if record.is_known_inactive() => {
                Some(format!("status '{}'", record.status))
            }
            _ => None,
        };

        Self {
            adapter: adapter.name().to_string(),
            kind: adapter.kind(),
            outcome: attempt.kind(),
            detail,
        }
    }
}

/// Final result of walking the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// An adapter matched; its record is final.
    Resolved {
        record: AssetRecord,
        source: String,
        attempts: Vec<AttemptRecord>,
    },
    /// Every adapter was skipped, failed, or had no match.
    Unresolved { attempts: Vec<AttemptRecord> },
}

impl ResolutionOutcome {
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            ResolutionOutcome::Resolved { attempts, .. } => attempts,
            ResolutionOutcome::Unresolved { attempts } => attempts,
        }
    }

    /// Name of the adapter that produced the final record.
    pub fn source(&self) -> Option<&str> {
        match self {
            ResolutionOutcome::Resolved { source, .. } => Some(source),
            ResolutionOutcome::Unresolved { .. } => None,
        }
    }

    pub fn record(&self) -> Option<&AssetRecord> {
        match self {
            ResolutionOutcome::Resolved { record, .. } => Some(record),
            ResolutionOutcome::Unresolved { .. } => None,
        }
    }
}

/// Ordered chain of inventory adapters.
pub struct FallbackResolver {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl FallbackResolver {
    /// Builds the production chain: ServiceNow, PostgreSQL, Kubernetes, flat file.
    pub fn from_config(config: &ResolverConfig) -> Result<Self, HostgateError> {
        let servicenow = ServiceNowAdapter::new(config.servicenow.clone())
            .map_err(|e| HostgateError::Config(format!("servicenow: {}", e)))?;

        Ok(Self::with_adapters(vec![
            Arc::new(servicenow),
            Arc::new(PostgresAdapter::new(config.database.clone())),
            Arc::new(KubernetesAdapter::new(config.kubernetes.clone())),
            Arc::new(FlatFileAdapter::new(config.flat_file.clone())),
        ]))
    }

    /// Builds a chain from adapters in priority order.
    pub fn with_adapters(adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn adapters(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    /// Walks the chain for one hostname.
    #[instrument(skip(self), fields(hostname = %hostname))]
    pub async fn resolve(&self, hostname: &ValidatedHostname) -> ResolutionOutcome {
        let mut attempts = Vec::with_capacity(self.adapters.len());

        for adapter in &self.adapters {
            let attempt = adapter.resolve(hostname.as_str()).await;
            let record = AttemptRecord::new(adapter.as_ref(), &attempt);
            log_attempt(adapter.name(), hostname.as_str(), &attempt);

            metrics::counter!(
                ADAPTER_ATTEMPTS_TOTAL,
                "adapter" => adapter.name().to_string(),
                "outcome" => record.outcome.as_str()
            )
            .increment(1);

            attempts.push(record);

            if let ResolutionAttempt::Match(found) = attempt {
                return ResolutionOutcome::Resolved {
                    record: found,
                    source: adapter.name().to_string(),
                    attempts,
                };
            }
        }

        ResolutionOutcome::Unresolved { attempts }
    }
}

fn log_attempt(adapter: &str, hostname: &str, attempt: &ResolutionAttempt) {
    let outcome = attempt.kind();
    match attempt {
        ResolutionAttempt::Match(record) if record.is_known_inactive() => {
            info!(
                adapter,
                hostname,
                outcome = %outcome,
                status = %record.status,
                "Host is known but not active"
            );
        }
        ResolutionAttempt::Match(_) => {
            info!(adapter, hostname, outcome = %outcome, "Host matched");
        }
        ResolutionAttempt::NoMatch => {
            debug!(adapter, hostname, outcome = %outcome, "Host not known to source");
        }
        ResolutionAttempt::NotApplicable(reason) => {
            debug!(adapter, hostname, outcome = %outcome, reason = %reason, "Source skipped");
        }
        ResolutionAttempt::AdapterError(e) => {
            warn!(adapter, hostname, outcome = %outcome, error = %e, "Source lookup failed");
        }
    }
}
