//! Decision audit trail.
//!
//! Every resolution produces one audit event on the `hostgate::audit`
//! target. The requester identity is recorded as supplied and plays no part
//! in the decision.

use crate::policy::Verdict;
use crate::resolver::ResolutionOutcome;
use chrono::{DateTime, Utc};
use hg_observability::AUDIT_TARGET;
use serde::Serialize;
use tracing::info;

/// One audited authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionAuditEntry {
    pub timestamp: DateTime<Utc>,
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
    pub verdict: Verdict,
    /// Adapter whose record decided the verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Adapters consulted, in order.
    pub consulted: Vec<String>,
}

impl DecisionAuditEntry {
    pub fn new(
        hostname: &str,
        requester: Option<&str>,
        outcome: &ResolutionOutcome,
        verdict: &Verdict,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            hostname: hostname.to_string(),
            requester: requester.map(String::from),
            verdict: verdict.clone(),
            source: outcome.source().map(String::from),
            consulted: outcome
                .attempts()
                .iter()
                .map(|a| format!("{}={}", a.adapter, a.outcome))
                .collect(),
        }
    }

    /// Writes the entry to the audit target.
    pub fn emit(&self) {
        let verdict = serde_json::to_string(&self.verdict).unwrap_or_default();
        info!(
            target: AUDIT_TARGET,
            timestamp = %self.timestamp.to_rfc3339(),
            hostname = %self.hostname,
            requester = self.requester.as_deref().unwrap_or("-"),
            verdict = %verdict,
            source = self.source.as_deref().unwrap_or("-"),
            consulted = %self.consulted.join(","),
            "authorization decision"
        );
    }
}
