//! End-to-end authorization of one hostname.

use crate::audit::DecisionAuditEntry;
use crate::error::HostgateError;
use crate::policy::{AuthorizationPolicy, RenderedVerdict, Verdict};
use crate::resolver::{FallbackResolver, ResolutionOutcome};
use crate::validation::ValidatedHostname;

/// Outcome of [`authorize`].
#[derive(Debug, Clone)]
pub struct AccessDecision {
    pub hostname: ValidatedHostname,
    pub outcome: ResolutionOutcome,
    pub verdict: Verdict,
}

impl AccessDecision {
    pub fn render(&self) -> RenderedVerdict {
        self.verdict.render(self.hostname.as_str())
    }
}

/// Validates `hostname`, walks the fallback chain, applies the policy and
/// emits the audit event.
///
/// Only an invalid hostname is an error; source failures end up in the
/// verdict.
pub async fn authorize(
    resolver: &FallbackResolver,
    hostname: &str,
    requester: Option<&str>,
) -> Result<AccessDecision, HostgateError> {
    let hostname = ValidatedHostname::new(hostname)?;
    let outcome = resolver.resolve(&hostname).await;
    let verdict = AuthorizationPolicy::new().decide(&outcome);

    DecisionAuditEntry::new(hostname.as_str(), requester, &outcome, &verdict).emit();

    Ok(AccessDecision {
        hostname,
        outcome,
        verdict,
    })
}
