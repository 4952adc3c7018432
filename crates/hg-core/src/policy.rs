//! Authorization policy.
//!
//! Maps the single final record of a resolution (or its absence) to a
//! verdict, and renders the verdict as the one-line result contract.

use crate::resolver::ResolutionOutcome;
use hg_connectors::AttemptKind;
use hg_observability::metrics::VERDICTS_TOTAL;
use serde::Serialize;
use std::fmt;

/// Why a host was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenialReason {
    /// No source knows the host.
    NotFound,
    /// A source knows the host but its status is not `active`.
    Inactive { status: String, source: String },
    /// No source answered cleanly and at least one failed.
    SourcesUnavailable { detail: String },
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::NotFound => write!(f, "not found in any inventory source"),
            DenialReason::Inactive { status, source } => {
                write!(f, "status '{}' in {}", status, source)
            }
            DenialReason::SourcesUnavailable { detail } => {
                write!(f, "no inventory source available: {}", detail)
            }
        }
    }
}

/// Final authorization decision for one hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Authorized {
        team: String,
        environment: String,
        cost_center: String,
    },
    Denied {
        #[serde(flatten)]
        reason: DenialReason,
    },
}

impl Verdict {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Verdict::Authorized { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Authorized { .. } => "authorized",
            Verdict::Denied { .. } => "denied",
        }
    }

    /// Renders the result line and exit code for `hostname`.
    pub fn render(&self, hostname: &str) -> RenderedVerdict {
        match self {
            Verdict::Authorized {
                team,
                environment,
                cost_center,
            } => RenderedVerdict {
                stream: OutputStream::Stdout,
                line: format!("AUTHORIZED|{}|{}|{}", team, environment, cost_center),
                exit_code: 0,
            },
            Verdict::Denied {
                reason: reason @ DenialReason::SourcesUnavailable { .. },
            } => RenderedVerdict::validation_error(reason),
            Verdict::Denied { .. } => RenderedVerdict {
                stream: OutputStream::Stdout,
                line: format!(
                    "DENIED|Device '{}' not found in any inventory source",
                    hostname
                ),
                exit_code: 1,
            },
        }
    }
}

/// Where a rendered line is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// A verdict ready to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedVerdict {
    pub stream: OutputStream,
    pub line: String,
    pub exit_code: i32,
}

impl RenderedVerdict {
    /// The `DENIED|Validation error: ...` line written to stderr.
    ///
    /// Upstream error text (HTTP bodies, kubectl stderr) is folded onto one
    /// line.
    pub fn validation_error(detail: impl fmt::Display) -> Self {
        Self {
            stream: OutputStream::Stderr,
            line: format!("DENIED|Validation error: {}", single_line(&detail.to_string())),
            exit_code: 1,
        }
    }
}

/// Replaces control characters and collapses whitespace runs to one space.
fn single_line(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stateless verdict policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationPolicy;

impl AuthorizationPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Decides on the final record only; attempts are consulted solely to
    /// tell "not found" apart from "no source could answer".
    pub fn decide(&self, outcome: &ResolutionOutcome) -> Verdict {
        let verdict = match outcome {
            ResolutionOutcome::Resolved { record, .. } if record.is_authorizable() => {
                Verdict::Authorized {
                    team: record.owner_team.clone(),
                    environment: record.environment.clone(),
                    cost_center: record.cost_center.clone(),
                }
            }
            ResolutionOutcome::Resolved { record, source, .. } if record.exists => {
                Verdict::Denied {
                    reason: DenialReason::Inactive {
                        status: record.status.clone(),
                        source: source.clone(),
                    },
                }
            }
            ResolutionOutcome::Resolved { .. } => Verdict::Denied {
                reason: DenialReason::NotFound,
            },
            ResolutionOutcome::Unresolved { attempts } => {
                let answered = attempts.iter().any(|a| a.outcome == AttemptKind::NoMatch);
                let failures: Vec<String> = attempts
                    .iter()
                    .filter(|a| a.outcome == AttemptKind::Error)
                    .map(|a| format!("{}: {}", a.adapter, a.detail.as_deref().unwrap_or("error")))
                    .collect();

                if !answered && !failures.is_empty() {
                    Verdict::Denied {
                        reason: DenialReason::SourcesUnavailable {
                            detail: failures.join("; "),
                        },
                    }
                } else {
                    Verdict::Denied {
                        reason: DenialReason::NotFound,
                    }
                }
            }
        };

        metrics::counter!(VERDICTS_TOTAL, "verdict" => verdict.label()).increment(1);
        verdict
    }
}
