//! # hg-core
//!
//! Core resolution logic for hostgate.
//!
//! Given a hostname, hostgate asks a fixed chain of inventory sources whether
//! the host is a known, active asset and turns the first definitive answer
//! into an `AUTHORIZED` or `DENIED` verdict.

pub mod audit;
pub mod authorize;
pub mod config;
pub mod error;
pub mod policy;
pub mod resolver;
pub mod validation;

pub use audit::DecisionAuditEntry;
pub use authorize::{authorize, AccessDecision};
pub use config::ResolverConfig;
pub use error::HostgateError;
pub use policy::{AuthorizationPolicy, DenialReason, OutputStream, RenderedVerdict, Verdict};
pub use resolver::{AttemptRecord, FallbackResolver, ResolutionOutcome};
pub use validation::{HostnameValidationError, ValidatedHostname};
