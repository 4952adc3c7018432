//! Error types for hostgate core.

use crate::validation::HostnameValidationError;
use thiserror::Error;

/// Errors raised before or around resolution.
///
/// Adapter failures are not errors at this level; they are recorded as
/// attempts and folded into the verdict.
#[derive(Error, Debug)]
pub enum HostgateError {
    #[error("Invalid hostname: {0}")]
    InvalidHostname(#[from] HostnameValidationError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_yaml::Error> for HostgateError {
    fn from(err: serde_yaml::Error) -> Self {
        HostgateError::Config(err.to_string())
    }
}
