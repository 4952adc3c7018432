//! Validated hostname type with RFC 1035 length rules.
//!
//! Every hostname is checked before any inventory source sees it. The
//! hostname flows into a CMDB query string, a SQL bind parameter and a
//! `kubectl` argument, so anything outside the DNS alphabet is rejected.
//!
//! - Maximum hostname length: 253 characters
//! - Maximum label length: 63 characters
//! - Only ASCII alphanumerics, hyphens and dots
//! - No shell metacharacters
//! - Labels cannot start or end with a hyphen
//!
//! Case is preserved: inventory identity is case-sensitive as received.
//!
//! # Example
//!
//! ```
//! use hg_core::validation::ValidatedHostname;
//!
//! let hostname = ValidatedHostname::new("App01.contoso.com").unwrap();
//! assert_eq!(hostname.as_str(), "App01.contoso.com");
//!
//! assert!(ValidatedHostname::new("app01; rm -rf /").is_err());
//! ```

use std::fmt;
use thiserror::Error;

/// Maximum length of a complete hostname (RFC 1035).
const MAX_HOSTNAME_LENGTH: usize = 253;

/// Maximum length of a hostname label (RFC 1035).
const MAX_LABEL_LENGTH: usize = 63;

const SHELL_METACHARACTERS: &[char] = &[
    ';', '|', '&', '$', '`', '(', ')', '{', '}', '[', ']', '<', '>', '\'', '"', '\\', '!', '*',
    '?', '~', '#', '%', '^', '\n', '\r', '\t', '\0',
];

/// Errors that can occur when validating a hostname.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostnameValidationError {
    #[error("hostname cannot be empty")]
    Empty,

    #[error("hostname exceeds maximum length of {MAX_HOSTNAME_LENGTH} characters (got {0})")]
    TooLong(usize),

    #[error(
        "label '{label}' exceeds maximum length of {MAX_LABEL_LENGTH} characters (got {length})"
    )]
    LabelTooLong { label: String, length: usize },

    /// Consecutive dots or a leading/trailing dot.
    #[error("hostname contains empty label (consecutive dots or leading/trailing dot)")]
    EmptyLabel,

    #[error("hostname contains invalid character: '{0}'")]
    InvalidCharacter(char),

    #[error("hostname contains shell metacharacter '{0}'")]
    ShellMetacharacter(char),

    #[error("label '{0}' cannot start or end with a hyphen")]
    InvalidHyphenPosition(String),
}

/// A hostname that passed validation, kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedHostname(String);

impl ValidatedHostname {
    pub fn new(hostname: &str) -> Result<Self, HostnameValidationError> {
        if hostname.is_empty() {
            return Err(HostnameValidationError::Empty);
        }

        // Metacharacters are reported ahead of every other problem.
        if let Some(c) = hostname.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
            return Err(HostnameValidationError::ShellMetacharacter(c));
        }

        if hostname.len() > MAX_HOSTNAME_LENGTH {
            return Err(HostnameValidationError::TooLong(hostname.len()));
        }

        if let Some(c) = hostname
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '.')
        {
            return Err(HostnameValidationError::InvalidCharacter(c));
        }

        for label in hostname.split('.') {
            if label.is_empty() {
                return Err(HostnameValidationError::EmptyLabel);
            }

            if label.len() > MAX_LABEL_LENGTH {
                return Err(HostnameValidationError::LabelTooLong {
                    label: label.to_string(),
                    length: label.len(),
                });
            }

            if label.starts_with('-') || label.ends_with('-') {
                return Err(HostnameValidationError::InvalidHyphenPosition(
                    label.to_string(),
                ));
            }
        }

        Ok(ValidatedHostname(hostname.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatedHostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ValidatedHostname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for ValidatedHostname {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<ValidatedHostname> for String {
    fn from(hostname: ValidatedHostname) -> Self {
        hostname.0
    }
}
