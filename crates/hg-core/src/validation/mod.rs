//! Input validation.

pub mod hostname;

pub use hostname::{HostnameValidationError, ValidatedHostname};
