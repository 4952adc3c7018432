//! # hg-observability
//!
//! Logging and metrics infrastructure for hostgate.
//!
//! Log output always goes to stderr; stdout is reserved for the verdict line.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging_with_config, LoggingConfig, AUDIT_TARGET};
pub use self::metrics::register_metrics;
