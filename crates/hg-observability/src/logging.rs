//! Logging infrastructure for hostgate.
//!
//! This module provides structured logging using the tracing ecosystem.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Target of decision audit events.
pub const AUDIT_TARGET: &str = "hostgate::audit";

const CRATE_TARGETS: [&str; 4] = ["hg_core", "hg_connectors", "hg_observability", "hostgate"];

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for hostgate crates.
    pub level: Level,
    /// Whether to use JSON format.
    pub json_format: bool,
    /// Whether to include span events.
    pub include_spans: bool,
    /// Whether to include file/line info.
    pub include_location: bool,
    /// Whether to include target (module path).
    pub include_target: bool,
    /// Emit decision audit events regardless of `level`.
    pub audit: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            json_format: false,
            include_spans: false,
            include_location: false,
            include_target: true,
            audit: true,
        }
    }
}

impl LoggingConfig {
    /// Creates a verbose configuration for troubleshooting.
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            include_spans: true,
            include_location: true,
            ..Self::default()
        }
    }

    /// Switches to JSON output.
    pub fn json(mut self) -> Self {
        self.json_format = true;
        self
    }

    /// Filter directives used when `RUST_LOG` is unset.
    pub fn default_directives(&self) -> String {
        let mut directives: Vec<String> = CRATE_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect();
        if self.audit {
            directives.push(format!("{}=info", AUDIT_TARGET));
        }
        directives.join(",")
    }
}

/// Initializes the logging system with the given configuration.
///
/// Must be called at most once per process.
pub fn init_logging_with_config(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));

    let span_events = if config.include_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert!(!config.json_format);
        assert!(config.audit);
    }

    #[test]
    fn test_verbose_json_config() {
        let config = LoggingConfig::verbose().json();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.json_format);
    }

    #[test]
    fn test_default_directives() {
        let directives = LoggingConfig::default().default_directives();
        assert!(directives.contains("hg_core=WARN"));
        assert!(directives.contains("hostgate::audit=info"));

        let quiet = LoggingConfig {
            audit: false,
            ..LoggingConfig::default()
        };
        assert!(!quiet.default_directives().contains("audit"));
    }
}
