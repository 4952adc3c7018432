//! hostgate CLI
//!
//! Decides whether a host is a known, active inventory asset before a
//! certificate is issued or renewed for it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod commands;

use hg_core::ResolverConfig;
use hg_observability::LoggingConfig;

#[derive(Parser)]
#[command(name = "hostgate")]
#[command(version)]
#[command(about = "Asset-inventory gate for certificate issuance", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a hostname and print the verdict line
    Resolve {
        /// Hostname to authorize
        hostname: String,

        /// Identity of the requester (recorded in the audit trail only)
        requester: Option<String>,
    },

    /// Inspect or rebuild the flat-file snapshot cache
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },

    /// List inventory sources in priority order
    Sources {
        /// Show whether each source applies to this hostname
        hostname: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show cache path, age, freshness and entry count
    Status,
    /// Rebuild the snapshot from the CSV inventory
    Rebuild,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A missing .env is not an error; real environment variables win.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let logging = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };
    let logging = if cli.log_json { logging.json() } else { logging };
    hg_observability::init_logging_with_config(logging);
    hg_observability::register_metrics();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Resolve {
            hostname,
            requester,
        } => commands::resolve(load_config(config_path), &hostname, requester.as_deref()).await,
        Commands::Cache { action } => finish(load_config(config_path).and_then(|config| {
            match action {
                CacheCommands::Status => commands::cache_status(&config),
                CacheCommands::Rebuild => commands::cache_rebuild(&config),
            }
        })),
        Commands::Sources { hostname } => finish(
            load_config(config_path)
                .and_then(|config| commands::sources(&config, hostname.as_deref())),
        ),
        Commands::Config { show_secrets } => finish(
            load_config(config_path).and_then(|config| commands::show_config(&config, show_secrets)),
        ),
    }
}

fn finish(result: Result<ExitCode>) -> ExitCode {
    result.unwrap_or_else(|e| {
        commands::print_error(&e);
        ExitCode::FAILURE
    })
}

/// Loads the explicit config file, else the per-user default if present.
fn load_config(explicit: Option<&Path>) -> Result<ResolverConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };
    tracing::debug!(path = ?path, "Loading configuration");

    ResolverConfig::load(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration from environment".to_string(),
    })
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "contoso", "hostgate")
        .map(|dirs| dirs.config_dir().join("hostgate.yaml"))
}
