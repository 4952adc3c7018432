//! Subcommand implementations.

use anyhow::{Context, Result};
use colored::Colorize;
use hg_connectors::{Applicability, FlatFileAdapter};
use hg_core::{
    authorize, FallbackResolver, HostgateError, OutputStream, RenderedVerdict, ResolverConfig,
    ValidatedHostname,
};
use std::process::ExitCode;

/// Runs one authorization and prints the verdict line.
///
/// Every failure, including a bad configuration, still ends in a single
/// `DENIED|...` line so callers only ever parse one format.
pub async fn resolve(
    config: Result<ResolverConfig>,
    hostname: &str,
    requester: Option<&str>,
) -> ExitCode {
    let rendered = match config {
        Ok(config) => resolve_with(&config, hostname, requester).await,
        Err(e) => RenderedVerdict::validation_error(format!("{:#}", e)),
    };
    emit(&rendered)
}

async fn resolve_with(
    config: &ResolverConfig,
    hostname: &str,
    requester: Option<&str>,
) -> RenderedVerdict {
    let resolver = match FallbackResolver::from_config(config) {
        Ok(resolver) => resolver,
        Err(e) => return RenderedVerdict::validation_error(e),
    };

    match authorize(&resolver, hostname, requester).await {
        Ok(decision) => decision.render(),
        Err(HostgateError::InvalidHostname(e)) => RenderedVerdict::validation_error(e),
        Err(e @ HostgateError::Config(_)) => RenderedVerdict::validation_error(e),
    }
}

fn emit(rendered: &RenderedVerdict) -> ExitCode {
    match rendered.stream {
        OutputStream::Stdout => println!("{}", rendered.line),
        OutputStream::Stderr => eprintln!("{}", rendered.line),
    }
    ExitCode::from(u8::try_from(rendered.exit_code).unwrap_or(1))
}

pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "error:".red().bold(), err);
}

pub fn cache_status(config: &ResolverConfig) -> Result<ExitCode> {
    let status = FlatFileAdapter::new(config.flat_file.clone()).cache_status();

    println!("{}", "Flat-file cache".bold());
    println!("  {} {}", "CSV:".cyan(), config.flat_file.csv_path.display());
    println!("  {} {}", "Cache:".cyan(), status.path.display());
    println!("  {} {}s", "TTL:".cyan(), config.flat_file.cache_ttl_secs);

    if !status.exists {
        println!("  {} no snapshot on disk", "✗".yellow());
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(age) = status.age_secs {
        println!("  {} {}s", "Age:".cyan(), age);
    }
    match status.entries {
        Some(entries) => println!("  {} {}", "Entries:".cyan(), entries),
        None => println!("  {} snapshot unreadable", "✗".red()),
    }
    if status.fresh {
        println!("  {} fresh", "✓".green());
    } else {
        println!("  {} stale, rebuilt on next lookup", "✗".yellow());
    }

    Ok(ExitCode::SUCCESS)
}

pub fn cache_rebuild(config: &ResolverConfig) -> Result<ExitCode> {
    let adapter = FlatFileAdapter::new(config.flat_file.clone());
    let summary = adapter.rebuild().with_context(|| {
        format!(
            "failed to rebuild snapshot from {}",
            config.flat_file.csv_path.display()
        )
    })?;

    println!(
        "{} Indexed {} hosts from {} rows",
        "✓".green(),
        summary.entries,
        summary.stats.rows
    );
    if summary.stats.inactive > 0 {
        println!("  {} {} inactive rows", "→".cyan(), summary.stats.inactive);
    }
    if summary.stats.malformed > 0 {
        println!(
            "  {} {} malformed rows skipped",
            "!".yellow(),
            summary.stats.malformed
        );
    }

    if summary.persisted {
        println!("  {} Written to {}", "→".cyan(), config.flat_file.cache_path.display());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "  {} Could not write {}",
            "✗".red(),
            config.flat_file.cache_path.display()
        );
        Ok(ExitCode::FAILURE)
    }
}

pub fn sources(config: &ResolverConfig, hostname: Option<&str>) -> Result<ExitCode> {
    let hostname = hostname.map(ValidatedHostname::new).transpose()?;
    let resolver = FallbackResolver::from_config(config)?;

    println!("{}", "Inventory sources (priority order)".bold());
    for (position, adapter) in resolver.adapters().iter().enumerate() {
        let line = format!("{}. {} ({})", position + 1, adapter.name(), adapter.kind());
        match &hostname {
            None => println!("  {}", line),
            Some(host) => match adapter.applicability(host.as_str()) {
                Applicability::Applicable => println!("  {} {}", "✓".green(), line),
                Applicability::NotApplicable(reason) => {
                    println!("  {} {} - {}", "✗".yellow(), line, reason)
                }
            },
        }
    }

    Ok(ExitCode::SUCCESS)
}

pub fn show_config(config: &ResolverConfig, show_secrets: bool) -> Result<ExitCode> {
    let yaml = if show_secrets {
        config.to_yaml()?
    } else {
        config.redact_secrets().to_yaml()?
    };
    print!("{}", yaml);
    Ok(ExitCode::SUCCESS)
}
