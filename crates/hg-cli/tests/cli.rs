//! Tests for the `hostgate` binary's output contract.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const INVENTORY: &str = "\
hostname,owner_email,owner_team,environment,cost_center,status
app01.contoso.com,web@contoso.com,web-apps,prod,1001,active
app02.contoso.com,infra@contoso.com,infra,staging,2002,active
old01.contoso.com,legacy@contoso.com,legacy,prod,1001,retired
";

const CREDENTIAL_VARS: &[&str] = &[
    "SNOW_INSTANCE",
    "SNOW_USER",
    "SNOW_PASSWORD",
    "ASSET_DB_HOST",
    "ASSET_DB_USER",
    "ASSET_DB_PASSWORD",
];

/// A `hostgate` command isolated from the caller's environment, with only
/// the flat file available.
fn hostgate(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_hostgate"));
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("NO_COLOR", "1")
        .env("K8S_ENABLED", "false")
        .env("ASSET_CSV_PATH", dir.join("asset-inventory.csv"))
        .env("ASSET_CACHE_PATH", dir.join("asset-inventory-cache.json"));
    cmd
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("asset-inventory.csv"), INVENTORY).unwrap();
    dir
}

fn run(cmd: &mut Command) -> (Output, String, String) {
    let output = cmd.output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    (output, stdout, stderr)
}

#[test]
fn test_missing_hostname_is_usage_error() {
    let dir = workspace();
    let (output, stdout, _) = run(hostgate(dir.path()).arg("resolve"));

    assert_eq!(output.status.code(), Some(2));
    assert!(stdout.is_empty());
}

#[test]
fn test_known_host_is_authorized_on_stdout() {
    let dir = workspace();
    let (output, stdout, _) = run(hostgate(dir.path()).args(["resolve", "app01.contoso.com"]));

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout, "AUTHORIZED|web-apps|prod|1001\n");
}

#[test]
fn test_requester_does_not_change_the_verdict() {
    let dir = workspace();
    let (output, stdout, _) = run(hostgate(dir.path()).args([
        "resolve",
        "app02.contoso.com",
        "pki-bot",
    ]));

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout, "AUTHORIZED|infra|staging|2002\n");
}

#[test]
fn test_unknown_and_retired_hosts_are_denied() {
    let dir = workspace();

    for host in ["ghost.contoso.com", "old01.contoso.com"] {
        let (output, stdout, _) = run(hostgate(dir.path()).args(["resolve", host]));
        assert_eq!(output.status.code(), Some(1));
        assert_eq!(
            stdout,
            format!("DENIED|Device '{}' not found in any inventory source\n", host)
        );
    }
}

#[test]
fn test_invalid_hostname_is_reported_on_stderr() {
    let dir = workspace();
    let (output, stdout, stderr) = run(hostgate(dir.path()).args(["resolve", "app01;reboot"]));

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.is_empty());
    assert!(stderr.contains("DENIED|Validation error: "));
    assert!(stderr.contains("';'"));
}

#[test]
fn test_missing_inventory_is_reported_on_stderr() {
    let dir = TempDir::new().unwrap();
    let (output, stdout, stderr) = run(hostgate(dir.path()).args(["resolve", "app01.contoso.com"]));

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.is_empty());
    assert!(stderr.contains("DENIED|Validation error: no inventory source available"));
}

#[test]
fn test_config_redacts_secrets_by_default() {
    let dir = workspace();
    let (output, stdout, _) = run(hostgate(dir.path())
        .env("SNOW_PASSWORD", "snow-pass")
        .arg("config"));

    assert_eq!(output.status.code(), Some(0));
    assert!(!stdout.contains("snow-pass"));
    assert!(stdout.contains("***REDACTED***"));

    let (_, stdout, _) = run(hostgate(dir.path())
        .env("SNOW_PASSWORD", "snow-pass")
        .args(["config", "--show-secrets"]));
    assert!(stdout.contains("snow-pass"));
}

#[test]
fn test_cache_rebuild_then_status() {
    let dir = workspace();

    let (output, stdout, _) = run(hostgate(dir.path()).args(["cache", "rebuild"]));
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("Indexed 2 hosts from 3 rows"));
    assert!(dir.path().join("asset-inventory-cache.json").exists());

    let (output, stdout, _) = run(hostgate(dir.path()).args(["cache", "status"]));
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("Entries: 2"));
    assert!(stdout.contains("fresh"));
}

#[test]
fn test_sources_lists_chain_in_priority_order() {
    let dir = workspace();
    let (output, stdout, _) = run(hostgate(dir.path()).args(["sources", "app01.contoso.com"]));

    assert_eq!(output.status.code(), Some(0));
    let servicenow = stdout.find("servicenow").unwrap();
    let postgres = stdout.find("postgres").unwrap();
    let kubernetes = stdout.find("kubernetes").unwrap();
    let flat_file = stdout.find("flat_file").unwrap();
    assert!(servicenow < postgres && postgres < kubernetes && kubernetes < flat_file);
    assert!(stdout.contains("configuration missing"));
}
