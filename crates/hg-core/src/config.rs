//! Resolver configuration.
//!
//! Built once per invocation from built-in defaults, an optional YAML file and
//! the process environment (highest precedence), then handed to the adapter
//! constructors. Nothing reads the environment after this point.

use crate::error::HostgateError;
use hg_connectors::{
    DatabaseConfig, FlatFileConfig, KubernetesConfig, SecureString, ServiceNowConfig,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const REDACTED: &str = "***REDACTED***";

/// Environment variables recognised by [`ResolverConfig::apply_env`].
pub mod env {
    pub const ASSET_CSV_PATH: &str = "ASSET_CSV_PATH";
    pub const ASSET_CACHE_PATH: &str = "ASSET_CACHE_PATH";
    pub const ASSET_CACHE_TTL_SECS: &str = "ASSET_CACHE_TTL_SECS";
    pub const ASSET_DB_HOST: &str = "ASSET_DB_HOST";
    pub const ASSET_DB_PORT: &str = "ASSET_DB_PORT";
    pub const ASSET_DB_NAME: &str = "ASSET_DB_NAME";
    pub const ASSET_DB_USER: &str = "ASSET_DB_USER";
    pub const ASSET_DB_PASSWORD: &str = "ASSET_DB_PASSWORD";
    pub const ASSET_DB_TIMEOUT_SECS: &str = "ASSET_DB_TIMEOUT_SECS";
    pub const SNOW_INSTANCE: &str = "SNOW_INSTANCE";
    pub const SNOW_USER: &str = "SNOW_USER";
    pub const SNOW_PASSWORD: &str = "SNOW_PASSWORD";
    pub const SNOW_TIMEOUT_SECS: &str = "SNOW_TIMEOUT_SECS";
    pub const K8S_ENABLED: &str = "K8S_ENABLED";
    pub const KUBECTL_PATH: &str = "KUBECTL_PATH";
    pub const K8S_CONTEXT: &str = "K8S_CONTEXT";
    pub const K8S_TIMEOUT_SECS: &str = "K8S_TIMEOUT_SECS";
    pub const K8S_DEFAULT_OWNER_EMAIL: &str = "K8S_DEFAULT_OWNER_EMAIL";
}

/// Configuration for every inventory source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub servicenow: ServiceNowConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
    #[serde(default)]
    pub flat_file: FlatFileConfig,
}

impl ResolverConfig {
    /// Loads defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, HostgateError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parses a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, HostgateError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            HostgateError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, HostgateError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Overrides fields from environment-style lookups.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), HostgateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(env::ASSET_CSV_PATH) {
            self.flat_file.csv_path = PathBuf::from(v);
        }
        if let Some(v) = get(env::ASSET_CACHE_PATH) {
            self.flat_file.cache_path = PathBuf::from(v);
        }
        if let Some(v) = get(env::ASSET_CACHE_TTL_SECS) {
            self.flat_file.cache_ttl_secs = parse(env::ASSET_CACHE_TTL_SECS, &v)?;
        }

        if let Some(v) = get(env::ASSET_DB_HOST) {
            self.database.host = v;
        }
        if let Some(v) = get(env::ASSET_DB_PORT) {
            self.database.port = parse(env::ASSET_DB_PORT, &v)?;
        }
        if let Some(v) = get(env::ASSET_DB_NAME) {
            self.database.database = v;
        }
        if let Some(v) = get(env::ASSET_DB_USER) {
            self.database.username = v;
        }
        if let Some(v) = get(env::ASSET_DB_PASSWORD) {
            self.database.password = Some(SecureString::new(v));
        }
        if let Some(v) = get(env::ASSET_DB_TIMEOUT_SECS) {
            self.database.timeout_secs = parse(env::ASSET_DB_TIMEOUT_SECS, &v)?;
        }

        if let Some(v) = get(env::SNOW_INSTANCE) {
            self.servicenow.instance = v;
        }
        if let Some(v) = get(env::SNOW_USER) {
            self.servicenow.username = v;
        }
        if let Some(v) = get(env::SNOW_PASSWORD) {
            self.servicenow.password = Some(SecureString::new(v));
        }
        if let Some(v) = get(env::SNOW_TIMEOUT_SECS) {
            self.servicenow.timeout_secs = parse(env::SNOW_TIMEOUT_SECS, &v)?;
        }

        if let Some(v) = get(env::K8S_ENABLED) {
            self.kubernetes.enabled = parse_bool(env::K8S_ENABLED, &v)?;
        }
        if let Some(v) = get(env::KUBECTL_PATH) {
            self.kubernetes.kubectl_path = v;
        }
        if let Some(v) = get(env::K8S_CONTEXT) {
            self.kubernetes.context = Some(v);
        }
        if let Some(v) = get(env::K8S_TIMEOUT_SECS) {
            self.kubernetes.timeout_secs = parse(env::K8S_TIMEOUT_SECS, &v)?;
        }
        if let Some(v) = get(env::K8S_DEFAULT_OWNER_EMAIL) {
            self.kubernetes.default_owner_email = v;
        }

        Ok(())
    }

    /// Returns a copy with all credentials replaced by a placeholder.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();

        if config.servicenow.password.is_some() {
            config.servicenow.password = Some(SecureString::from(REDACTED));
        }
        if config.database.password.is_some() {
            config.database.password = Some(SecureString::from(REDACTED));
        }

        config
    }

    pub fn to_yaml(&self) -> Result<String, HostgateError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, HostgateError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| HostgateError::Config(format!("{}={:?}: {}", key, value, e)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, HostgateError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HostgateError::Config(format!(
            "{}={:?}: expected true or false",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn apply(vars: &[(&str, &str)]) -> Result<ResolverConfig, HostgateError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = ResolverConfig::default();
        config.apply_env(|key| vars.get(key).cloned())?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.servicenow.instance, "contoso.service-now.com");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.timeout_secs, 5);
        assert_eq!(config.servicenow.timeout_secs, 10);
        assert_eq!(config.flat_file.cache_ttl_secs, 3600);
        assert!(config.kubernetes.enabled);
        assert!(config.servicenow.password.is_none());
        assert!(config.database.password.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = apply(&[
            ("ASSET_CSV_PATH", "/srv/inventory.csv"),
            ("ASSET_CACHE_TTL_SECS", "60"),
            ("ASSET_DB_PASSWORD", "reader-pass"),
            ("SNOW_INSTANCE", "acme.service-now.com"),
            ("SNOW_PASSWORD", "snow-pass"),
            ("K8S_ENABLED", "false"),
            ("K8S_CONTEXT", "prod-east"),
        ])
        .unwrap();

        assert_eq!(config.flat_file.csv_path, PathBuf::from("/srv/inventory.csv"));
        assert_eq!(config.flat_file.cache_ttl_secs, 60);
        assert!(config.database.is_configured());
        assert!(config.servicenow.is_configured());
        assert_eq!(config.servicenow.instance, "acme.service-now.com");
        assert!(!config.kubernetes.enabled);
        assert_eq!(config.kubernetes.context.as_deref(), Some("prod-east"));
    }

    #[test]
    fn test_empty_password_is_unset() {
        let config = apply(&[("SNOW_PASSWORD", "")]).unwrap();
        assert!(!config.servicenow.is_configured());
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        let err = apply(&[("ASSET_DB_PORT", "postgres")]).unwrap_err();
        assert!(matches!(err, HostgateError::Config(_)));
        assert!(err.to_string().contains("ASSET_DB_PORT"));

        assert!(apply(&[("K8S_ENABLED", "maybe")]).is_err());
    }

    #[test]
    fn test_yaml_then_env_precedence() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
servicenow:
  instance: yaml.service-now.com
  username: yaml-user
database:
  host: yaml-db.contoso.com
  database: assets
  username: reader
flat_file:
  csv_path: /data/inventory.csv
  cache_path: /data/cache.json
  cache_ttl_secs: 120
"#
        )
        .unwrap();

        let mut config = ResolverConfig::from_file(file.path()).unwrap();
        assert_eq!(config.servicenow.instance, "yaml.service-now.com");
        assert_eq!(config.flat_file.cache_ttl_secs, 120);
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.kubernetes.kubectl_path, "kubectl");

        config
            .apply_env(|key| (key == "SNOW_INSTANCE").then(|| "env.service-now.com".to_string()))
            .unwrap();
        assert_eq!(config.servicenow.instance, "env.service-now.com");
        assert_eq!(config.servicenow.username, "yaml-user");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ResolverConfig::from_file(Path::new("/nonexistent/hostgate.yaml")).unwrap_err();
        assert!(matches!(err, HostgateError::Config(_)));
    }

    #[test]
    fn test_redact_secrets() {
        let config = apply(&[("SNOW_PASSWORD", "snow-pass"), ("ASSET_DB_PASSWORD", "db-pass")])
            .unwrap();

        let yaml = config.redact_secrets().to_yaml().unwrap();
        assert!(!yaml.contains("snow-pass"));
        assert!(!yaml.contains("db-pass"));
        assert!(yaml.contains(REDACTED));

        let raw = config.to_yaml().unwrap();
        assert!(raw.contains("snow-pass"));
    }
}
