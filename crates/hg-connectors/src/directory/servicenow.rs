//! ServiceNow CMDB adapter.
//!
//! Looks up an operational configuration item by name, then resolves its
//! `owned_by` reference to an email address with a second call. The owner
//! lookup is best-effort: any failure there leaves the owner email empty
//! instead of failing the attempt.

use crate::http::{HttpAuth, HttpClient, HttpClientConfig};
use crate::secure_string::SecureString;
use crate::traits::{
    Applicability, AssetRecord, SkipReason, SourceAdapter, SourceKind, SourceResult,
    ACTIVE_STATUS,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const CI_FIELDS: &str = "name,owned_by,support_group,environment,cost_center";

/// ServiceNow adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceNowConfig {
    /// Instance host (e.g. "contoso.service-now.com") or a full base URL.
    pub instance: String,
    pub username: String,
    /// The adapter is skipped when no password is configured.
    #[serde(default)]
    pub password: Option<SecureString>,
    /// Timeout applied to each of the two calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// CMDB table holding server configuration items.
    #[serde(default = "default_ci_table")]
    pub ci_table: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_ci_table() -> String {
    "cmdb_ci_server".to_string()
}

impl Default for ServiceNowConfig {
    fn default() -> Self {
        Self {
            instance: "contoso.service-now.com".to_string(),
            username: "keyfactor-api".to_string(),
            password: None,
            timeout_secs: default_timeout_secs(),
            ci_table: default_ci_table(),
        }
    }
}

impl ServiceNowConfig {
    /// Returns true when credentials are present.
    pub fn is_configured(&self) -> bool {
        self.password.as_ref().is_some_and(|p| !p.is_empty()) && !self.username.is_empty()
    }

    /// Base URL derived from the instance setting.
    pub fn base_url(&self) -> String {
        if self.instance.starts_with("http://") || self.instance.starts_with("https://") {
            self.instance.clone()
        } else {
            format!("https://{}", self.instance)
        }
    }
}

/// CMDB-backed adapter (highest priority in the fallback chain).
pub struct ServiceNowAdapter {
    config: ServiceNowConfig,
    client: HttpClient,
}

impl ServiceNowAdapter {
    pub fn new(config: ServiceNowConfig) -> SourceResult<Self> {
        let auth = match &config.password {
            Some(password) => HttpAuth::Basic {
                username: config.username.clone(),
                password: password.clone(),
            },
            None => HttpAuth::None,
        };

        let client = HttpClient::new(HttpClientConfig {
            base_url: config.base_url(),
            auth,
            timeout: Duration::from_secs(config.timeout_secs),
        })?;

        info!(
            "ServiceNow adapter initialized for instance '{}'",
            config.instance
        );
        Ok(Self { config, client })
    }

    /// Resolves a `sys_user` reference to an email address.
    async fn owner_email(&self, user_sys_id: &str) -> String {
        let path = format!(
            "/api/now/table/sys_user/{}",
            urlencoding::encode(user_sys_id)
        );

        match self
            .client
            .get_json::<SnowResponse>(&path, &[("sysparm_fields", "email")])
            .await
        {
            Ok(response) => display_value(&response.result, "email").unwrap_or_default(),
            Err(e) => {
                warn!(owner = %user_sys_id, error = %e, "Owner email lookup failed");
                String::new()
            }
        }
    }

    /// Team is the support group's name. Environment and cost center are
    /// the stored codes, not their display labels.
    fn parse_ci(hostname: &str, record: &SnowRecord, owner_email: String) -> AssetRecord {
        AssetRecord::known(hostname, ACTIVE_STATUS)
            .with_owner_email(owner_email)
            .with_owner_team(display_value(record, "support_group").unwrap_or_default())
            .with_environment(reference_value(record, "environment").unwrap_or_default())
            .with_cost_center(reference_value(record, "cost_center").unwrap_or_default())
    }
}

#[async_trait]
impl SourceAdapter for ServiceNowAdapter {
    fn name(&self) -> &str {
        "servicenow"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Directory
    }

    fn applicability(&self, _hostname: &str) -> Applicability {
        if self.config.is_configured() {
            Applicability::Applicable
        } else {
            Applicability::NotApplicable(SkipReason::ConfigurationMissing)
        }
    }

    #[instrument(skip(self), fields(instance = %self.config.instance))]
    async fn lookup(&self, hostname: &str) -> SourceResult<Option<AssetRecord>> {
        let path = format!("/api/now/table/{}", self.config.ci_table);
        let query = format!("name={}^operational_status=1", hostname);

        let response: SnowListResponse = self
            .client
            .get_json(
                &path,
                &[
                    ("sysparm_query", query.as_str()),
                    ("sysparm_fields", CI_FIELDS),
                    ("sysparm_display_value", "all"),
                    ("sysparm_limit", "1"),
                ],
            )
            .await?;

        let Some(ci) = response.result.into_iter().next() else {
            debug!("No operational CI found");
            return Ok(None);
        };

        let owner_email = match reference_value(&ci, "owned_by") {
            Some(owner) if !owner.is_empty() => self.owner_email(&owner).await,
            _ => String::new(),
        };

        Ok(Some(Self::parse_ci(hostname, &ci, owner_email)))
    }
}

// ServiceNow API response types

type SnowRecord = HashMap<String, serde_json::Value>;

#[derive(Debug, Default, Deserialize)]
struct SnowResponse {
    #[serde(default)]
    result: SnowRecord,
}

#[derive(Debug, Default, Deserialize)]
struct SnowListResponse {
    #[serde(default)]
    result: Vec<SnowRecord>,
}

/// Raw value of a field. Handles both plain strings and
/// `{"value": .., "display_value": ..}` objects.
fn reference_value(record: &SnowRecord, field: &str) -> Option<String> {
    match record.get(field)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(obj) => obj
            .get("value")
            .and_then(|v| v.as_str())
            .map(String::from),
        _ => None,
    }
}

/// Human-readable value of a field, falling back to the raw value.
fn display_value(record: &SnowRecord, field: &str) -> Option<String> {
    match record.get(field)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(obj) => obj
            .get("display_value")
            .or_else(|| obj.get("value"))
            .and_then(|v| v.as_str())
            .map(String::from),
        _ => None,
    }
}
