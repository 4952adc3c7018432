//! Kubernetes namespace adapter.
//!
//! Cluster-internal service addresses (`<svc>.<namespace>.svc.cluster.local`)
//! are authorized by the metadata of their namespace. Namespace metadata is
//! fetched through a [`NamespaceSource`]; the production source shells out to
//! `kubectl` without a shell and with a bounded timeout.

use crate::traits::{
    Applicability, AssetRecord, SkipReason, SourceAdapter, SourceError, SourceKind, SourceResult,
    ACTIVE_STATUS,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Suffix of every cluster-internal service address.
pub const CLUSTER_SERVICE_SUFFIX: &str = ".svc.cluster.local";

const ACTIVE_PHASE: &str = "Active";
const OWNER_EMAIL_ANNOTATION: &str = "owner-email";
const OWNER_LABEL: &str = "owner";
const TEAM_LABEL: &str = "team";
const ENVIRONMENT_LABEL: &str = "environment";
const COST_CENTER_LABEL: &str = "cost-center";

/// Settings for the orchestrator adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_kubectl_path")]
    pub kubectl_path: String,
    /// kubeconfig context; the current context when unset.
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Owner email used when a namespace names no owner.
    #[serde(default = "default_owner_email")]
    pub default_owner_email: String,
}

fn default_enabled() -> bool {
    true
}

fn default_kubectl_path() -> String {
    "kubectl".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_owner_email() -> String {
    "unknown@contoso.com".to_string()
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            kubectl_path: default_kubectl_path(),
            context: None,
            timeout_secs: default_timeout_secs(),
            default_owner_email: default_owner_email(),
        }
    }
}

/// Extracts the namespace from a cluster-internal service address.
///
/// Returns `None` unless the hostname ends with [`CLUSTER_SERVICE_SUFFIX`]
/// and its third label is `svc`.
pub fn parse_service_hostname(hostname: &str) -> Option<&str> {
    if !hostname.ends_with(CLUSTER_SERVICE_SUFFIX) {
        return None;
    }

    let labels: Vec<&str> = hostname.split('.').collect();
    match labels.as_slice() {
        [service, namespace, "svc", ..] if !service.is_empty() && !namespace.is_empty() => {
            Some(*namespace)
        }
        _ => None,
    }
}

/// Namespace metadata consumed by the adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceMetadata {
    pub name: String,
    pub phase: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl NamespaceMetadata {
    pub fn is_active(&self) -> bool {
        self.phase == ACTIVE_PHASE
    }

    /// Owner email by precedence: annotation, then label, then `fallback`.
    pub fn owner_email(&self, fallback: &str) -> String {
        self.annotations
            .get(OWNER_EMAIL_ANNOTATION)
            .filter(|owner| !owner.is_empty())
            .or_else(|| self.labels.get(OWNER_LABEL).filter(|owner| !owner.is_empty()))
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    }

    fn label(&self, key: &str) -> String {
        self.labels.get(key).cloned().unwrap_or_default()
    }
}

/// Access to namespace metadata on the control plane.
#[async_trait]
pub trait NamespaceSource: Send + Sync {
    /// Fetches one namespace; `Ok(None)` when it does not exist.
    async fn namespace(&self, name: &str) -> SourceResult<Option<NamespaceMetadata>>;
}

/// [`NamespaceSource`] backed by `kubectl get namespace -o json`.
pub struct KubectlNamespaceSource {
    kubectl_path: String,
    context: Option<String>,
    timeout: Duration,
}

impl KubectlNamespaceSource {
    pub fn new(config: &KubernetesConfig) -> Self {
        Self {
            kubectl_path: config.kubectl_path.clone(),
            context: config.context.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn command(&self, namespace: &str) -> Command {
        let mut cmd = Command::new(&self.kubectl_path);
        if let Some(context) = &self.context {
            cmd.arg("--context").arg(context);
        }
        cmd.args(["get", "namespace", namespace, "-o", "json"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl NamespaceSource for KubectlNamespaceSource {
    async fn namespace(&self, name: &str) -> SourceResult<Option<NamespaceMetadata>> {
        let mut cmd = self.command(name);

        // The child is killed when the output future is dropped on timeout.
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(SourceError::Io(format!(
                    "failed to run {}: {}",
                    self.kubectl_path, e
                )))
            }
            Err(_) => {
                return Err(SourceError::Timeout(format!(
                    "kubectl exceeded {}s",
                    self.timeout.as_secs()
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("NotFound") {
                debug!(namespace = %name, "Namespace not found");
                return Ok(None);
            }
            return Err(SourceError::Transport(format!(
                "kubectl exited with {}: {}",
                output.status,
                stderr.trim().chars().take(200).collect::<String>()
            )));
        }

        parse_namespace_json(&output.stdout).map(Some)
    }
}

#[derive(Debug, Deserialize)]
struct NamespaceObject {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    status: NamespaceStatus,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct NamespaceStatus {
    #[serde(default)]
    phase: String,
}

fn parse_namespace_json(bytes: &[u8]) -> SourceResult<NamespaceMetadata> {
    let object: NamespaceObject = serde_json::from_slice(bytes)
        .map_err(|e| SourceError::DataFormat(format!("invalid namespace JSON: {}", e)))?;

    Ok(NamespaceMetadata {
        name: object.metadata.name,
        phase: object.status.phase,
        labels: object.metadata.labels,
        annotations: object.metadata.annotations,
    })
}

/// Orchestrator adapter (third in the fallback chain, shape-gated).
pub struct KubernetesAdapter {
    config: KubernetesConfig,
    source: Arc<dyn NamespaceSource>,
}

impl KubernetesAdapter {
    /// Creates an adapter that queries the cluster through `kubectl`.
    pub fn new(config: KubernetesConfig) -> Self {
        let source = Arc::new(KubectlNamespaceSource::new(&config));
        Self { config, source }
    }

    /// Creates an adapter over a custom namespace source.
    pub fn with_source(config: KubernetesConfig, source: Arc<dyn NamespaceSource>) -> Self {
        Self { config, source }
    }

    fn to_record(&self, hostname: &str, namespace: &NamespaceMetadata) -> AssetRecord {
        AssetRecord::known(hostname, ACTIVE_STATUS)
            .with_owner_email(namespace.owner_email(&self.config.default_owner_email))
            .with_owner_team(namespace.label(TEAM_LABEL))
            .with_environment(namespace.label(ENVIRONMENT_LABEL))
            .with_cost_center(namespace.label(COST_CENTER_LABEL))
    }
}

#[async_trait]
impl SourceAdapter for KubernetesAdapter {
    fn name(&self) -> &str {
        "kubernetes"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Orchestrator
    }

    fn applicability(&self, hostname: &str) -> Applicability {
        if !self.config.enabled {
            return Applicability::NotApplicable(SkipReason::ConfigurationMissing);
        }
        match parse_service_hostname(hostname) {
            Some(_) => Applicability::Applicable,
            None => Applicability::NotApplicable(SkipReason::HostnameShape),
        }
    }

    #[instrument(skip(self))]
    async fn lookup(&self, hostname: &str) -> SourceResult<Option<AssetRecord>> {
        let Some(namespace) = parse_service_hostname(hostname) else {
            return Ok(None);
        };

        let Some(metadata) = self.source.namespace(namespace).await? else {
            return Ok(None);
        };

        if !metadata.is_active() {
            warn!(namespace = %namespace, phase = %metadata.phase, "Namespace is not active");
            return Ok(None);
        }

        Ok(Some(self.to_record(hostname, &metadata)))
    }
}
