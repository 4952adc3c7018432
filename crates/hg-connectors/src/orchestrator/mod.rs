//! Container orchestration metadata sources.

pub mod kubernetes;

pub use kubernetes::{
    parse_service_hostname, KubectlNamespaceSource, KubernetesAdapter, KubernetesConfig,
    NamespaceMetadata, NamespaceSource, CLUSTER_SERVICE_SUFFIX,
};
