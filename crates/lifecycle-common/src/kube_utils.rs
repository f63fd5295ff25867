//! Shared Kubernetes utilities using kube-rs
//!
//! Client construction, dynamic `ApiResource` building, and JSON merge patch
//! computation for resources that are only known at runtime.

use std::path::PathBuf;
use std::time::Duration;

use k8s_openapi::api::core::v1::ObjectReference;
use kube::api::{Api, DynamicObject};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::TypeMeta;
use kube::discovery::ApiResource;
use kube::{Client, Config};
use serde_json::{Map, Value};

use crate::{Error, ResourceIdentity};

/// Default connect timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the cluster API client
///
/// Every cluster call made by the lifecycle phases is bounded by these
/// timeouts; the phases themselves never wait on their own.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Path to a kubeconfig file; inferred (in-cluster or `KUBECONFIG`) when None
    pub kubeconfig: Option<PathBuf>,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Per-request read timeout
    pub read_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Create a kube client honoring the configured timeouts
pub async fn create_client(config: &ClientConfig) -> Result<Client, Error> {
    let mut kube_config = match &config.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to read kubeconfig {}: {}", path.display(), e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::internal_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        None => Config::infer().await.map_err(|e| {
            Error::internal_with_context("create_client", format!("failed to infer config: {}", e))
        })?,
    };

    kube_config.connect_timeout = Some(config.connect_timeout);
    kube_config.read_timeout = Some(config.read_timeout);

    Client::try_from(kube_config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {}", e))
    })
}

/// Split an apiVersion into (group, version)
///
/// ```
/// use lifecycle_common::kube_utils::parse_api_version;
///
/// assert_eq!(parse_api_version("apps/v1"), ("apps".to_string(), "v1".to_string()));
/// assert_eq!(parse_api_version("v1"), (String::new(), "v1".to_string()));
/// ```
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Known kinds whose plural is not derivable by the fallback rules
const KIND_PLURALS: &[(&str, &str)] = &[
    ("endpoints", "endpoints"),
    ("ingress", "ingresses"),
    ("networkpolicy", "networkpolicies"),
    ("podsecuritypolicy", "podsecuritypolicies"),
    ("priorityclass", "priorityclasses"),
    ("storageclass", "storageclasses"),
    ("customresourcedefinition", "customresourcedefinitions"),
];

/// Pluralize a Kubernetes resource kind
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();

    if let Some((_, plural)) = KIND_PLURALS.iter().find(|(singular, _)| *singular == lower) {
        return (*plural).to_string();
    }

    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}

/// Build an ApiResource from an apiVersion and kind
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Build a dynamic Api scoped to the identity's namespace (or cluster-wide)
pub fn dynamic_api(client: Client, identity: &ResourceIdentity) -> Api<DynamicObject> {
    let ar = build_api_resource(&identity.api_version(), &identity.kind);
    match identity.namespace() {
        Some(ns) => Api::namespaced_with(client, ns, &ar),
        None => Api::all_with(client, &ar),
    }
}

/// Construct an empty dynamic object with type meta and name set
pub fn dynamic_object(
    api_version: &str,
    kind: &str,
    namespace: Option<&str>,
    name: &str,
) -> DynamicObject {
    let mut obj = DynamicObject::new(name, &build_api_resource(api_version, kind));
    obj.types = Some(TypeMeta {
        api_version: api_version.to_string(),
        kind: kind.to_string(),
    });
    obj.metadata.namespace = namespace.map(str::to_string);
    obj
}

/// Build an ObjectReference pointing at a dynamic object (for Events)
pub fn object_reference(resource: &DynamicObject) -> ObjectReference {
    let identity = ResourceIdentity::of(resource);
    ObjectReference {
        api_version: Some(identity.api_version()),
        kind: Some(identity.kind),
        name: resource.metadata.name.clone(),
        namespace: resource.metadata.namespace.clone(),
        uid: resource.metadata.uid.clone(),
        resource_version: resource.metadata.resource_version.clone(),
        ..Default::default()
    }
}

/// Compute a JSON merge patch (RFC 7386) that turns `baseline` into `current`
///
/// Keys that changed are set, keys removed from `current` are nulled, and
/// keys equal in both are omitted. Arrays are replaced wholesale. Returns an
/// empty object when nothing changed.
pub fn merge_patch(baseline: &Value, current: &Value) -> Value {
    match (baseline, current) {
        (Value::Object(before), Value::Object(after)) => {
            let mut patch = Map::new();
            for (key, after_value) in after {
                match before.get(key) {
                    Some(before_value) if before_value == after_value => {}
                    Some(before_value) if before_value.is_object() && after_value.is_object() => {
                        patch.insert(key.clone(), merge_patch(before_value, after_value));
                    }
                    _ => {
                        patch.insert(key.clone(), after_value.clone());
                    }
                }
            }
            for key in before.keys() {
                if !after.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            Value::Object(patch)
        }
        _ => current.clone(),
    }
}

/// Check whether a merge patch is a no-op
pub fn is_empty_patch(patch: &Value) -> bool {
    patch.as_object().is_some_and(Map::is_empty)
}
