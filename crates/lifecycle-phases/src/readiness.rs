//! Kind-specific readiness checks for managed resources

use k8s_openapi::api::apps::v1::Deployment;
use kube::api::DynamicObject;
use kube::ResourceExt;

use lifecycle_common::Error;

/// Check whether a Deployment has rolled out
///
/// A Deployment is ready once its controller has observed the current
/// generation and every desired replica reports ready. A Deployment without
/// a name was never fetched and is not ready.
pub fn deployment_is_ready(resource: &DynamicObject) -> Result<bool, Error> {
    let deployment: Deployment = serde_json::to_value(resource)
        .and_then(serde_json::from_value)
        .map_err(|e| Error::malformed_for_kind("Deployment", e.to_string()))?;

    if deployment.name_any().is_empty() {
        return Ok(false);
    }

    let status = deployment.status.unwrap_or_default();
    let generation = deployment.metadata.generation.unwrap_or(0);
    if generation != status.observed_generation.unwrap_or(0) {
        return Ok(false);
    }

    Ok(status.ready_replicas.unwrap_or(0) == status.replicas.unwrap_or(0))
}
