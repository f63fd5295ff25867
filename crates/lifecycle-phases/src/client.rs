//! Cluster access seams for the lifecycle phases
//!
//! Phases talk to the cluster only through these traits, so they can be
//! exercised against mocks in tests and against the API server in
//! production.

use async_trait::async_trait;
use kube::api::{DeleteParams, DynamicObject, Patch, PatchParams, PostParams};
use kube::Client;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use lifecycle_common::kube_utils::{dynamic_api, is_empty_patch, merge_patch};
use lifecycle_common::{Error, ResourceIdentity, FIELD_MANAGER};

use crate::request::Request;

/// Trait abstracting cluster API operations on arbitrary resources
///
/// Resources are addressed by the identity of the object passed in; only
/// type meta, namespace and name are read from it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetch the live copy of a resource
    ///
    /// Returns `Ok(None)` when the resource does not exist.
    async fn get_resource(&self, resource: &DynamicObject) -> Result<Option<DynamicObject>, Error>;

    /// Replace a resource with the given representation, returning the
    /// server's copy
    async fn update_resource(&self, resource: &DynamicObject) -> Result<DynamicObject, Error>;

    /// Apply the fields that differ between `baseline` and `resource` as a
    /// JSON merge patch
    async fn patch_resource(
        &self,
        resource: &DynamicObject,
        baseline: &DynamicObject,
    ) -> Result<(), Error>;

    /// Request deletion of a resource
    ///
    /// A missing resource is reported as an error for which
    /// [`Error::is_not_found`] holds.
    async fn delete_resource(&self, resource: &DynamicObject) -> Result<(), Error>;
}

/// Source of the resources a workload owns
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ManagedResources: Send + Sync {
    /// Resources owned by the request's workload, in deployment order
    /// (dependencies before dependents)
    async fn managed_resources(&self, req: &Request) -> Result<Vec<DynamicObject>, Error>;
}

/// Real Kubernetes client implementation over `Api<DynamicObject>`
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Create a new KubeClusterClient wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_resource(&self, resource: &DynamicObject) -> Result<Option<DynamicObject>, Error> {
        let identity = ResourceIdentity::addressable(resource)?;
        let api = dynamic_api(self.client.clone(), &identity);
        match api.get(&identity.name).await {
            Ok(found) => Ok(Some(found)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_resource(&self, resource: &DynamicObject) -> Result<DynamicObject, Error> {
        let identity = ResourceIdentity::addressable(resource)?;
        let api = dynamic_api(self.client.clone(), &identity);
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        api.replace(&identity.name, &params, resource)
            .await
            .map_err(|e| api_error(&identity, e))
    }

    async fn patch_resource(
        &self,
        resource: &DynamicObject,
        baseline: &DynamicObject,
    ) -> Result<(), Error> {
        let identity = ResourceIdentity::addressable(resource)?;
        let before = serde_json::to_value(baseline)
            .map_err(|e| Error::malformed_for_kind(identity.kind.clone(), e.to_string()))?;
        let after = serde_json::to_value(resource)
            .map_err(|e| Error::malformed_for_kind(identity.kind.clone(), e.to_string()))?;

        let patch = merge_patch(&before, &after);
        if is_empty_patch(&patch) {
            debug!(resource = %identity, "nothing to patch");
            return Ok(());
        }

        let api = dynamic_api(self.client.clone(), &identity);
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        api.patch(&identity.name, &params, &Patch::Merge(&patch))
            .await
            .map_err(|e| api_error(&identity, e))?;
        Ok(())
    }

    async fn delete_resource(&self, resource: &DynamicObject) -> Result<(), Error> {
        let identity = ResourceIdentity::addressable(resource)?;
        let api = dynamic_api(self.client.clone(), &identity);
        api.delete(&identity.name, &DeleteParams::default())
            .await
            .map_err(|e| api_error(&identity, e))?;
        Ok(())
    }
}

/// Convert a kube error, naming the resource when the server reports it absent
fn api_error(identity: &ResourceIdentity, error: kube::Error) -> Error {
    match error {
        kube::Error::Api(ae) if ae.code == 404 => Error::not_found(identity),
        other => other.into(),
    }
}
