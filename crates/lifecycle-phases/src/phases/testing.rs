//! Fixtures shared by the phase tests
//!
//! `FakeCluster` keeps an in-memory object store that honors finalizers the
//! way the API server does: a delete on an object with finalizers only marks
//! it, and the object disappears once its last finalizer is removed.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{OwnerReference, Time};
use kube::api::DynamicObject;
use kube::core::ErrorResponse;
use kube::runtime::events::EventType;
use kube::ResourceExt;

use lifecycle_common::events::EventPublisher;
use lifecycle_common::finalizer::add_finalizer;
use lifecycle_common::kube_utils::dynamic_object;
use lifecycle_common::{Error, ResourceIdentity};

use crate::client::{ClusterClient, ManagedResources};
use crate::context::Context;
use crate::request::Request;

pub(crate) const WORKLOAD_API_VERSION: &str = "apps.example.com/v1alpha1";
pub(crate) const CHILD_FINALIZER: &str = "apps.example.com/ChildFinalizer";
pub(crate) const WORKLOAD_FINALIZER: &str = "apps.example.com/Finalizer";

pub(crate) fn workload() -> DynamicObject {
    let mut obj = dynamic_object(WORKLOAD_API_VERSION, "WebStore", Some("shop"), "store");
    obj.metadata.uid = Some("store-uid".to_string());
    obj
}

pub(crate) fn request() -> Request {
    Request::new(workload()).expect("valid workload")
}

/// A workload marked for deletion that still carries its finalizer
pub(crate) fn deleting_request() -> Request {
    let mut obj = with_finalizer(workload(), WORKLOAD_FINALIZER);
    obj.metadata.deletion_timestamp = Some(deletion_time());
    Request::new(obj).expect("valid workload")
}

pub(crate) fn deletion_time() -> Time {
    serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z")).expect("valid time")
}

pub(crate) fn deployment(name: &str) -> DynamicObject {
    dynamic_object("apps/v1", "Deployment", Some("shop"), name)
}

pub(crate) fn configmap(name: &str) -> DynamicObject {
    dynamic_object("v1", "ConfigMap", Some("shop"), name)
}

/// A CRD owned by the test workload
pub(crate) fn crd(name: &str) -> DynamicObject {
    let mut obj = dynamic_object(
        "apiextensions.k8s.io/v1",
        "CustomResourceDefinition",
        None,
        name,
    );
    obj.metadata.owner_references = Some(vec![OwnerReference {
        api_version: WORKLOAD_API_VERSION.to_string(),
        kind: "WebStore".to_string(),
        name: "store".to_string(),
        uid: "store-uid".to_string(),
        ..Default::default()
    }]);
    obj
}

pub(crate) fn with_finalizer(mut obj: DynamicObject, token: &str) -> DynamicObject {
    add_finalizer(&mut obj, token);
    obj
}

pub(crate) fn with_child_finalizer(obj: DynamicObject) -> DynamicObject {
    with_finalizer(obj, CHILD_FINALIZER)
}

pub(crate) fn api_error(code: u16) -> Error {
    Error::from(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("status {code}"),
        reason: "Test".to_string(),
        code,
    }))
}

pub(crate) fn not_found() -> Error {
    api_error(404)
}

pub(crate) fn context(
    cluster: Arc<FakeCluster>,
    resources: Vec<DynamicObject>,
    events: Arc<RecordingPublisher>,
) -> Context {
    Context::for_testing(cluster, Arc::new(StaticResources(resources)), events)
}

/// Managed-resource source returning a fixed list
pub(crate) struct StaticResources(pub(crate) Vec<DynamicObject>);

#[async_trait]
impl ManagedResources for StaticResources {
    async fn managed_resources(&self, _req: &Request) -> Result<Vec<DynamicObject>, Error> {
        Ok(self.0.clone())
    }
}

/// A cluster call, labelled `Kind/name`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Call {
    Get(String),
    Update(String),
    Patch(String),
    Delete(String),
}

fn label(obj: &DynamicObject) -> String {
    let identity = ResourceIdentity::of(obj);
    format!("{}/{}", identity.kind, identity.name)
}

#[derive(Default)]
struct ClusterState {
    objects: BTreeMap<ResourceIdentity, DynamicObject>,
    calls: Vec<Call>,
    // call -> (successful calls before failing, status)
    failures: HashMap<Call, (usize, u16)>,
}

impl ClusterState {
    fn record(&mut self, call: Call) -> Result<(), Error> {
        self.calls.push(call.clone());
        let seen = self.calls.iter().filter(|c| **c == call).count();
        match self.failures.get(&call) {
            Some((skip, code)) if seen > *skip => Err(api_error(*code)),
            _ => Ok(()),
        }
    }

    /// Drop a marked object once nothing holds it anymore
    fn settle(&mut self, identity: &ResourceIdentity) {
        let releasable = self.objects.get(identity).is_some_and(|obj| {
            obj.metadata.deletion_timestamp.is_some() && obj.finalizers().is_empty()
        });
        if releasable {
            self.objects.remove(identity);
        }
    }
}

/// In-memory cluster recording every call made against it
#[derive(Default)]
pub(crate) struct FakeCluster {
    state: Mutex<ClusterState>,
}

impl FakeCluster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, obj: DynamicObject) {
        let mut state = self.state.lock().expect("lock");
        state.objects.insert(ResourceIdentity::of(&obj), obj);
    }

    /// Make a call fail with the given HTTP status
    pub(crate) fn fail(&self, call: Call, code: u16) {
        self.fail_after(call, 0, code);
    }

    /// Let a call succeed `skip` times, then fail with the given HTTP status
    pub(crate) fn fail_after(&self, call: Call, skip: usize, code: u16) {
        let mut state = self.state.lock().expect("lock");
        state.failures.insert(call, (skip, code));
    }

    pub(crate) fn contains(&self, obj: &DynamicObject) -> bool {
        self.stored(obj).is_some()
    }

    pub(crate) fn stored(&self, obj: &DynamicObject) -> Option<DynamicObject> {
        let state = self.state.lock().expect("lock");
        state.objects.get(&ResourceIdentity::of(obj)).cloned()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().expect("lock").calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.lock().expect("lock").calls.clear();
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get_resource(&self, resource: &DynamicObject) -> Result<Option<DynamicObject>, Error> {
        let mut state = self.state.lock().expect("lock");
        state.record(Call::Get(label(resource)))?;
        Ok(state.objects.get(&ResourceIdentity::of(resource)).cloned())
    }

    async fn update_resource(&self, resource: &DynamicObject) -> Result<DynamicObject, Error> {
        let mut state = self.state.lock().expect("lock");
        state.record(Call::Update(label(resource)))?;
        let identity = ResourceIdentity::of(resource);
        let stored = state.objects.get_mut(&identity).ok_or_else(not_found)?;
        let deletion_timestamp = stored.metadata.deletion_timestamp.clone();
        *stored = resource.clone();
        stored.metadata.deletion_timestamp = deletion_timestamp;
        let updated = stored.clone();
        state.settle(&identity);
        Ok(updated)
    }

    async fn patch_resource(
        &self,
        resource: &DynamicObject,
        _baseline: &DynamicObject,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().expect("lock");
        state.record(Call::Patch(label(resource)))?;
        let identity = ResourceIdentity::of(resource);
        let stored = state.objects.get_mut(&identity).ok_or_else(not_found)?;
        stored.metadata.finalizers = resource.metadata.finalizers.clone();
        stored.metadata.owner_references = resource.metadata.owner_references.clone();
        state.settle(&identity);
        Ok(())
    }

    async fn delete_resource(&self, resource: &DynamicObject) -> Result<(), Error> {
        let mut state = self.state.lock().expect("lock");
        state.record(Call::Delete(label(resource)))?;
        let identity = ResourceIdentity::of(resource);
        let stored = state.objects.get_mut(&identity).ok_or_else(not_found)?;
        stored.metadata.deletion_timestamp = Some(deletion_time());
        state.settle(&identity);
        Ok(())
    }
}

/// Event publisher remembering what was published
#[derive(Default)]
pub(crate) struct RecordingPublisher {
    published: Mutex<Vec<(String, bool)>>,
}

impl RecordingPublisher {
    pub(crate) fn reasons(&self) -> Vec<String> {
        let published = self.published.lock().expect("lock");
        published.iter().map(|(reason, _)| reason.clone()).collect()
    }

    pub(crate) fn warnings(&self) -> Vec<String> {
        let published = self.published.lock().expect("lock");
        published
            .iter()
            .filter(|(_, warning)| *warning)
            .map(|(reason, _)| reason.clone())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
        let warning = matches!(type_, EventType::Warning);
        self.published
            .lock()
            .expect("lock")
            .push((reason.to_string(), warning));
    }
}
