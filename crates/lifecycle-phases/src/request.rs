//! Reconciliation request for a single owning workload

use kube::api::DynamicObject;
use kube::ResourceExt;

use lifecycle_common::finalizer::{
    add_finalizer, finalizer_name, CHILD_FINALIZER_SUFFIX, WORKLOAD_FINALIZER_SUFFIX,
};
use lifecycle_common::{Error, ResourceIdentity};

/// The owning workload a phase is acting on behalf of
///
/// Construction validates that the workload is addressable, so the finalizer
/// tokens derived from its API group are always well formed.
#[derive(Clone, Debug)]
pub struct Request {
    workload: DynamicObject,
    identity: ResourceIdentity,
}

impl Request {
    /// Wrap a workload, rejecting objects without type meta or name
    pub fn new(workload: DynamicObject) -> Result<Self, Error> {
        let identity = ResourceIdentity::addressable(&workload)?;
        Ok(Self { workload, identity })
    }

    /// The workload as last observed (or as last written by a phase)
    pub fn workload(&self) -> &DynamicObject {
        &self.workload
    }

    /// Identity of the workload
    pub fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    /// API group of the workload, which scopes its finalizer tokens
    pub fn group(&self) -> &str {
        &self.identity.group
    }

    /// Whether the workload has been marked for deletion
    pub fn is_being_deleted(&self) -> bool {
        self.workload.metadata.deletion_timestamp.is_some()
    }

    /// Finalizer token gating deletion of the workload itself
    pub fn workload_finalizer(&self) -> String {
        finalizer_name(self.group(), WORKLOAD_FINALIZER_SUFFIX)
    }

    /// Finalizer token gating deletion of each managed resource
    pub fn child_finalizer(&self) -> String {
        finalizer_name(self.group(), CHILD_FINALIZER_SUFFIX)
    }

    /// Finalizers currently on the workload
    pub fn finalizers(&self) -> &[String] {
        self.workload.finalizers()
    }

    /// Replace the workload with the server's copy after a write
    ///
    /// The identity is kept; the server never changes it on update.
    pub(crate) fn replace_workload(&mut self, workload: DynamicObject) {
        self.workload = workload;
    }
}

/// Attach the child finalizer for `req` to a managed resource before it is
/// created, so teardown gets to process it explicitly
///
/// Returns true if the resource changed.
pub fn add_child_finalizer(req: &Request, resource: &mut DynamicObject) -> bool {
    add_finalizer(resource, &req.child_finalizer())
}
