//! Finalizer-gated teardown of the resources a workload owns
//!
//! A workload controller registers a finalizer on its workload with
//! [`register_delete_hooks`]. Once the workload is marked for deletion,
//! [`handle_deletion`] removes every managed resource in the reverse of
//! deployment order, confirming each is gone before moving on, and releases
//! the workload once nothing is left.

pub mod client;
pub mod context;
pub mod options;
pub mod phases;
pub mod readiness;
pub mod request;

pub use client::{ClusterClient, KubeClusterClient, ManagedResources};
pub use context::{Context, ContextBuilder};
pub use options::PhaseOptions;
pub use phases::{
    delete_phase, deletion_complete_phase, error_policy, handle_deletion, has_token,
    register_delete_hooks, release_delete_hooks, PhaseOutcome,
};
pub use readiness::deployment_is_ready;
pub use request::{add_child_finalizer, Request};
