//! Finalizer tokens gating workload teardown
//!
//! Tokens have the form `<owner-group>/<suffix>`. The workload token sits on
//! the owner and keeps the garbage collector away until teardown reports
//! completion; the child token sits on each managed resource and keeps it
//! around until the teardown has explicitly processed it.
//!
//! Adding a present token and removing an absent one are both no-ops.

use kube::{Resource, ResourceExt};

/// Suffix of the finalizer registered on the owning workload
pub const WORKLOAD_FINALIZER_SUFFIX: &str = "Finalizer";

/// Suffix of the finalizer registered on each managed resource
pub const CHILD_FINALIZER_SUFFIX: &str = "ChildFinalizer";

/// Build a finalizer token from the owner's API group and a suffix
pub fn finalizer_name(group: &str, suffix: &str) -> String {
    format!("{}/{}", group, suffix)
}

/// Check for a token in a finalizer list
pub fn has_finalizer(finalizers: &[String], token: &str) -> bool {
    finalizers.iter().any(|f| f == token)
}

/// Add a finalizer token to a resource
///
/// Returns true if the resource changed.
pub fn add_finalizer<K: Resource>(resource: &mut K, token: &str) -> bool {
    if has_finalizer(resource.finalizers(), token) {
        return false;
    }
    resource.finalizers_mut().push(token.to_string());
    true
}

/// Remove every occurrence of a finalizer token from a resource
///
/// Returns true if the resource changed.
pub fn remove_finalizer<K: Resource>(resource: &mut K, token: &str) -> bool {
    if !has_finalizer(resource.finalizers(), token) {
        return false;
    }
    resource.finalizers_mut().retain(|f| f != token);
    true
}
