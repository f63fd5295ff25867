//! Watch-backed resource cache
//!
//! A pure mirror of what the watch has delivered: no validation, no merging,
//! no eviction. Every public operation holds a single mutex for its full
//! duration, so readers and writers serialize.

use std::collections::{HashMap, HashSet};

use kube::api::DynamicObject;
use parking_lot::Mutex;

use lifecycle_common::ResourceIdentity;

/// Keyed store of the last-observed representation of each resource
#[derive(Default)]
pub struct ResourceCache {
    // None until the first insert
    resources: Mutex<Option<HashMap<ResourceIdentity, DynamicObject>>>,
}

impl ResourceCache {
    /// Create an empty cache. The backing map is allocated on first insert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for the resource's identity
    pub fn add(&self, resource: DynamicObject) {
        let key = ResourceIdentity::of(&resource);
        let mut guard = self.resources.lock();
        guard.get_or_insert_with(HashMap::new).insert(key, resource);
    }

    /// Remove the entry for the resource's identity; absent keys are a no-op
    pub fn remove(&self, resource: &DynamicObject) {
        let mut guard = self.resources.lock();
        let Some(resources) = guard.as_mut() else {
            return;
        };
        if resources.is_empty() {
            return;
        }
        resources.remove(&ResourceIdentity::of(resource));
    }

    /// Return the cached representation with the same identity, if any
    pub fn find(&self, resource: &DynamicObject) -> Option<DynamicObject> {
        self.get(&ResourceIdentity::of(resource))
    }

    /// Return the cached representation for an identity, if any
    pub fn get(&self, identity: &ResourceIdentity) -> Option<DynamicObject> {
        self.resources
            .lock()
            .as_ref()
            .and_then(|resources| resources.get(identity).cloned())
    }

    /// Whether a resource with the same identity is cached
    pub fn has(&self, resource: &DynamicObject) -> bool {
        self.find(resource).is_some()
    }

    /// Drop every entry whose identity is not in `keep`
    ///
    /// Used after a relist, which reports what exists but not what vanished.
    /// Returns the identities that were dropped.
    pub fn retain(&self, keep: &HashSet<ResourceIdentity>) -> Vec<ResourceIdentity> {
        let mut guard = self.resources.lock();
        let Some(resources) = guard.as_mut() else {
            return Vec::new();
        };
        let stale: Vec<ResourceIdentity> = resources
            .keys()
            .filter(|id| !keep.contains(*id))
            .cloned()
            .collect();
        for id in &stale {
            resources.remove(id);
        }
        stale
    }

    /// Number of cached resources
    pub fn len(&self) -> usize {
        self.resources.lock().as_ref().map_or(0, HashMap::len)
    }

    /// Whether the cache holds nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identities of every cached resource, sorted
    pub fn identities(&self) -> Vec<ResourceIdentity> {
        let mut ids: Vec<ResourceIdentity> = self
            .resources
            .lock()
            .as_ref()
            .map(|resources| resources.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}
