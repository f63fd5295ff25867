//! Watch event handlers feeding the resource cache
//!
//! The informer is a stateless adapter: each handler forwards synchronously
//! to the cache and nothing is enqueued. Scheduling reconciliations stays with
//! the controller runtime.
//!
//! Updates for the same identity are applied in delivery order. A stale
//! update delivered after a delete re-inserts the stale object; the watch is
//! relied upon to deliver events for one object in order.
//!
//! A relist (`Init`, `InitApply`..., `InitDone`) carries no deletes for
//! objects removed while the watch was down. The informer tracks the
//! identities seen during the relist and prunes everything else from the
//! cache when it ends.

use std::collections::HashSet;
use std::sync::Arc;

use kube::api::DynamicObject;
use kube::runtime::watcher::Event;
use parking_lot::Mutex;
use tracing::{debug, trace};

use lifecycle_common::ResourceIdentity;

use crate::cache::ResourceCache;

/// Handlers for the four kinds of watch notification
///
/// Handlers are fire-and-forget: the emitter expects no result.
pub trait EventHandler: Send + Sync {
    /// A resource was observed for the first time
    fn create(&self, resource: DynamicObject);

    /// A known resource changed; `old` is the previously observed version when
    /// one is available
    fn update(&self, old: Option<DynamicObject>, new: DynamicObject);

    /// A resource was deleted
    fn delete(&self, resource: &DynamicObject);

    /// Catch-all notification, including relist/resync deliveries
    fn generic(&self, resource: DynamicObject);
}

/// Event handler that mirrors watch notifications into a [`ResourceCache`]
#[derive(Clone)]
pub struct Informer {
    cache: Arc<ResourceCache>,
    // identities seen since the last Init; None outside a relist
    relist: Arc<Mutex<Option<HashSet<ResourceIdentity>>>>,
}

impl Informer {
    /// Create an informer writing into the given cache
    pub fn new(cache: Arc<ResourceCache>) -> Self {
        Self {
            cache,
            relist: Arc::new(Mutex::new(None)),
        }
    }

    /// The cache this informer maintains
    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    /// Translate a kube-runtime watcher event into handler calls
    ///
    /// `Apply` becomes an update when the identity is already cached and a
    /// create otherwise; relist items (`InitApply`) are generic events.
    /// `InitDone` deletes every cached resource the relist did not mention.
    pub fn handle_watch_event(&self, event: Event<DynamicObject>) {
        match event {
            Event::Apply(resource) => match self.cache.find(&resource) {
                Some(old) => self.update(Some(old), resource),
                None => self.create(resource),
            },
            Event::Delete(resource) => self.delete(&resource),
            Event::Init => {
                *self.relist.lock() = Some(HashSet::new());
            }
            Event::InitApply(resource) => {
                if let Some(seen) = self.relist.lock().as_mut() {
                    seen.insert(ResourceIdentity::of(&resource));
                }
                self.generic(resource);
            }
            Event::InitDone => {
                let Some(seen) = self.relist.lock().take() else {
                    return;
                };
                let pruned = self.cache.retain(&seen);
                debug!(
                    listed = seen.len(),
                    pruned = pruned.len(),
                    "relist complete"
                );
            }
        }
    }
}

impl EventHandler for Informer {
    fn create(&self, resource: DynamicObject) {
        trace!(resource = %ResourceIdentity::of(&resource), "create");
        self.cache.add(resource);
    }

    fn update(&self, _old: Option<DynamicObject>, new: DynamicObject) {
        trace!(resource = %ResourceIdentity::of(&new), "update");
        self.cache.add(new);
    }

    fn delete(&self, resource: &DynamicObject) {
        trace!(resource = %ResourceIdentity::of(resource), "delete");
        self.cache.remove(resource);
    }

    fn generic(&self, resource: DynamicObject) {
        trace!(resource = %ResourceIdentity::of(&resource), "generic");
        self.cache.add(resource);
    }
}
