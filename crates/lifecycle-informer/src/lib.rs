//! Watch-driven cache of the resources a lifecycle controller manages
//!
//! The [`Informer`] receives watch notifications and mirrors them into a
//! shared [`ResourceCache`], which other reconciliation phases query for a
//! fast local view of cluster state.

pub mod cache;
pub mod informer;
pub mod watch;

pub use cache::ResourceCache;
pub use informer::{EventHandler, Informer};
pub use watch::{watch_into_cache, WatchConfig};
