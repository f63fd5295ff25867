//! Common types for workload lifecycle controllers: identities, finalizers,
//! errors, and kube-rs utilities

#![deny(missing_docs)]

pub mod error;
pub mod events;
pub mod finalizer;
pub mod identity;
pub mod kube_utils;
pub mod telemetry;

pub use error::Error;
pub use identity::ResourceIdentity;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager recorded on every write issued by lifecycle controllers
pub const FIELD_MANAGER: &str = "workload-lifecycle";

/// API group of schema-defining resources
pub const APIEXTENSIONS_GROUP: &str = "apiextensions.k8s.io";

/// Kind of schema-defining resources
pub const CUSTOM_RESOURCE_DEFINITION_KIND: &str = "CustomResourceDefinition";
