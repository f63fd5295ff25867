//! Resource identity
//!
//! Two resources are the same entity iff group, version, kind, namespace and
//! name are all equal. The identity is what keys the resource cache and what
//! error messages report.

use std::fmt;

use kube::api::DynamicObject;
use kube::ResourceExt;

use crate::kube_utils::parse_api_version;
use crate::{Error, APIEXTENSIONS_GROUP, CUSTOM_RESOURCE_DEFINITION_KIND};

/// The (group, version, kind, namespace, name) tuple identifying a resource
///
/// Core-group resources have an empty `group`; cluster-scoped resources have
/// an empty `namespace`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentity {
    /// API group (empty for the core group)
    pub group: String,
    /// API version within the group
    pub version: String,
    /// Resource kind
    pub kind: String,
    /// Namespace (empty for cluster-scoped resources)
    pub namespace: String,
    /// Resource name
    pub name: String,
}

impl ResourceIdentity {
    /// Build an identity from its parts
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Derive the identity of a dynamic object
    ///
    /// Missing type meta or metadata yields empty fields; use
    /// [`ResourceIdentity::addressable`] when the identity is about to be
    /// used for a cluster call.
    pub fn of(resource: &DynamicObject) -> Self {
        let (group, version, kind) = match &resource.types {
            Some(types) => {
                let (group, version) = parse_api_version(&types.api_version);
                (group, version, types.kind.clone())
            }
            None => (String::new(), String::new(), String::new()),
        };

        Self {
            group,
            version,
            kind,
            namespace: resource.namespace().unwrap_or_default(),
            name: resource.metadata.name.clone().unwrap_or_default(),
        }
    }

    /// Derive the identity of a dynamic object that must be addressable on
    /// the cluster (has a version, kind and name)
    pub fn addressable(resource: &DynamicObject) -> Result<Self, Error> {
        let identity = Self::of(resource);
        if identity.version.is_empty() || identity.kind.is_empty() {
            return Err(Error::malformed(format!(
                "resource {} has no apiVersion/kind",
                identity
            )));
        }
        if identity.name.is_empty() {
            return Err(Error::malformed_for_kind(
                identity.kind.clone(),
                format!("{} resource has no name", identity.kind),
            ));
        }
        Ok(identity)
    }

    /// The full apiVersion string (`group/version`, or `version` for core)
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// The namespace, or None for cluster-scoped resources
    pub fn namespace(&self) -> Option<&str> {
        if self.namespace.is_empty() {
            None
        } else {
            Some(&self.namespace)
        }
    }

    /// Composite string key `group/version/kind/namespace/name`
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Whether this identity names a schema-defining resource
    pub fn is_schema_resource(&self) -> bool {
        self.group == APIEXTENSIONS_GROUP && self.kind == CUSTOM_RESOURCE_DEFINITION_KIND
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.group, self.version, self.kind, self.namespace, self.name
        )
    }
}
