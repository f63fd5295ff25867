//! Error types for workload lifecycle operations
//!
//! Errors carry the resource identity and operation they failed on so that a
//! requeued reconciliation can be diagnosed from a single log line.

use thiserror::Error;

use crate::ResourceIdentity;

/// Main error type for lifecycle operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The addressed resource does not exist on the cluster
    #[error("resource not found: {resource}")]
    NotFound {
        /// Composite identity of the missing resource
        resource: String,
    },

    /// A resource could not be interpreted (missing type meta, bad shape)
    #[error("malformed input: {message}")]
    MalformedInput {
        /// Description of what's malformed
        message: String,
        /// The resource kind involved (if known)
        kind: Option<String>,
    },

    /// A cluster operation on a specific resource failed
    #[error("unable to {operation} {resource}: {source}")]
    Operation {
        /// What was being attempted (e.g. "delete", "remove finalizer from")
        operation: String,
        /// Composite identity of the resource
        resource: String,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g. "watcher", "telemetry")
        context: String,
    },
}

impl Error {
    /// Create a not-found error for the given resource
    pub fn not_found(resource: &ResourceIdentity) -> Self {
        Self::NotFound {
            resource: resource.key(),
        }
    }

    /// Create a malformed-input error with the given message
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a malformed-input error with resource kind context
    pub fn malformed_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Wrap an error with the operation and resource it failed on
    pub fn during(operation: impl Into<String>, resource: &ResourceIdentity, source: Error) -> Self {
        Self::Operation {
            operation: operation.into(),
            resource: resource.key(),
            source: Box::new(source),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error means the resource is already absent
    ///
    /// Only raw client errors qualify. An `Operation` wrapper is never
    /// treated as not-found, since wrapping happens after the caller has
    /// already decided the failure is terminal.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 404,
            _ => false,
        }
    }

    /// Check if this error is retryable
    ///
    /// Conflicts (409) and throttling (429) are retryable; other 4xx
    /// responses require a change to the request and are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => !matches!(
                source,
                kube::Error::Api(ae)
                    if (400..500).contains(&ae.code) && ae.code != 409 && ae.code != 429
            ),
            Error::NotFound { .. } => true,
            Error::MalformedInput { .. } => false,
            Error::Operation { source, .. } => source.is_retryable(),
            Error::Internal { .. } => true,
        }
    }

    /// Get the resource identity if this error is tied to a specific resource
    pub fn resource(&self) -> Option<&str> {
        match self {
            Error::NotFound { resource } => Some(resource),
            Error::Operation { resource, .. } => Some(resource),
            _ => None,
        }
    }

    /// Get the context if this error has one
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::Internal { context, .. } => Some(context),
            Error::Operation { operation, .. } => Some(operation),
            _ => None,
        }
    }
}
