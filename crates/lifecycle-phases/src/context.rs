//! Shared state handed to every lifecycle phase

use std::sync::Arc;

use kube::Client;

use lifecycle_common::events::{EventPublisher, KubeEventPublisher};

use crate::client::{ClusterClient, KubeClusterClient, ManagedResources};

/// Default controller name reported on Kubernetes Events
pub const DEFAULT_CONTROLLER_NAME: &str = "workload-lifecycle-controller";

/// Phase context
///
/// Holds trait objects for every external dependency so phases can run
/// against mocks in tests.
pub struct Context {
    /// Cluster client for resource operations
    pub client: Arc<dyn ClusterClient>,
    /// Source of the workload's managed resources
    pub resources: Arc<dyn ManagedResources>,
    /// Event publisher for Kubernetes Events
    pub events: Arc<dyn EventPublisher>,
}

impl Context {
    /// Create a builder for constructing a Context
    pub fn builder(client: Client, resources: Arc<dyn ManagedResources>) -> ContextBuilder {
        ContextBuilder::new(client, resources)
    }

    /// Create a context for testing with custom implementations
    ///
    /// For production code, use [`Context::builder`].
    #[cfg(test)]
    pub fn for_testing(
        client: Arc<dyn ClusterClient>,
        resources: Arc<dyn ManagedResources>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            client,
            resources,
            events,
        }
    }
}

/// Builder for constructing [`Context`] instances
///
/// ```text
/// let ctx = Context::builder(client, Arc::new(MyManifests::new()))
///     .controller_name("store-controller")
///     .build();
/// ```
pub struct ContextBuilder {
    kube: Client,
    resources: Arc<dyn ManagedResources>,
    client: Option<Arc<dyn ClusterClient>>,
    events: Option<Arc<dyn EventPublisher>>,
    controller_name: String,
}

impl ContextBuilder {
    fn new(kube: Client, resources: Arc<dyn ManagedResources>) -> Self {
        Self {
            kube,
            resources,
            client: None,
            events: None,
            controller_name: DEFAULT_CONTROLLER_NAME.to_string(),
        }
    }

    /// Override the cluster client (primarily for testing)
    pub fn cluster_client(mut self, client: Arc<dyn ClusterClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Override the event publisher
    pub fn events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Controller name reported on Kubernetes Events
    pub fn controller_name(mut self, name: impl Into<String>) -> Self {
        self.controller_name = name.into();
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        let client = self
            .client
            .unwrap_or_else(|| Arc::new(KubeClusterClient::new(self.kube.clone())));
        let events = self.events.unwrap_or_else(|| {
            Arc::new(KubeEventPublisher::new(
                self.kube.clone(),
                &self.controller_name,
            ))
        });
        Context {
            client,
            resources: self.resources,
            events,
        }
    }
}
