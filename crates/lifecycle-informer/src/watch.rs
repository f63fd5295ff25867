//! Drive a kube-runtime watcher into an [`Informer`]

use futures::{Stream, StreamExt};
use kube::api::{Api, DynamicObject};
use kube::runtime::watcher;
use tracing::{debug, info, warn};

use crate::informer::Informer;

/// Watch timeout (seconds) - must be less than the client read timeout (30s)
/// so the API server closes idle watches before the client gives up on them.
pub const WATCH_TIMEOUT_SECS: u32 = 25;

/// Selection of the resources an informer mirrors
#[derive(Clone, Debug, Default)]
pub struct WatchConfig {
    /// Label selector (e.g. "app.kubernetes.io/managed-by=my-operator")
    pub label_selector: Option<String>,
    /// Field selector
    pub field_selector: Option<String>,
}

impl WatchConfig {
    /// Restrict the watch to resources matching a label selector
    pub fn labels(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    /// Restrict the watch to resources matching a field selector
    pub fn fields(mut self, selector: impl Into<String>) -> Self {
        self.field_selector = Some(selector.into());
        self
    }

    /// Convert into a kube-runtime watcher config
    pub fn to_watcher_config(&self) -> watcher::Config {
        let mut config = watcher::Config::default().timeout(WATCH_TIMEOUT_SECS);
        if let Some(labels) = &self.label_selector {
            config = config.labels(labels);
        }
        if let Some(fields) = &self.field_selector {
            config = config.fields(fields);
        }
        config
    }
}

/// Watch `api` and mirror every event into the informer's cache
///
/// Runs until the watch stream ends. Stream errors are logged and the watcher
/// retries on its own; they never stop the loop.
pub async fn watch_into_cache(api: Api<DynamicObject>, config: &WatchConfig, informer: Informer) {
    info!(
        labels = ?config.label_selector,
        fields = ?config.field_selector,
        "starting resource watch"
    );
    let stream = watcher::watcher(api, config.to_watcher_config());
    drain_events(stream, &informer).await;
    info!("resource watch stopped");
}

/// Feed a stream of watcher events into the informer
pub async fn drain_events<S>(stream: S, informer: &Informer)
where
    S: Stream<Item = Result<watcher::Event<DynamicObject>, watcher::Error>>,
{
    let mut stream = std::pin::pin!(stream);
    while let Some(item) = stream.next().await {
        match item {
            Ok(event) => informer.handle_watch_event(event),
            Err(e) => warn!(error = %e, "watch stream error, continuing"),
        }
    }
    debug!(cached = informer.cache().len(), "watch stream drained");
}
