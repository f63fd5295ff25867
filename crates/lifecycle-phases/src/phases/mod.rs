//! Phase handlers for workload teardown.
//!
//! Each step of the deletion lifecycle is handled by a dedicated module. The
//! handlers hold no state between invocations: every call re-reads the
//! cluster, so a requeued or restarted reconciliation resumes where the
//! previous one stopped.

mod complete;
mod delete;
mod hooks;
#[cfg(test)]
pub(crate) mod testing;

pub use complete::deletion_complete_phase;
pub use delete::delete_phase;
pub use hooks::{has_token, register_delete_hooks, release_delete_hooks};

use std::sync::Arc;
use std::time::Duration;

use kube::api::DynamicObject;
use kube::runtime::controller::Action;
use tracing::{debug, error, info, instrument};

use lifecycle_common::{Error, ResourceIdentity};

use crate::context::Context;
use crate::options::PhaseOptions;
use crate::request::Request;

/// Requeue delay while a managed resource is still terminating
pub const IN_PROGRESS_REQUEUE: Duration = Duration::from_secs(5);

/// Requeue delay after a retryable failure
pub const RETRYABLE_ERROR_REQUEUE: Duration = Duration::from_secs(5);

/// Requeue delay after a failure that needs outside intervention
pub const PERMANENT_ERROR_REQUEUE: Duration = Duration::from_secs(60);

/// Result of a phase that did not fail
///
/// Failures are reported through the `Err` side of the phase's `Result`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// Every managed resource is confirmed absent (or detached)
    Complete,
    /// A resource survived its delete call; run the phase again later
    InProgress {
        /// The resource that is still present
        blocked_on: ResourceIdentity,
    },
}

impl PhaseOutcome {
    /// Whether the phase finished
    pub fn is_complete(&self) -> bool {
        matches!(self, PhaseOutcome::Complete)
    }

    /// Map the outcome onto a controller action
    pub fn into_action(self) -> Action {
        match self {
            PhaseOutcome::Complete => Action::await_change(),
            PhaseOutcome::InProgress { .. } => Action::requeue(IN_PROGRESS_REQUEUE),
        }
    }
}

/// Error policy for a workload controller running these phases
///
/// Conflicts and transient failures come back quickly; anything that needs a
/// human to fix the object backs off further.
pub fn error_policy(workload: Arc<DynamicObject>, error: &Error, _ctx: Arc<Context>) -> Action {
    let identity = ResourceIdentity::of(&workload);
    error!(?error, workload = %identity, "reconciliation failed");

    if error.is_retryable() {
        Action::requeue(RETRYABLE_ERROR_REQUEUE)
    } else {
        Action::requeue(PERMANENT_ERROR_REQUEUE)
    }
}

/// Reconcile entry for a workload that carries a deletion timestamp
///
/// Tears down the managed resources, runs the completion phase and finally
/// releases the workload finalizer so the cluster can remove the owner.
#[instrument(skip_all, fields(workload = %req.identity()))]
pub async fn handle_deletion(
    ctx: &Context,
    req: &mut Request,
    options: &PhaseOptions,
) -> Result<Action, Error> {
    if !has_token(req.finalizers(), &req.workload_finalizer()) {
        debug!("no workload finalizer, allowing deletion");
        return Ok(Action::await_change());
    }

    let outcome = delete_phase(ctx, req, options).await?;
    if let PhaseOutcome::InProgress { blocked_on } = &outcome {
        info!(blocked_on = %blocked_on, "teardown in progress, requeueing");
        return Ok(outcome.into_action());
    }

    let outcome = deletion_complete_phase(ctx, req, options).await?;
    release_delete_hooks(ctx, req).await?;
    Ok(outcome.into_action())
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    use lifecycle_common::events::NoopEventPublisher;

    use crate::client::{MockClusterClient, MockManagedResources};

    #[test]
    fn outcome_maps_to_action() {
        assert_eq!(PhaseOutcome::Complete.into_action(), Action::await_change());
        let blocked = PhaseOutcome::InProgress {
            blocked_on: ResourceIdentity::of(&deployment("web")),
        };
        assert!(!blocked.is_complete());
        assert_eq!(blocked.into_action(), Action::requeue(IN_PROGRESS_REQUEUE));
    }

    #[test]
    fn error_policy_backs_off_on_permanent_errors() {
        let ctx = Arc::new(Context::for_testing(
            Arc::new(MockClusterClient::new()),
            Arc::new(MockManagedResources::new()),
            Arc::new(NoopEventPublisher),
        ));
        let workload = Arc::new(workload());

        let action = error_policy(workload.clone(), &api_error(409), ctx.clone());
        assert_eq!(action, Action::requeue(RETRYABLE_ERROR_REQUEUE));

        let action = error_policy(workload, &Error::malformed("no kind"), ctx);
        assert_eq!(action, Action::requeue(PERMANENT_ERROR_REQUEUE));
    }

    // Story: a workload is deleted while its ConfigMap carries our child
    // finalizer. One reconcile tears the ConfigMap down, reports completion
    // and drops the workload finalizer so the owner can go away.
    #[tokio::test]
    async fn deletion_runs_to_completion_and_releases_owner() {
        let req = deleting_request();
        let cluster = Arc::new(FakeCluster::new());
        cluster.insert(req.workload().clone());
        cluster.insert(with_child_finalizer(configmap("settings")));
        let events = Arc::new(RecordingPublisher::default());
        let ctx = context(cluster.clone(), vec![configmap("settings")], events.clone());

        let mut req = req;
        let action = handle_deletion(&ctx, &mut req, &PhaseOptions::default())
            .await
            .expect("deletion should succeed");

        assert_eq!(action, Action::await_change());
        assert!(!cluster.contains(&configmap("settings")));
        assert!(!has_token(req.finalizers(), &req.workload_finalizer()));
        assert_eq!(
            cluster.calls().last(),
            Some(&Call::Update("WebStore/store".to_string()))
        );
        assert!(events.reasons().contains(&"DeletionComplete".to_string()));
    }

    // Story: a third party holds a finalizer on the Deployment, so the
    // workload finalizer must stay in place until a later reconcile.
    #[tokio::test]
    async fn blocked_teardown_keeps_workload_finalizer() {
        let req = deleting_request();
        let cluster = Arc::new(FakeCluster::new());
        cluster.insert(req.workload().clone());
        cluster.insert(with_finalizer(deployment("web"), "storage.example.com/protect"));
        let ctx = context(
            cluster.clone(),
            vec![deployment("web")],
            Arc::new(RecordingPublisher::default()),
        );

        let mut req = req;
        let action = handle_deletion(&ctx, &mut req, &PhaseOptions::default())
            .await
            .expect("blocked teardown is not an error");

        assert_eq!(action, Action::requeue(IN_PROGRESS_REQUEUE));
        assert!(has_token(req.finalizers(), &req.workload_finalizer()));
        assert!(!cluster
            .calls()
            .contains(&Call::Update("WebStore/store".to_string())));
    }

    #[tokio::test]
    async fn workload_without_finalizer_is_left_alone() {
        let mut req = request();
        let ctx = Context::for_testing(
            Arc::new(MockClusterClient::new()),
            Arc::new(MockManagedResources::new()),
            Arc::new(NoopEventPublisher),
        );

        let action = handle_deletion(&ctx, &mut req, &PhaseOptions::default())
            .await
            .expect("nothing to do");
        assert_eq!(action, Action::await_change());
    }
}
