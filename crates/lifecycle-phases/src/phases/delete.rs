//! Teardown of a workload's managed resources.
//!
//! Resources are removed in the reverse of deployment order, one at a time.
//! For each one the child finalizer is released, the delete is issued and the
//! resource is fetched again to confirm it is gone. A resource that survives
//! its delete (another controller still holds a finalizer on it) stops the
//! walk with [`PhaseOutcome::InProgress`] so the caller can requeue.
//!
//! Preserved schema resources are detached instead: owner references and the
//! child finalizer are dropped in one update and the resource is left alone.

use kube::api::DynamicObject;
use kube::runtime::events::EventType;
use kube::ResourceExt;
use tracing::{debug, info, instrument};

use lifecycle_common::events::{actions, reasons};
use lifecycle_common::finalizer::{has_finalizer, remove_finalizer};
use lifecycle_common::kube_utils::object_reference;
use lifecycle_common::{Error, ResourceIdentity};

use super::PhaseOutcome;
use crate::context::Context;
use crate::options::PhaseOptions;
use crate::request::Request;

/// What teardown of a single resource left behind
enum Teardown {
    Absent,
    StillPresent,
}

/// Delete every managed resource of the workload and confirm each is gone
///
/// Returns `InProgress` (not an error) when a resource is still present after
/// its delete call. With `skip_schema_resource_deletion` set, CRDs are
/// detached from the workload instead of deleted.
#[instrument(skip_all, fields(workload = %req.identity()))]
pub async fn delete_phase(
    ctx: &Context,
    req: &Request,
    options: &PhaseOptions,
) -> Result<PhaseOutcome, Error> {
    let mut resources = ctx
        .resources
        .managed_resources(req)
        .await
        .map_err(|e| Error::during("get managed resources of", req.identity(), e))?;
    resources.reverse();
    debug!(count = resources.len(), "tearing down managed resources");

    let child_finalizer = req.child_finalizer();
    for resource in &resources {
        let identity = ResourceIdentity::addressable(resource)?;

        if options.skip_schema_resource_deletion && identity.is_schema_resource() {
            detach(ctx, req, resource, &identity, &child_finalizer).await?;
            continue;
        }

        if let Teardown::StillPresent =
            teardown(ctx, resource, &identity, &child_finalizer).await?
        {
            info!(resource = %identity, "resource still present after delete");
            ctx.events
                .publish(
                    &object_reference(req.workload()),
                    EventType::Warning,
                    reasons::DELETION_BLOCKED,
                    actions::DELETE,
                    Some(format!(
                        "{} {} is still present after delete",
                        identity.kind, identity.name
                    )),
                )
                .await;
            return Ok(PhaseOutcome::InProgress {
                blocked_on: identity,
            });
        }
    }

    Ok(PhaseOutcome::Complete)
}

/// Fetch the live copy, treating a not-found error like an absent resource
async fn fetch(
    ctx: &Context,
    resource: &DynamicObject,
    identity: &ResourceIdentity,
) -> Result<Option<DynamicObject>, Error> {
    match ctx.client.get_resource(resource).await {
        Ok(found) => Ok(found),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(Error::during("get", identity, e)),
    }
}

async fn teardown(
    ctx: &Context,
    resource: &DynamicObject,
    identity: &ResourceIdentity,
    child_finalizer: &str,
) -> Result<Teardown, Error> {
    let Some(mut live) = fetch(ctx, resource, identity).await? else {
        debug!(resource = %identity, "already deleted");
        return Ok(Teardown::Absent);
    };

    if has_finalizer(live.finalizers(), child_finalizer) {
        let baseline = live.clone();
        remove_finalizer(&mut live, child_finalizer);

        info!(
            kind = %identity.kind,
            name = %identity.name,
            namespace = %identity.namespace,
            "deleting resource"
        );

        ctx.client
            .patch_resource(&live, &baseline)
            .await
            .map_err(|e| Error::during("remove finalizer from", identity, e))?;
    }

    match ctx.client.delete_resource(resource).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            debug!(resource = %identity, "already deleted");
            return Ok(Teardown::Absent);
        }
        Err(e) => return Err(Error::during("delete", identity, e)),
    }

    match fetch(ctx, resource, identity).await? {
        None => Ok(Teardown::Absent),
        Some(_) => Ok(Teardown::StillPresent),
    }
}

/// Strip owner references and the child finalizer from a schema resource so
/// it outlives the workload
///
/// The child finalizer goes in the same update: once the owner is gone no
/// controller would release it, and a later delete of the CRD would hang.
async fn detach(
    ctx: &Context,
    req: &Request,
    resource: &DynamicObject,
    identity: &ResourceIdentity,
    child_finalizer: &str,
) -> Result<(), Error> {
    let Some(mut live) = fetch(ctx, resource, identity).await? else {
        debug!(resource = %identity, "schema resource already gone");
        return Ok(());
    };

    let released = remove_finalizer(&mut live, child_finalizer);
    if live.owner_references().is_empty() && !released {
        debug!(resource = %identity, "schema resource already detached");
        return Ok(());
    }

    live.metadata.owner_references = None;
    ctx.client
        .update_resource(&live)
        .await
        .map_err(|e| Error::during("detach", identity, e))?;

    info!(resource = %identity, "preserved schema resource, removed owner references");
    ctx.events
        .publish(
            &object_reference(req.workload()),
            EventType::Normal,
            reasons::SCHEMA_RESOURCE_PRESERVED,
            actions::DELETE,
            Some(format!("{} {} was detached and kept", identity.kind, identity.name)),
        )
        .await;
    Ok(())
}
