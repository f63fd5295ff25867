//! Workload finalizer registration.
//!
//! The workload finalizer keeps the garbage collector from removing the owner
//! before teardown has confirmed its managed resources are gone.

use kube::runtime::events::EventType;
use tracing::{debug, info};

use lifecycle_common::events::{actions, reasons};
use lifecycle_common::finalizer::{add_finalizer, remove_finalizer};
use lifecycle_common::kube_utils::object_reference;
use lifecycle_common::Error;

use crate::context::Context;
use crate::request::Request;

pub use lifecycle_common::finalizer::has_finalizer as has_token;

/// Attach the workload finalizer so teardown runs before the owner is deleted
///
/// Does nothing once the workload is marked for deletion or already carries
/// the token. A failed update is returned for the caller to requeue.
pub async fn register_delete_hooks(ctx: &Context, req: &mut Request) -> Result<(), Error> {
    if req.is_being_deleted() {
        return Ok(());
    }

    let token = req.workload_finalizer();
    let mut workload = req.workload().clone();
    if !add_finalizer(&mut workload, &token) {
        return Ok(());
    }

    let updated = ctx
        .client
        .update_resource(&workload)
        .await
        .map_err(|e| Error::during("register delete hook on", req.identity(), e))?;
    req.replace_workload(updated);

    info!(workload = %req.identity(), finalizer = %token, "registered delete hook");
    ctx.events
        .publish(
            &object_reference(req.workload()),
            EventType::Normal,
            reasons::DELETE_HOOK_REGISTERED,
            actions::REGISTER,
            Some(format!("Added finalizer {}", token)),
        )
        .await;
    Ok(())
}

/// Remove the workload finalizer after teardown completed
pub async fn release_delete_hooks(ctx: &Context, req: &mut Request) -> Result<(), Error> {
    let token = req.workload_finalizer();
    let mut workload = req.workload().clone();
    if !remove_finalizer(&mut workload, &token) {
        debug!(workload = %req.identity(), "workload finalizer already released");
        return Ok(());
    }

    let updated = ctx
        .client
        .update_resource(&workload)
        .await
        .map_err(|e| Error::during("release delete hook on", req.identity(), e))?;
    req.replace_workload(updated);

    info!(workload = %req.identity(), finalizer = %token, "released delete hook");
    Ok(())
}
