//! Terminal step of a teardown

use kube::runtime::events::EventType;
use tracing::{info, instrument};

use lifecycle_common::events::{actions, reasons};
use lifecycle_common::kube_utils::object_reference;
use lifecycle_common::Error;

use super::PhaseOutcome;
use crate::context::Context;
use crate::options::PhaseOptions;
use crate::request::Request;

/// Record that every managed resource of the workload is gone
///
/// Run once [`super::delete_phase`] reports completion. Makes no cluster
/// writes of its own.
#[instrument(skip_all, fields(workload = %req.identity()))]
pub async fn deletion_complete_phase(
    ctx: &Context,
    req: &Request,
    _options: &PhaseOptions,
) -> Result<PhaseOutcome, Error> {
    info!("successfully deleted");
    ctx.events
        .publish(
            &object_reference(req.workload()),
            EventType::Normal,
            reasons::DELETION_COMPLETE,
            actions::DELETE,
            Some("All managed resources deleted".to_string()),
        )
        .await;
    Ok(PhaseOutcome::Complete)
}
