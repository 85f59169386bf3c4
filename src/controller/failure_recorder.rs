//! Records the outcome of a pass on the resource status.
//!
//! The last error text is kept in `status.failureMessage`, cleared on success.
//! A failure while Active moves the resource to Updating. Nothing is written
//! when the message is unchanged.

use kube::ResourceExt;
use tracing::{error, info};

use crate::controller::error::{Error, Result};
use crate::controller::requeue::Requeue;
use crate::controller::state_machine::{ClusterEvent, ClusterStateMachine, TransitionResult};
use crate::controller::store::{ConfigStore, StatusPatch};
use crate::crd::TkeClusterConfig;

/// The patch that records `outcome`, or `None` when the stored message already matches.
pub fn failure_patch(
    machine: &ClusterStateMachine,
    config: &TkeClusterConfig,
    outcome: &std::result::Result<Requeue, Error>,
) -> Option<StatusPatch> {
    let message = match outcome {
        Ok(_) => String::new(),
        Err(e) => e.to_string(),
    };

    if config.failure_message() == message {
        return None;
    }

    let mut patch = StatusPatch::new();
    if !message.is_empty()
        && let TransitionResult::Success { from, to, .. } =
            machine.transition(config.phase(), ClusterEvent::FailureRecorded)
        && from != to
    {
        patch = patch.phase(to);
    }
    Some(patch.failure_message(message))
}

/// Persist the failure message for a finished pass.
///
/// Returns the latest snapshot together with the pass's own outcome. A failed
/// status write is logged and does not replace the outcome.
pub async fn record(
    store: &dyn ConfigStore,
    machine: &ClusterStateMachine,
    config: TkeClusterConfig,
    outcome: Result<Requeue>,
) -> (TkeClusterConfig, Result<Requeue>) {
    let Some(patch) = failure_patch(machine, &config, &outcome) else {
        return (config, outcome);
    };

    if let Some(phase) = patch.target_phase() {
        info!(name = %config.name_any(), phase = %phase, "Failure moves resource out of Active");
    }
    match store.update_status(&config, &patch).await {
        Ok(updated) => (updated, outcome),
        Err(e) => {
            error!(name = %config.name_any(), error = %e, "Error recording failure message");
            (config, outcome)
        }
    }
}
