//! Reconciliation entry point for TKEClusterConfig.
//!
//! Handles finalizers, deletion, events and metrics around each pass; the
//! phase logic itself lives in [`Lifecycle`](crate::controller::lifecycle::Lifecycle).

use std::sync::Arc;
use std::time::{Duration, Instant};

use kube::{Api, ResourceExt, runtime::controller::Action};
use tracing::{debug, error, info, warn};

use crate::controller::common::{add_finalizer, remove_finalizer};
use crate::controller::context::Context;
use crate::controller::error::Error;
use crate::controller::removal::RemovalOutcome;
use crate::crd::{ClusterConfigPhase, TkeClusterConfig};

/// Finalizer guarding removal of the upstream cluster
pub const FINALIZER: &str = "tke.pandaria.io/cluster-removal";

/// Reconcile a TKEClusterConfig
pub async fn reconcile(obj: Arc<TkeClusterConfig>, ctx: Arc<Context>) -> Result<Action, Error> {
    let start_time = Instant::now();
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());

    debug!(name = %name, namespace = %namespace, "Reconciling TKEClusterConfig");

    let api: Api<TkeClusterConfig> = Api::namespaced(ctx.client.clone(), &namespace);

    if obj.metadata.deletion_timestamp.is_some() {
        return handle_deletion(&obj, &ctx, &api).await;
    }

    if !obj.finalizers().iter().any(|f| f == FINALIZER) {
        info!(name = %name, "Adding finalizer");
        add_finalizer(&api, &name, FINALIZER).await?;
        return Ok(Action::requeue(Duration::from_secs(1)));
    }

    // The reflector can trail our own status writes after an immediate requeue
    let latest = match ctx.lifecycle.configs().get(&namespace, &name).await {
        Ok(latest) => latest,
        Err(e) if e.is_not_found() => return Ok(Action::await_change()),
        Err(e) => return Err(e),
    };

    let previous_phase = latest.phase();
    let previous_message = latest.failure_message().to_string();
    let result = ctx.lifecycle.on_change(latest).await;

    if let Some(updated) = &result.config {
        let phase = updated.phase();
        if phase != previous_phase {
            ctx.publish_normal_event(
                updated,
                "PhaseChanged",
                "Reconciling",
                Some(format!("Phase changed from {} to {}", previous_phase, phase)),
            )
            .await;
        }
        if let Err(e) = &result.outcome
            && updated.failure_message() != previous_message
        {
            ctx.publish_warning_event(updated, "ReconcileFailed", "Reconciling", Some(e.to_string()))
                .await;
        }
    }

    if let Some(ref health_state) = ctx.health_state {
        let duration = start_time.elapsed().as_secs_f64();
        health_state
            .metrics
            .record_reconcile(&namespace, &name, duration);
        if let Some(cache) = &ctx.cache {
            let snapshot = cache.state();
            for (phase, count) in count_by_phase(snapshot.iter().map(|c| c.phase())) {
                health_state
                    .metrics
                    .set_resources_by_phase(&phase.to_string(), count);
            }
        }
    }

    result.outcome.map(|requeue| requeue.into_action())
}

/// Error policy for the controller
pub fn error_policy(obj: Arc<TkeClusterConfig>, error: &Error, ctx: Arc<Context>) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());

    if let Some(ref health_state) = ctx.health_state {
        health_state.metrics.record_error(&namespace, &name);
    }

    if error.is_not_found() {
        debug!(name = %name, "Resource not found (likely deleted)");
        return Action::await_change();
    }

    let delay = error.requeue_after(ctx.lifecycle.scheduler().interval());
    if error.is_retryable() {
        warn!(name = %name, error = %error, "Retryable error, will retry");
    } else {
        error!(name = %name, error = %error, delay_secs = delay.as_secs(), "Non-retryable error");
    }
    Action::requeue(delay)
}

/// Delete the upstream cluster, then release the finalizer.
async fn handle_deletion(
    obj: &TkeClusterConfig,
    ctx: &Context,
    api: &Api<TkeClusterConfig>,
) -> Result<Action, Error> {
    let name = obj.name_any();
    if !obj.finalizers().iter().any(|f| f == FINALIZER) {
        return Ok(Action::await_change());
    }

    info!(name = %name, "Handling deletion");
    match ctx.lifecycle.on_remove(obj).await {
        Ok(outcome) => {
            let reason = removal_reason(outcome);
            ctx.publish_normal_event(obj, reason, "Deleting", Some(outcome.to_string()))
                .await;
        }
        Err(e) => {
            ctx.publish_warning_event(obj, "ClusterRemovalFailed", "Deleting", Some(e.to_string()))
                .await;
            return Err(e);
        }
    }

    remove_finalizer(api, &name, FINALIZER).await?;
    Ok(Action::await_change())
}

/// Event reason for a finished removal.
fn removal_reason(outcome: RemovalOutcome) -> &'static str {
    if outcome.attempted_delete() {
        "ClusterDeleted"
    } else {
        "ClusterRemovalSkipped"
    }
}

/// Number of configs in each phase, covering every phase.
pub fn count_by_phase(
    phases: impl IntoIterator<Item = ClusterConfigPhase>,
) -> Vec<(ClusterConfigPhase, i64)> {
    let mut counts: Vec<(ClusterConfigPhase, i64)> =
        ClusterConfigPhase::ALL.iter().map(|p| (*p, 0)).collect();
    for phase in phases {
        if let Some(entry) = counts.iter_mut().find(|(p, _)| *p == phase) {
            entry.1 += 1;
        }
    }
    counts
}
