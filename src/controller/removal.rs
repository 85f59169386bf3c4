//! Deletion of the upstream cluster when its config is removed.
//!
//! Runs once per deletion, outside the phase state machine. Imported clusters
//! and configs that never reached Creating are left alone upstream.

use std::fmt;

use kube::ResourceExt;
use tracing::{info, warn};

use crate::controller::error::{Error, Result};
use crate::controller::lifecycle::Lifecycle;
use crate::crd::{ClusterConfigPhase, TkeClusterConfig};
use crate::retry::retry_with_backoff;

/// Action name recorded for cluster deletion
pub const ACTION_DELETE_CLUSTER: &str = "DeleteCluster";

/// What the removal workflow did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The cluster was imported and is not owned by this operator
    SkippedImported,
    /// The config never left NotCreated
    SkippedNotCreated,
    /// No cluster ID was ever recorded
    NothingToDelete,
    /// The delete call succeeded
    Deleted,
    /// The cluster no longer exists upstream
    AlreadyGone,
}

impl RemovalOutcome {
    /// Whether an upstream delete was attempted.
    pub fn attempted_delete(&self) -> bool {
        matches!(self, RemovalOutcome::Deleted | RemovalOutcome::AlreadyGone)
    }
}

impl fmt::Display for RemovalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalOutcome::SkippedImported => write!(f, "imported cluster left in place"),
            RemovalOutcome::SkippedNotCreated => write!(f, "cluster was never created"),
            RemovalOutcome::NothingToDelete => write!(f, "no cluster ID recorded"),
            RemovalOutcome::Deleted => write!(f, "cluster deleted"),
            RemovalOutcome::AlreadyGone => write!(f, "cluster already removed"),
        }
    }
}

impl Lifecycle {
    /// Delete the upstream cluster owned by `config`.
    ///
    /// The delete call is retried with exponential backoff on retryable errors.
    /// A cluster-not-found answer counts as success.
    pub async fn on_remove(&self, config: &TkeClusterConfig) -> Result<RemovalOutcome> {
        let name = config.name_any();

        if config.spec.imported {
            info!(name = %name, "Cluster is imported, will not delete TKE cluster");
            return Ok(RemovalOutcome::SkippedImported);
        }
        if config.phase() == ClusterConfigPhase::NotCreated {
            warn!(name = %name, "Cluster never advanced to creating, will not delete TKE cluster");
            return Ok(RemovalOutcome::SkippedNotCreated);
        }
        if config.spec.cluster_id.is_empty() {
            return Ok(RemovalOutcome::NothingToDelete);
        }

        let cluster_id = config.spec.cluster_id.as_str();
        retry_with_backoff(
            &self.settings().removal_backoff,
            "delete_cluster",
            Error::is_retryable,
            || async {
                let cloud = self.connect(config).await?;
                info!(name = %name, cluster_id = %cluster_id, region = %config.spec.region, "Removing cluster");
                if let Some(metrics) = self.metrics() {
                    metrics.record_removal_attempt();
                    metrics.record_mutation(ACTION_DELETE_CLUSTER);
                }
                match cloud.delete_cluster(cluster_id).await {
                    Ok(()) => Ok(RemovalOutcome::Deleted),
                    Err(e) if e.is_cluster_not_found() => {
                        info!(name = %name, cluster_id = %cluster_id, "Cluster already removed");
                        Ok(RemovalOutcome::AlreadyGone)
                    }
                    Err(e) => Err(Error::from(e)),
                }
            },
        )
        .await
    }
}
