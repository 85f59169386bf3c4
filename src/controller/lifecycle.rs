//! Per-phase handlers for TKEClusterConfig passes.
//!
//! [`Lifecycle::on_change`] picks a handler from the current phase, runs it,
//! and hands the outcome to the failure recorder. Handlers work on a snapshot
//! slot that is replaced wholesale each time the store returns a newer object;
//! nothing is mutated in place.

use std::sync::Arc;

use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::client::{
    ClusterStatus, CloudApi, CloudConnector, EndpointStatus, InstanceState, RemoteNodePool,
};
use crate::config::ReconcileSettings;
use crate::controller::applier::DriftApplier;
use crate::controller::ca_secret::ensure_ca_secret;
use crate::controller::credentials;
use crate::controller::drift::{self, DriftPlan};
use crate::controller::error::{Error, Result};
use crate::controller::failure_recorder;
use crate::controller::normalize::observed_spec;
use crate::controller::requeue::{Requeue, RequeueScheduler};
use crate::controller::state_machine::{
    ClusterEvent, ClusterStateMachine, PhaseHandler, TransitionResult, handler_for,
};
use crate::controller::store::{ConfigStore, SecretStore, SpecPatch, StatusPatch, retry_on_conflict};
use crate::crd::{ClusterConfigPhase, TkeClusterConfig};
use crate::health::{HealthState, Metrics};

/// Action name recorded for endpoint creation
pub const ACTION_CREATE_CLUSTER_ENDPOINT: &str = "CreateClusterEndpoint";

/// Outcome of one pass.
#[derive(Debug)]
pub struct PassResult {
    /// Latest known object, `None` when the object is being deleted
    pub config: Option<TkeClusterConfig>,
    pub outcome: Result<Requeue>,
}

/// Drives a TKEClusterConfig through its phases.
pub struct Lifecycle {
    configs: Arc<dyn ConfigStore>,
    secrets: Arc<dyn SecretStore>,
    connector: Arc<dyn CloudConnector>,
    settings: ReconcileSettings,
    machine: ClusterStateMachine,
    scheduler: RequeueScheduler,
    health: Option<Arc<HealthState>>,
}

impl Lifecycle {
    pub fn new(
        configs: Arc<dyn ConfigStore>,
        secrets: Arc<dyn SecretStore>,
        connector: Arc<dyn CloudConnector>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            configs,
            secrets,
            connector,
            scheduler: RequeueScheduler::new(settings.requeue_interval),
            settings,
            machine: ClusterStateMachine::new(),
            health: None,
        }
    }

    pub fn with_health(mut self, health: Option<Arc<HealthState>>) -> Self {
        self.health = health;
        self
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    pub fn scheduler(&self) -> &RequeueScheduler {
        &self.scheduler
    }

    pub(crate) fn configs(&self) -> &dyn ConfigStore {
        self.configs.as_ref()
    }

    pub(crate) fn secrets(&self) -> &dyn SecretStore {
        self.secrets.as_ref()
    }

    pub(crate) fn connector(&self) -> &dyn CloudConnector {
        self.connector.as_ref()
    }

    pub(crate) fn metrics(&self) -> Option<&Metrics> {
        self.health.as_deref().map(|h| &h.metrics)
    }

    /// Run one pass for `config` and record its outcome on the status.
    pub async fn on_change(&self, config: TkeClusterConfig) -> PassResult {
        if config.metadata.deletion_timestamp.is_some() {
            return PassResult {
                config: None,
                outcome: Ok(Requeue::Done),
            };
        }

        let mut latest = config;
        let handler = handler_for(latest.phase());
        debug!(name = %latest.name_any(), phase = %latest.phase(), ?handler, "Dispatching pass");

        let outcome = match handler {
            PhaseHandler::Create => self.create(&mut latest).await,
            PhaseHandler::Import => self.import(&mut latest).await,
            PhaseHandler::AwaitCreation => self.wait_for_creation(&mut latest).await,
            PhaseHandler::CheckAndUpdate => self.check_and_update(&mut latest).await,
        };

        let (latest, outcome) =
            failure_recorder::record(self.configs(), &self.machine, latest, outcome).await;
        PassResult {
            config: Some(latest),
            outcome,
        }
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    async fn create(&self, latest: &mut TkeClusterConfig) -> Result<Requeue> {
        if latest.spec.imported {
            return self.advance(latest, ClusterEvent::ImportRequested).await;
        }

        validate(latest)?;

        if !latest.spec.cluster_id.is_empty() {
            warn!(
                name = %latest.name_any(),
                cluster_id = %latest.spec.cluster_id,
                "Cluster ID set on a config that was never created, skipping creation"
            );
            return Ok(Requeue::Done);
        }

        let cloud = self.connect(latest).await?;
        info!(name = %latest.name_any(), region = %latest.spec.region, "Creating cluster");
        if let Some(metrics) = self.metrics() {
            metrics.record_mutation("CreateCluster");
        }
        let cluster_id = cloud.create_cluster(&latest.spec).await?;
        info!(name = %latest.name_any(), cluster_id = %cluster_id, "Cluster creation requested");

        *latest = self
            .configs
            .update_spec(latest, &SpecPatch::new().cluster_id(cluster_id))
            .await?;
        self.advance(latest, ClusterEvent::CreationRequested).await
    }

    async fn import(&self, latest: &mut TkeClusterConfig) -> Result<Requeue> {
        validate_import(latest)?;

        let cloud = self.connect(latest).await?;
        let cluster_id = latest.spec.cluster_id.clone();
        info!(name = %latest.name_any(), cluster_id = %cluster_id, "Importing cluster");

        let cluster = cloud.describe_cluster(&cluster_id).await?;
        let pools = cloud.describe_cluster_node_pools(&cluster_id).await?;
        let observed = observed_spec(cloud.as_ref(), &cluster, &pools).await?;

        *latest = self
            .configs
            .update_spec(latest, &SpecPatch::new().adopt(observed))
            .await?;
        ensure_ca_secret(cloud.as_ref(), self.secrets(), latest).await?;

        self.advance(latest, ClusterEvent::ImportCompleted).await
    }

    async fn wait_for_creation(&self, latest: &mut TkeClusterConfig) -> Result<Requeue> {
        let name = latest.name_any();
        if latest.spec.cluster_id.is_empty() {
            return Err(Error::required_field("clusterId", &name));
        }

        let cloud = self.connect(latest).await?;
        let cluster = cloud.describe_cluster(&latest.spec.cluster_id).await?.decode()?;

        match cluster.status {
            ClusterStatus::Abnormal => Err(Error::CreationFailed(format!(
                "creation failed for cluster {}",
                name
            ))),
            ClusterStatus::Running => {
                info!(name = %name, cluster_id = %cluster.cluster_id, "Cluster is running");
                self.advance(latest, ClusterEvent::ClusterRunning).await
            }
            status => {
                info!(name = %name, status = ?status, "Waiting for cluster to finish creating");
                Ok(self.scheduler.wait_upstream())
            }
        }
    }

    async fn check_and_update(&self, latest: &mut TkeClusterConfig) -> Result<Requeue> {
        if let Err(e) = validate(latest) {
            self.advance(latest, ClusterEvent::FailureRecorded).await?;
            return Err(e);
        }

        let cloud = self.connect(latest).await?;
        let name = latest.name_any();
        let cluster_id = latest.spec.cluster_id.clone();

        let cluster = cloud.describe_cluster(&cluster_id).await?;
        let summary = cluster.decode()?;
        let pools = cloud.describe_cluster_node_pools(&cluster_id).await?;
        let busy_pool = pools
            .iter()
            .map(RemoteNodePool::decode)
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .find(|p| p.life_state.is_transitional());

        if summary.status == ClusterStatus::Abnormal {
            info!(name = %name, cluster_id = %cluster_id, "Waiting for abnormal cluster to recover");
            self.advance(latest, ClusterEvent::UpstreamBusy).await?;
            return Ok(self.scheduler.wait_upstream());
        }
        if let Some(pool) = busy_pool {
            info!(
                name = %name,
                node_pool_id = %pool.node_pool_id,
                life_state = ?pool.life_state,
                "Waiting for node pool to finish updating"
            );
            self.advance(latest, ClusterEvent::UpstreamBusy).await?;
            return Ok(self.scheduler.wait_upstream());
        }

        let observed = observed_spec(cloud.as_ref(), &cluster, &pools).await?;
        let desired = latest.spec.clone();
        let applier = DriftApplier::new(
            cloud.as_ref(),
            &cluster_id,
            self.settings.keep_instances_on_pool_delete,
        )
        .with_metrics(self.metrics());

        let plan = drift::plan(&desired, &observed);
        if plan.mutates() {
            info!(name = %name, cluster_id = %cluster_id, "Drift detected, updating upstream");
        }
        match plan {
            DriftPlan::ClusterAttributes => {
                applier
                    .modify_cluster_attributes(&drift::attribute_target(&desired, &observed))
                    .await?;
                self.enqueue_update(latest).await
            }
            DriftPlan::NoNodePools => self.converge(latest).await,
            DriftPlan::ProvisionNodePools(indices) => {
                let provisioned = applier.provision(&desired.node_pool_list, &indices).await;
                if !provisioned.created.is_empty() {
                    let patch = provisioned
                        .created
                        .iter()
                        .fold(SpecPatch::new(), |patch, (index, id)| {
                            let name = desired
                                .node_pool_list
                                .get(*index)
                                .map(|p| p.name.clone())
                                .unwrap_or_default();
                            patch.node_pool_id(*index, name, id.clone())
                        });
                    *latest = self.write_spec(latest, &patch).await?;
                }
                if let Some(e) = provisioned.error {
                    return Err(e.into());
                }
                self.advance(latest, ClusterEvent::DriftDetected).await?;
                Ok(self.scheduler.wait_upstream())
            }
            DriftPlan::NodePoolChanges(changes) => {
                let planned = changes.call_count();
                let calls = applier.apply_pool_changes(&changes).await?;
                debug!(name = %name, planned, calls, "Applied node pool changes");
                self.enqueue_update(latest).await
            }
            DriftPlan::Converged => {
                if !desired.imported
                    && let Some(requeue) = self.reconcile_endpoint(cloud.as_ref(), latest).await?
                {
                    return Ok(requeue);
                }
                self.converge(latest).await
            }
        }
    }

    /// Endpoint step for clusters this operator created.
    ///
    /// Returns a requeue when the pass has to wait on endpoint provisioning.
    async fn reconcile_endpoint(
        &self,
        cloud: &dyn CloudApi,
        latest: &TkeClusterConfig,
    ) -> Result<Option<Requeue>> {
        let name = latest.name_any();
        let cluster_id = &latest.spec.cluster_id;
        let extranet = latest.extranet_endpoint();

        match cloud
            .describe_cluster_endpoint_status(cluster_id, extranet)
            .await?
        {
            EndpointStatus::Created => {
                ensure_ca_secret(cloud, self.secrets(), latest).await?;
                Ok(None)
            }
            EndpointStatus::NotFound => {
                let instances = cloud.describe_cluster_instances(cluster_id).await?;
                if instances.iter().any(|i| i.state() == InstanceState::Running) {
                    info!(name = %name, cluster_id = %cluster_id, extranet, "Creating cluster endpoint");
                    if let Some(metrics) = self.metrics() {
                        metrics.record_mutation(ACTION_CREATE_CLUSTER_ENDPOINT);
                    }
                    cloud.create_cluster_endpoint(&latest.spec, extranet).await?;
                } else {
                    info!(name = %name, "Waiting for a running instance before creating endpoint");
                }
                Ok(Some(self.scheduler.wait_upstream()))
            }
            EndpointStatus::Creating => {
                info!(name = %name, "Waiting for cluster endpoint to finish creating");
                Ok(Some(self.scheduler.wait_upstream()))
            }
            EndpointStatus::Other(status) => {
                debug!(name = %name, status = %status, "Unrecognised endpoint status");
                Ok(None)
            }
        }
    }

    // ========================================================================
    // Phase writes
    // ========================================================================

    /// Persist the transition for `event`, if it moves the phase.
    async fn advance(&self, latest: &mut TkeClusterConfig, event: ClusterEvent) -> Result<Requeue> {
        match self.machine.transition(latest.phase(), event) {
            TransitionResult::Success {
                from,
                to,
                description,
                ..
            } => {
                if from != to {
                    *latest = self
                        .configs
                        .update_status(latest, &StatusPatch::new().phase(to))
                        .await?;
                    info!(
                        name = %latest.name_any(),
                        from = %from,
                        to = %to,
                        event = %event,
                        "{}",
                        description
                    );
                }
                Ok(self.scheduler.after_transition(event))
            }
            TransitionResult::InvalidTransition { current, event } => {
                warn!(
                    name = %latest.name_any(),
                    phase = %current,
                    event = %event,
                    "Ignoring event not valid in current phase"
                );
                Ok(Requeue::Done)
            }
        }
    }

    async fn converge(&self, latest: &mut TkeClusterConfig) -> Result<Requeue> {
        if latest.phase() == ClusterConfigPhase::Active {
            debug!(name = %latest.name_any(), "Cluster is active");
        }
        self.advance(latest, ClusterEvent::Converged).await
    }

    /// Move to Updating so the next pass waits on the changes just issued.
    ///
    /// Already Updating only needs another pass. Otherwise the phase is written
    /// with a fresh read, retrying on conflict.
    async fn enqueue_update(&self, latest: &mut TkeClusterConfig) -> Result<Requeue> {
        if latest.phase() == ClusterConfigPhase::Updating {
            return Ok(Requeue::Immediate);
        }

        let namespace = latest.namespace().unwrap_or_default();
        let name = latest.name_any();
        *latest = retry_on_conflict(self.settings.conflict_retries, || async {
            let fresh = self.configs.get(&namespace, &name).await?;
            self.configs
                .update_status(&fresh, &StatusPatch::new().phase(ClusterConfigPhase::Updating))
                .await
        })
        .await?;
        info!(name = %name, "Cluster is updating");
        Ok(Requeue::Immediate)
    }

    /// Write a spec patch, re-reading on conflict so created IDs are not lost.
    async fn write_spec(&self, latest: &TkeClusterConfig, patch: &SpecPatch) -> Result<TkeClusterConfig> {
        match self.configs.update_spec(latest, patch).await {
            Err(e) if e.is_conflict() => {
                let namespace = latest.namespace().unwrap_or_default();
                let name = latest.name_any();
                retry_on_conflict(self.settings.conflict_retries, || async {
                    let fresh = self.configs.get(&namespace, &name).await?;
                    self.configs.update_spec(&fresh, patch).await
                })
                .await
            }
            other => other,
        }
    }

    pub(crate) async fn connect(&self, config: &TkeClusterConfig) -> Result<Arc<dyn CloudApi>> {
        credentials::connect(
            self.secrets(),
            self.connector(),
            &config.spec.tke_credential_secret,
            &config.spec.region,
            &config.namespace().unwrap_or_default(),
            &self.settings.default_region,
        )
        .await
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Fields every managed cluster needs.
pub fn validate(config: &TkeClusterConfig) -> Result<()> {
    let name = config.name_any();
    if config.spec.region.is_empty() {
        return Err(Error::required_field("region", &name));
    }
    if config.spec.tke_credential_secret.is_empty() {
        return Err(Error::required_field("tkeCredentialSecret", &name));
    }
    Ok(())
}

/// Fields an imported cluster needs.
pub fn validate_import(config: &TkeClusterConfig) -> Result<()> {
    if config.spec.cluster_id.is_empty() {
        return Err(Error::required_field("clusterId", &config.name_any()));
    }
    validate(config)
}
