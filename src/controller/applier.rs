//! Issues the upstream calls chosen by the drift plan.
//!
//! Calls run one at a time and the first failure stops the pass. Nothing is
//! rolled back: the next pass recomputes the plan from whatever state the
//! upstream ended up in.

use tracing::info;

use crate::client::{CloudApi, CloudError};
use crate::controller::drift::NodePoolChanges;
use crate::crd::{NodePoolDetail, TkeClusterConfigSpec};
use crate::health::Metrics;

pub const ACTION_MODIFY_CLUSTER_ATTRIBUTE: &str = "ModifyClusterAttribute";
pub const ACTION_CREATE_NODE_POOL: &str = "CreateClusterNodePool";
pub const ACTION_DELETE_NODE_POOL: &str = "DeleteClusterNodePool";
pub const ACTION_MODIFY_INSTANCE_TYPES: &str = "ModifyNodePoolInstanceTypes";
pub const ACTION_MODIFY_NODE_POOL: &str = "ModifyClusterNodePool";
pub const ACTION_MODIFY_DESIRED_CAPACITY: &str = "ModifyNodePoolDesiredCapacityAboutAsg";

/// Pools created before provisioning stopped.
#[derive(Debug, Default)]
pub struct Provisioned {
    /// `(index in nodePoolList, new node pool ID)`
    pub created: Vec<(usize, String)>,
    /// The failure that stopped provisioning, if any
    pub error: Option<CloudError>,
}

/// Applies drift against one upstream cluster.
pub struct DriftApplier<'a> {
    cloud: &'a dyn CloudApi,
    cluster_id: &'a str,
    keep_instances: bool,
    metrics: Option<&'a Metrics>,
}

impl<'a> DriftApplier<'a> {
    pub fn new(cloud: &'a dyn CloudApi, cluster_id: &'a str, keep_instances: bool) -> Self {
        Self {
            cloud,
            cluster_id,
            keep_instances,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Option<&'a Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    fn record(&self, action: &str) {
        if let Some(metrics) = self.metrics {
            metrics.record_mutation(action);
        }
    }

    pub async fn modify_cluster_attributes(
        &self,
        spec: &TkeClusterConfigSpec,
    ) -> Result<(), CloudError> {
        info!(cluster_id = %self.cluster_id, "Modifying cluster attributes");
        self.record(ACTION_MODIFY_CLUSTER_ATTRIBUTE);
        self.cloud.modify_cluster_attribute(spec).await
    }

    /// Create the pools at `indices`, stopping at the first failure.
    pub async fn provision(&self, pools: &[NodePoolDetail], indices: &[usize]) -> Provisioned {
        let mut provisioned = Provisioned::default();
        for &index in indices {
            let Some(pool) = pools.get(index) else {
                continue;
            };
            info!(cluster_id = %self.cluster_id, pool = %pool.name, "Creating node pool");
            self.record(ACTION_CREATE_NODE_POOL);
            match self.cloud.create_node_pool(self.cluster_id, pool).await {
                Ok(node_pool_id) => {
                    info!(cluster_id = %self.cluster_id, node_pool_id = %node_pool_id, "Node pool created");
                    provisioned.created.push((index, node_pool_id));
                }
                Err(e) => {
                    provisioned.error = Some(e);
                    break;
                }
            }
        }
        provisioned
    }

    /// Delete, retype, modify and resize pools, in that order.
    ///
    /// Returns the number of calls issued.
    pub async fn apply_pool_changes(&self, changes: &NodePoolChanges<'_>) -> Result<usize, CloudError> {
        let mut calls = 0;

        if !changes.delete.is_empty() {
            info!(
                cluster_id = %self.cluster_id,
                node_pool_ids = ?changes.delete,
                keep_instances = self.keep_instances,
                "Deleting node pools"
            );
            self.record(ACTION_DELETE_NODE_POOL);
            self.cloud
                .delete_node_pools(self.cluster_id, &changes.delete, self.keep_instances)
                .await?;
            calls += 1;
        }

        for pool in &changes.instance_types {
            info!(
                cluster_id = %self.cluster_id,
                node_pool_id = %pool.node_pool_id,
                instance_type = %pool.launch_configure_para.instance_type,
                "Changing node pool instance type"
            );
            self.record(ACTION_MODIFY_INSTANCE_TYPES);
            self.cloud
                .modify_node_pool_instance_types(
                    self.cluster_id,
                    &pool.node_pool_id,
                    &pool.launch_configure_para.instance_type,
                )
                .await?;
            calls += 1;
        }

        for pool in &changes.attributes {
            info!(cluster_id = %self.cluster_id, node_pool_id = %pool.node_pool_id, "Modifying node pool");
            self.record(ACTION_MODIFY_NODE_POOL);
            self.cloud.modify_node_pool(self.cluster_id, pool).await?;
            calls += 1;
        }

        for pool in &changes.desired_capacity {
            info!(
                cluster_id = %self.cluster_id,
                node_pool_id = %pool.node_pool_id,
                desired_capacity = pool.auto_scaling_group_para.desired_capacity,
                "Changing node pool desired capacity"
            );
            self.record(ACTION_MODIFY_DESIRED_CAPACITY);
            self.cloud
                .modify_node_pool_desired_capacity(
                    self.cluster_id,
                    &pool.node_pool_id,
                    pool.auto_scaling_group_para.desired_capacity,
                )
                .await?;
            calls += 1;
        }

        Ok(calls)
    }
}
