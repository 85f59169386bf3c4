//! Upstream TKE and Auto Scaling types.
//!
//! The wire structs mirror the cloud API, where nearly every field is
//! nullable. Each has a `decode` step producing a typed view. A field the
//! reconciler cannot work without fails with `CloudError::MissingField`
//! instead of being defaulted.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::CloudError;

/// Upstream cluster status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClusterStatus {
    Running,
    Creating,
    Idling,
    Abnormal,
    /// Any status this operator does not act on, kept verbatim.
    Other(String),
}

impl ClusterStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "Running" => ClusterStatus::Running,
            "Creating" => ClusterStatus::Creating,
            "Idling" => ClusterStatus::Idling,
            "Abnormal" => ClusterStatus::Abnormal,
            other => ClusterStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterStatus::Running => write!(f, "Running"),
            ClusterStatus::Creating => write!(f, "Creating"),
            ClusterStatus::Idling => write!(f, "Idling"),
            ClusterStatus::Abnormal => write!(f, "Abnormal"),
            ClusterStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Life state of an upstream node pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodePoolLifeState {
    Creating,
    Normal,
    Updating,
    Deleting,
    Deleted,
    Other(String),
}

impl NodePoolLifeState {
    pub fn parse(value: &str) -> Self {
        match value {
            "creating" => NodePoolLifeState::Creating,
            "normal" => NodePoolLifeState::Normal,
            "updating" => NodePoolLifeState::Updating,
            "deleting" => NodePoolLifeState::Deleting,
            "deleted" => NodePoolLifeState::Deleted,
            other => NodePoolLifeState::Other(other.to_string()),
        }
    }

    /// Whether an upstream operation on the pool is still running.
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            NodePoolLifeState::Creating | NodePoolLifeState::Updating | NodePoolLifeState::Deleting
        )
    }
}

impl fmt::Display for NodePoolLifeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodePoolLifeState::Creating => write!(f, "creating"),
            NodePoolLifeState::Normal => write!(f, "normal"),
            NodePoolLifeState::Updating => write!(f, "updating"),
            NodePoolLifeState::Deleting => write!(f, "deleting"),
            NodePoolLifeState::Deleted => write!(f, "deleted"),
            NodePoolLifeState::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Status of the cluster API endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndpointStatus {
    Created,
    Creating,
    NotFound,
    Other(String),
}

impl EndpointStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "Created" => EndpointStatus::Created,
            "Creating" => EndpointStatus::Creating,
            "NotFound" => EndpointStatus::NotFound,
            other => EndpointStatus::Other(other.to_string()),
        }
    }
}

/// State of a cluster instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstanceState {
    Running,
    Initializing,
    Failed,
    Other(String),
}

impl InstanceState {
    pub fn parse(value: &str) -> Self {
        match value {
            "running" => InstanceState::Running,
            "initializing" => InstanceState::Initializing,
            "failed" => InstanceState::Failed,
            other => InstanceState::Other(other.to_string()),
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: Option<String>,
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TagSpecification {
    pub resource_type: Option<String>,
    pub tags: Option<Vec<Tag>>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Label {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Taint {
    pub key: Option<String>,
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterNetworkSettings {
    #[serde(rename = "ClusterCIDR")]
    pub cluster_cidr: Option<String>,
    #[serde(rename = "IgnoreClusterCIDRConflict")]
    pub ignore_cluster_cidr_conflict: Option<bool>,
    pub max_node_pod_num: Option<i64>,
    pub max_cluster_service_num: Option<i64>,
    pub ipvs: Option<bool>,
    pub vpc_id: Option<String>,
    pub cni: Option<bool>,
    pub kube_proxy_mode: Option<String>,
    #[serde(rename = "ServiceCIDR")]
    pub service_cidr: Option<String>,
    pub subnets: Option<Vec<String>>,
    #[serde(rename = "IgnoreServiceCIDRConflict")]
    pub ignore_service_cidr_conflict: Option<bool>,
    pub is_dual_stack: Option<bool>,
    pub cilium_mode: Option<String>,
}

/// A cluster as returned by `DescribeClusters`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteCluster {
    pub cluster_id: Option<String>,
    pub cluster_name: Option<String>,
    pub cluster_description: Option<String>,
    pub cluster_version: Option<String>,
    pub cluster_os: Option<String>,
    pub cluster_type: Option<String>,
    pub cluster_network_settings: Option<ClusterNetworkSettings>,
    pub project_id: Option<i64>,
    pub tag_specification: Option<Vec<TagSpecification>>,
    pub cluster_status: Option<String>,
    pub os_customize_type: Option<String>,
    pub container_runtime: Option<String>,
    pub deletion_protection: Option<bool>,
    pub cluster_level: Option<String>,
    pub auto_upgrade_cluster_level: Option<bool>,
    #[serde(rename = "QGPUShareEnable")]
    pub qgpu_share_enable: Option<bool>,
    pub runtime_version: Option<String>,
}

/// A node pool as returned by `DescribeClusterNodePools`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteNodePool {
    pub node_pool_id: Option<String>,
    pub name: Option<String>,
    pub cluster_instance_id: Option<String>,
    pub life_state: Option<String>,
    pub launch_configuration_id: Option<String>,
    pub autoscaling_group_id: Option<String>,
    pub labels: Option<Vec<Label>>,
    pub taints: Option<Vec<Taint>>,
    pub node_pool_os: Option<String>,
    pub os_customize_type: Option<String>,
    pub tags: Option<Vec<Tag>>,
    pub deletion_protection: Option<bool>,
    pub max_nodes_num: Option<i64>,
    pub min_nodes_num: Option<i64>,
    pub desired_nodes_num: Option<i64>,
}

/// An Auto Scaling group as returned by `DescribeAutoScalingGroups`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AutoScalingGroup {
    pub auto_scaling_group_id: Option<String>,
    pub auto_scaling_group_name: Option<String>,
    pub max_size: Option<i64>,
    pub min_size: Option<i64>,
    pub desired_capacity: Option<i64>,
    pub vpc_id: Option<String>,
    pub subnet_id_set: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteDisk {
    pub disk_type: Option<String>,
    pub disk_size: Option<i64>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InternetAccessible {
    pub internet_charge_type: Option<String>,
    pub internet_max_bandwidth_out: Option<i64>,
    pub public_ip_assigned: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LoginSettings {
    pub key_ids: Option<Vec<String>>,
}

/// A launch configuration as returned by `DescribeLaunchConfigurations`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LaunchConfiguration {
    pub launch_configuration_id: Option<String>,
    pub launch_configuration_name: Option<String>,
    pub instance_type: Option<String>,
    pub system_disk: Option<RemoteDisk>,
    pub internet_accessible: Option<InternetAccessible>,
    pub data_disks: Option<Vec<RemoteDisk>>,
    pub login_settings: Option<LoginSettings>,
    pub security_group_ids: Option<Vec<String>>,
    pub instance_charge_type: Option<String>,
}

/// A cluster instance as returned by `DescribeClusterInstances`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteInstance {
    pub instance_id: Option<String>,
    pub instance_role: Option<String>,
    pub instance_state: Option<String>,
    pub node_pool_id: Option<String>,
}

// ============================================================================
// Decoded views
// ============================================================================

fn required<T: Clone>(
    value: &Option<T>,
    resource: &'static str,
    field: &'static str,
) -> Result<T, CloudError> {
    value
        .clone()
        .ok_or(CloudError::MissingField { resource, field })
}

/// Identity and status of an upstream cluster.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterSummary {
    pub cluster_id: String,
    pub status: ClusterStatus,
}

impl RemoteCluster {
    pub fn decode(&self) -> Result<ClusterSummary, CloudError> {
        Ok(ClusterSummary {
            cluster_id: required(&self.cluster_id, "Cluster", "ClusterId")?,
            status: ClusterStatus::parse(&required(
                &self.cluster_status,
                "Cluster",
                "ClusterStatus",
            )?),
        })
    }
}

/// The parts of a node pool the reconciler keys on.
#[derive(Clone, Debug, PartialEq)]
pub struct NodePoolSummary {
    pub node_pool_id: String,
    pub life_state: NodePoolLifeState,
    pub autoscaling_group_id: String,
    pub launch_configuration_id: String,
}

impl RemoteNodePool {
    pub fn decode(&self) -> Result<NodePoolSummary, CloudError> {
        Ok(NodePoolSummary {
            node_pool_id: required(&self.node_pool_id, "NodePool", "NodePoolId")?,
            life_state: NodePoolLifeState::parse(&required(
                &self.life_state,
                "NodePool",
                "LifeState",
            )?),
            autoscaling_group_id: required(
                &self.autoscaling_group_id,
                "NodePool",
                "AutoscalingGroupId",
            )?,
            launch_configuration_id: required(
                &self.launch_configuration_id,
                "NodePool",
                "LaunchConfigurationId",
            )?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupSizes {
    pub min_size: i64,
    pub max_size: i64,
    pub desired_capacity: i64,
}

impl AutoScalingGroup {
    pub fn decode(&self) -> Result<GroupSizes, CloudError> {
        Ok(GroupSizes {
            min_size: required(&self.min_size, "AutoScalingGroup", "MinSize")?,
            max_size: required(&self.max_size, "AutoScalingGroup", "MaxSize")?,
            desired_capacity: required(
                &self.desired_capacity,
                "AutoScalingGroup",
                "DesiredCapacity",
            )?,
        })
    }
}

impl LaunchConfiguration {
    /// Instance type, the only field pool drift cannot do without.
    pub fn decode(&self) -> Result<String, CloudError> {
        required(&self.instance_type, "LaunchConfiguration", "InstanceType")
    }
}

impl RemoteInstance {
    pub fn state(&self) -> InstanceState {
        InstanceState::parse(self.instance_state.as_deref().unwrap_or_default())
    }
}
