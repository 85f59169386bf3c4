//! TKEClusterConfig Custom Resource Definition.
//!
//! Declares the desired shape of a Tencent Kubernetes Engine cluster: basic,
//! network and advanced settings, node pools and the API endpoint. Field names
//! follow the `tke.pandaria.io/v1` wire format so existing manifests keep working.

use std::fmt;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// TKEClusterConfig drives a managed cluster toward the declared state.
///
/// Example:
/// ```yaml
/// apiVersion: tke.pandaria.io/v1
/// kind: TKEClusterConfig
/// metadata:
///   name: prod
/// spec:
///   tkeCredentialSecret: cattle-global-data:cc-abcde
///   region: ap-guangzhou
///   clusterBasicSettings:
///     clusterName: prod
///     clusterVersion: "1.30.0"
///     vpcId: vpc-123
///   nodePoolList:
///     - name: workers
///       autoScalingGroupPara:
///         minSize: 1
///         maxSize: 5
///         desiredCapacity: 3
///       launchConfigurePara:
///         instanceType: S5.MEDIUM4
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "tke.pandaria.io",
    version = "v1",
    kind = "TKEClusterConfig",
    root = "TkeClusterConfig",
    plural = "tkeclusterconfigs",
    shortname = "tkecc",
    status = "TkeClusterConfigStatus",
    namespaced,
    derive = "PartialEq",
    derive = "Default",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Cluster", "type":"string", "jsonPath":".spec.clusterId"}"#,
    printcolumn = r#"{"name":"Region", "type":"string", "jsonPath":".spec.region"}"#,
    printcolumn = r#"{"name":"Imported", "type":"boolean", "jsonPath":".spec.imported"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TkeClusterConfigSpec {
    /// Credential secret reference, `namespace:name` or a bare `name`.
    #[serde(default)]
    pub tke_credential_secret: String,

    /// Adopt an existing upstream cluster instead of creating one.
    #[serde(default)]
    pub imported: bool,

    #[serde(default)]
    pub region: String,

    /// Upstream cluster ID. Empty until the cluster is created.
    #[serde(default)]
    pub cluster_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_endpoint: Option<ClusterEndpoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_basic_settings: Option<ClusterBasicSettings>,

    #[serde(
        default,
        rename = "clusterCIDRSettings",
        skip_serializing_if = "Option::is_none"
    )]
    pub cluster_cidr_settings: Option<ClusterCidrSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_advanced_settings: Option<ClusterAdvancedSettings>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension_addon: Vec<ExtensionAddon>,

    /// Bare instances launched alongside cluster creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_instances_for_node: Option<RunInstancesForNode>,

    #[serde(default)]
    pub node_pool_list: Vec<NodePoolDetail>,
}

/// API server endpoint exposure.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEndpoint {
    /// Expose the endpoint on the public network.
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub extensive_parameters: String,
    #[serde(default)]
    pub security_group: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBasicSettings {
    #[serde(default)]
    pub cluster_type: String,
    #[serde(default)]
    pub cluster_os: String,
    #[serde(default)]
    pub cluster_version: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_description: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub project_id: i64,
    /// Cluster tags as `key=value` pairs.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cluster_level: String,
    #[serde(default)]
    pub is_auto_upgrade: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCidrSettings {
    #[serde(default, rename = "clusterCIDR")]
    pub cluster_cidr: String,
    #[serde(default, rename = "ignoreClusterCIDRConflict")]
    pub ignore_cluster_cidr_conflict: bool,
    #[serde(default)]
    pub max_node_pod_num: i64,
    #[serde(default)]
    pub max_cluster_service_num: i64,
    #[serde(default, rename = "serviceCIDR")]
    pub service_cidr: String,
    #[serde(default)]
    pub eni_subnet_ids: Vec<String>,
    #[serde(default)]
    pub claim_expired_seconds: i64,
    #[serde(default, rename = "ignoreServiceCIDRConflict")]
    pub ignore_service_cidr_conflict: bool,
    #[serde(default)]
    pub os_customize_type: String,
    #[serde(default)]
    pub subnet_id: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAdvancedSettings {
    #[serde(default)]
    pub ipvs: bool,
    #[serde(default)]
    pub as_enabled: bool,
    #[serde(default)]
    pub container_runtime: String,
    #[serde(default)]
    pub node_name_type: String,
    #[serde(default, rename = "kubeAPIServer")]
    pub kube_api_server: Vec<String>,
    #[serde(default)]
    pub kube_controller_manager: Vec<String>,
    #[serde(default)]
    pub kube_scheduler: Vec<String>,
    #[serde(default)]
    pub etcd: Vec<String>,
    #[serde(default)]
    pub network_type: String,
    #[serde(default)]
    pub is_non_static_ip_mode: bool,
    #[serde(default)]
    pub deletion_protection: bool,
    #[serde(default)]
    pub kube_proxy_mode: String,
    #[serde(default)]
    pub audit_enabled: bool,
    #[serde(default)]
    pub audit_logset_id: String,
    #[serde(default)]
    pub audit_log_topic_id: String,
    #[serde(default)]
    pub vpc_cni_type: String,
    #[serde(default)]
    pub runtime_version: String,
    #[serde(default, rename = "enableCustomizedPodCIDR")]
    pub enable_customized_pod_cidr: bool,
    #[serde(default)]
    pub base_pod_number: i64,
    #[serde(default)]
    pub cilium_mode: String,
    #[serde(default)]
    pub is_dual_stack: bool,
    /// GPU sharing for the cluster.
    #[serde(default)]
    pub qgpu_share_enable: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionAddon {
    pub addon_name: String,
    /// Raw JSON addon parameters, passed through unchanged.
    #[serde(default)]
    pub addon_param: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunInstancesForNode {
    #[serde(default)]
    pub node_role: String,
    #[serde(default)]
    pub instance_charge_type: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub instance_count: i64,
    #[serde(default)]
    pub project_id: i64,
    #[serde(default)]
    pub instance_type: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub system_disk: SystemDisk,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub internet_charge_type: String,
    #[serde(default)]
    pub internet_max_bandwidth_out: i64,
    #[serde(default)]
    pub public_ip_assigned: bool,
    #[serde(default)]
    pub instance_name: String,
    #[serde(default)]
    pub key_ids: Vec<String>,
    #[serde(default)]
    pub security_service: bool,
    #[serde(default)]
    pub monitor_service: bool,
    #[serde(default)]
    pub user_data: String,
}

/// One autoscaling node pool.
///
/// `node_pool_id` is empty until the pool exists upstream. Once set it never
/// changes and is the key used to match desired pools against observed ones.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolDetail {
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub node_pool_id: String,
    #[serde(default)]
    pub auto_scaling_group_para: AutoScalingGroupPara,
    #[serde(default)]
    pub launch_configure_para: LaunchConfigurePara,
    #[serde(default)]
    pub enable_autoscale: bool,
    #[serde(default)]
    pub name: String,
    /// Node labels as `key=value` pairs.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Node taints as `key=value` pairs.
    #[serde(default)]
    pub taints: Vec<String>,
    #[serde(default)]
    pub node_pool_os: String,
    #[serde(default)]
    pub os_customize_type: String,
    /// Pool tags as `key=value` pairs.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deletion_protection: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutoScalingGroupPara {
    #[serde(default)]
    pub auto_scaling_group_name: String,
    #[serde(default)]
    pub max_size: i64,
    #[serde(default)]
    pub min_size: i64,
    #[serde(default)]
    pub desired_capacity: i64,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfigurePara {
    #[serde(default)]
    pub launch_configuration_name: String,
    #[serde(default)]
    pub instance_type: String,
    #[serde(default)]
    pub system_disk: SystemDisk,
    #[serde(default)]
    pub internet_charge_type: String,
    #[serde(default)]
    pub internet_max_bandwidth_out: i64,
    #[serde(default)]
    pub public_ip_assigned: bool,
    #[serde(default)]
    pub data_disks: Vec<DataDisk>,
    #[serde(default)]
    pub key_ids: Vec<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    #[serde(default)]
    pub instance_charge_type: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemDisk {
    #[serde(default)]
    pub disk_type: String,
    #[serde(default)]
    pub disk_size: i64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataDisk {
    #[serde(default)]
    pub disk_type: String,
    #[serde(default)]
    pub disk_size: i64,
}

/// Status of a TKEClusterConfig.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TkeClusterConfigStatus {
    #[serde(default)]
    pub phase: ClusterConfigPhase,
    /// Last reconciliation error. Empty when healthy.
    #[serde(default)]
    pub failure_message: String,
}

/// Lifecycle phase of a TKEClusterConfig.
///
/// Serialized as `""`, `"importing"`, `"creating"`, `"active"` and `"updating"`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum ClusterConfigPhase {
    /// Nothing has been requested upstream yet.
    #[default]
    #[serde(rename = "")]
    NotCreated,
    /// Adopting an existing upstream cluster.
    #[serde(rename = "importing")]
    Importing,
    /// Waiting for the upstream cluster to come up.
    #[serde(rename = "creating")]
    Creating,
    /// Upstream matches the declared spec.
    #[serde(rename = "active")]
    Active,
    /// Drift is being applied or an upstream operation is in flight.
    #[serde(rename = "updating")]
    Updating,
}

impl ClusterConfigPhase {
    /// All phases, in lifecycle order.
    pub const ALL: [ClusterConfigPhase; 5] = [
        ClusterConfigPhase::NotCreated,
        ClusterConfigPhase::Importing,
        ClusterConfigPhase::Creating,
        ClusterConfigPhase::Active,
        ClusterConfigPhase::Updating,
    ];

    /// The value stored in `status.phase`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ClusterConfigPhase::NotCreated => "",
            ClusterConfigPhase::Importing => "importing",
            ClusterConfigPhase::Creating => "creating",
            ClusterConfigPhase::Active => "active",
            ClusterConfigPhase::Updating => "updating",
        }
    }
}

impl fmt::Display for ClusterConfigPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterConfigPhase::NotCreated => write!(f, "NotCreated"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

impl TkeClusterConfig {
    /// Current phase, `NotCreated` when no status has been written.
    pub fn phase(&self) -> ClusterConfigPhase {
        self.status.as_ref().map(|s| s.phase).unwrap_or_default()
    }

    /// Stored failure message, empty when none.
    pub fn failure_message(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.failure_message.as_str())
            .unwrap_or("")
    }

    /// Whether the API endpoint is requested on the public network.
    pub fn extranet_endpoint(&self) -> bool {
        self.spec
            .cluster_endpoint
            .as_ref()
            .is_some_and(|e| e.enable)
    }
}
