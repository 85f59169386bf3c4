//! Request bodies for the TKE and Auto Scaling APIs.
//!
//! Built from the resource spec types. Nested CVM and Auto Scaling parameters
//! that the API expects as JSON strings are serialized here.

use serde::Serialize;

use super::error::CloudError;
use super::parsing::{
    strings_to_labels, strings_to_tag_specifications, strings_to_tags, strings_to_taints,
};
use super::types::{Label, Tag, TagSpecification, Taint};
use crate::crd::{
    DataDisk, NodePoolDetail, RunInstancesForNode, SystemDisk, TkeClusterConfigSpec,
};

fn to_json_string<T: Serialize>(value: &T) -> Result<String, CloudError> {
    serde_json::to_string(value).map_err(|e| CloudError::InvalidRequest(e.to_string()))
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Disk {
    pub disk_type: String,
    pub disk_size: i64,
}

impl From<&SystemDisk> for Disk {
    fn from(d: &SystemDisk) -> Self {
        Self {
            disk_type: d.disk_type.clone(),
            disk_size: d.disk_size,
        }
    }
}

impl From<&DataDisk> for Disk {
    fn from(d: &DataDisk) -> Self {
        Self {
            disk_type: d.disk_type.clone(),
            disk_size: d.disk_size,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AutoUpgradeClusterLevel {
    pub is_auto_upgrade: bool,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InternetAccessibleParam {
    pub internet_charge_type: String,
    pub internet_max_bandwidth_out: i64,
    pub public_ip_assigned: bool,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LoginSettingsParam {
    pub key_ids: Vec<String>,
}

// ============================================================================
// CreateCluster
// ============================================================================

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct BasicSettingsParam {
    pub cluster_os: String,
    pub cluster_version: String,
    pub cluster_name: String,
    pub cluster_description: String,
    pub vpc_id: String,
    pub project_id: i64,
    pub tag_specification: Vec<TagSpecification>,
    pub os_customize_type: String,
    pub subnet_id: String,
    pub cluster_level: String,
    pub auto_upgrade_cluster_level: AutoUpgradeClusterLevel,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CidrSettingsParam {
    #[serde(rename = "ClusterCIDR")]
    pub cluster_cidr: String,
    #[serde(rename = "IgnoreClusterCIDRConflict")]
    pub ignore_cluster_cidr_conflict: bool,
    pub max_node_pod_num: i64,
    pub max_cluster_service_num: i64,
    #[serde(rename = "ServiceCIDR")]
    pub service_cidr: String,
    pub eni_subnet_ids: Vec<String>,
    pub claim_expired_seconds: i64,
    #[serde(rename = "IgnoreServiceCIDRConflict")]
    pub ignore_service_cidr_conflict: bool,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ExtraArgs {
    #[serde(rename = "KubeAPIServer")]
    pub kube_api_server: Vec<String>,
    pub kube_controller_manager: Vec<String>,
    pub kube_scheduler: Vec<String>,
    pub etcd: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AdvancedSettingsParam {
    #[serde(rename = "IPVS")]
    pub ipvs: bool,
    pub as_enabled: bool,
    pub container_runtime: String,
    pub node_name_type: String,
    pub extra_args: ExtraArgs,
    pub network_type: String,
    pub is_non_static_ip_mode: bool,
    pub deletion_protection: bool,
    pub kube_proxy_mode: String,
    pub audit_enabled: bool,
    pub audit_logset_id: String,
    pub audit_log_topic_id: String,
    pub vpc_cni_type: String,
    pub runtime_version: String,
    #[serde(rename = "EnableCustomizedPodCIDR")]
    pub enable_customized_pod_cidr: bool,
    pub base_pod_number: i64,
    pub cilium_mode: String,
    pub is_dual_stack: bool,
    #[serde(rename = "QGPUShareEnable")]
    pub qgpu_share_enable: bool,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RunInstancesForNodeParam {
    pub node_role: String,
    /// CVM `RunInstances` requests, each serialized as JSON.
    pub run_instances_para: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ExtensionAddonParam {
    pub addon_name: String,
    pub addon_param: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateClusterRequest {
    pub cluster_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_basic_settings: Option<BasicSettingsParam>,
    #[serde(rename = "ClusterCIDRSettings", skip_serializing_if = "Option::is_none")]
    pub cluster_cidr_settings: Option<CidrSettingsParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_advanced_settings: Option<AdvancedSettingsParam>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub run_instances_for_node: Vec<RunInstancesForNodeParam>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extension_addons: Vec<ExtensionAddonParam>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Placement<'a> {
    zone: &'a str,
    project_id: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct VirtualPrivateCloud<'a> {
    vpc_id: &'a str,
    subnet_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Enabled {
    enabled: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct EnhancedService {
    security_service: Enabled,
    monitor_service: Enabled,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RunInstancesPara<'a> {
    instance_charge_type: &'a str,
    placement: Placement<'a>,
    instance_count: i64,
    instance_type: &'a str,
    image_id: &'a str,
    system_disk: Disk,
    virtual_private_cloud: VirtualPrivateCloud<'a>,
    internet_accessible: InternetAccessibleParam,
    instance_name: &'a str,
    login_settings: LoginSettingsParam,
    enhanced_service: EnhancedService,
    user_data: &'a str,
}

fn run_instances_para(node: &RunInstancesForNode) -> Result<String, CloudError> {
    to_json_string(&RunInstancesPara {
        instance_charge_type: &node.instance_charge_type,
        placement: Placement {
            zone: &node.zone,
            project_id: node.project_id,
        },
        instance_count: node.instance_count,
        instance_type: &node.instance_type,
        image_id: &node.image_id,
        system_disk: Disk::from(&node.system_disk),
        virtual_private_cloud: VirtualPrivateCloud {
            vpc_id: &node.vpc_id,
            subnet_id: &node.subnet_id,
        },
        internet_accessible: InternetAccessibleParam {
            internet_charge_type: node.internet_charge_type.clone(),
            internet_max_bandwidth_out: node.internet_max_bandwidth_out,
            public_ip_assigned: node.public_ip_assigned,
        },
        instance_name: &node.instance_name,
        login_settings: LoginSettingsParam {
            key_ids: node.key_ids.clone(),
        },
        enhanced_service: EnhancedService {
            security_service: Enabled {
                enabled: node.security_service,
            },
            monitor_service: Enabled {
                enabled: node.monitor_service,
            },
        },
        user_data: &node.user_data,
    })
}

impl CreateClusterRequest {
    pub fn from_spec(spec: &TkeClusterConfigSpec) -> Result<Self, CloudError> {
        let basic = spec.cluster_basic_settings.clone().unwrap_or_default();
        let cidr = spec.cluster_cidr_settings.clone().unwrap_or_default();

        let cluster_basic_settings = BasicSettingsParam {
            cluster_os: basic.cluster_os,
            cluster_version: basic.cluster_version,
            cluster_name: basic.cluster_name,
            cluster_description: basic.cluster_description,
            vpc_id: basic.vpc_id,
            project_id: basic.project_id,
            tag_specification: strings_to_tag_specifications(&basic.tags),
            os_customize_type: cidr.os_customize_type.clone(),
            subnet_id: cidr.subnet_id.clone(),
            cluster_level: basic.cluster_level,
            auto_upgrade_cluster_level: AutoUpgradeClusterLevel {
                is_auto_upgrade: basic.is_auto_upgrade,
            },
        };

        let cluster_cidr_settings = spec.cluster_cidr_settings.as_ref().map(|c| CidrSettingsParam {
            cluster_cidr: c.cluster_cidr.clone(),
            ignore_cluster_cidr_conflict: c.ignore_cluster_cidr_conflict,
            max_node_pod_num: c.max_node_pod_num,
            max_cluster_service_num: c.max_cluster_service_num,
            service_cidr: c.service_cidr.clone(),
            eni_subnet_ids: c.eni_subnet_ids.clone(),
            claim_expired_seconds: c.claim_expired_seconds,
            ignore_service_cidr_conflict: c.ignore_service_cidr_conflict,
        });

        let cluster_advanced_settings =
            spec.cluster_advanced_settings
                .as_ref()
                .map(|a| AdvancedSettingsParam {
                    ipvs: a.ipvs,
                    as_enabled: a.as_enabled,
                    container_runtime: a.container_runtime.clone(),
                    node_name_type: a.node_name_type.clone(),
                    extra_args: ExtraArgs {
                        kube_api_server: a.kube_api_server.clone(),
                        kube_controller_manager: a.kube_controller_manager.clone(),
                        kube_scheduler: a.kube_scheduler.clone(),
                        etcd: a.etcd.clone(),
                    },
                    network_type: a.network_type.clone(),
                    is_non_static_ip_mode: a.is_non_static_ip_mode,
                    deletion_protection: a.deletion_protection,
                    kube_proxy_mode: a.kube_proxy_mode.clone(),
                    audit_enabled: a.audit_enabled,
                    audit_logset_id: a.audit_logset_id.clone(),
                    audit_log_topic_id: a.audit_log_topic_id.clone(),
                    vpc_cni_type: a.vpc_cni_type.clone(),
                    runtime_version: a.runtime_version.clone(),
                    enable_customized_pod_cidr: a.enable_customized_pod_cidr,
                    base_pod_number: a.base_pod_number,
                    cilium_mode: a.cilium_mode.clone(),
                    is_dual_stack: a.is_dual_stack,
                    qgpu_share_enable: a.qgpu_share_enable,
                });

        let run_instances_for_node = match &spec.run_instances_for_node {
            Some(node) => vec![RunInstancesForNodeParam {
                node_role: node.node_role.clone(),
                run_instances_para: vec![run_instances_para(node)?],
            }],
            None => Vec::new(),
        };

        Ok(Self {
            cluster_type: basic.cluster_type,
            cluster_basic_settings: Some(cluster_basic_settings),
            cluster_cidr_settings,
            cluster_advanced_settings,
            run_instances_for_node,
            extension_addons: spec
                .extension_addon
                .iter()
                .map(|a| ExtensionAddonParam {
                    addon_name: a.addon_name.clone(),
                    addon_param: a.addon_param.clone(),
                })
                .collect(),
        })
    }
}

// ============================================================================
// Node pools
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AutoScalingGroupParam<'a> {
    auto_scaling_group_name: &'a str,
    max_size: i64,
    min_size: i64,
    desired_capacity: i64,
    vpc_id: &'a str,
    subnet_ids: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LaunchConfigureParam<'a> {
    launch_configuration_name: &'a str,
    instance_type: &'a str,
    system_disk: Disk,
    internet_accessible: InternetAccessibleParam,
    data_disks: Vec<Disk>,
    login_settings: LoginSettingsParam,
    security_group_ids: &'a [String],
    instance_charge_type: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceAdvancedSettings {
    pub labels: Vec<Label>,
    pub taints: Vec<Taint>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateClusterNodePoolRequest {
    pub cluster_id: String,
    /// Auto Scaling `CreateAutoScalingGroup` parameters as JSON.
    pub auto_scaling_group_para: String,
    /// Auto Scaling `CreateLaunchConfiguration` parameters as JSON.
    pub launch_configure_para: String,
    pub instance_advanced_settings: InstanceAdvancedSettings,
    pub enable_autoscale: bool,
    pub name: String,
    pub node_pool_os: String,
    pub os_customize_type: String,
    pub tags: Vec<Tag>,
    pub deletion_protection: bool,
}

impl CreateClusterNodePoolRequest {
    pub fn from_pool(cluster_id: &str, pool: &NodePoolDetail) -> Result<Self, CloudError> {
        let group = &pool.auto_scaling_group_para;
        let launch = &pool.launch_configure_para;

        let auto_scaling_group_para = to_json_string(&AutoScalingGroupParam {
            auto_scaling_group_name: &group.auto_scaling_group_name,
            max_size: group.max_size,
            min_size: group.min_size,
            desired_capacity: group.desired_capacity,
            vpc_id: &group.vpc_id,
            subnet_ids: &group.subnet_ids,
        })?;

        let launch_configure_para = to_json_string(&LaunchConfigureParam {
            launch_configuration_name: &launch.launch_configuration_name,
            instance_type: &launch.instance_type,
            system_disk: Disk::from(&launch.system_disk),
            internet_accessible: InternetAccessibleParam {
                internet_charge_type: launch.internet_charge_type.clone(),
                internet_max_bandwidth_out: launch.internet_max_bandwidth_out,
                public_ip_assigned: launch.public_ip_assigned,
            },
            data_disks: launch.data_disks.iter().map(Disk::from).collect(),
            login_settings: LoginSettingsParam {
                key_ids: launch.key_ids.clone(),
            },
            security_group_ids: &launch.security_group_ids,
            instance_charge_type: &launch.instance_charge_type,
        })?;

        Ok(Self {
            cluster_id: cluster_id.to_string(),
            auto_scaling_group_para,
            launch_configure_para,
            instance_advanced_settings: InstanceAdvancedSettings {
                labels: strings_to_labels(&pool.labels),
                taints: strings_to_taints(&pool.taints),
            },
            enable_autoscale: pool.enable_autoscale,
            name: pool.name.clone(),
            node_pool_os: pool.node_pool_os.clone(),
            os_customize_type: pool.os_customize_type.clone(),
            tags: strings_to_tags(&pool.tags),
            deletion_protection: pool.deletion_protection,
        })
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteClusterNodePoolRequest {
    pub cluster_id: String,
    pub node_pool_ids: Vec<String>,
    pub keep_instance: bool,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyClusterNodePoolRequest {
    pub cluster_id: String,
    pub node_pool_id: String,
    pub name: String,
    pub max_nodes_num: i64,
    pub min_nodes_num: i64,
    pub labels: Vec<Label>,
    pub taints: Vec<Taint>,
    pub enable_autoscale: bool,
    pub os_name: String,
    pub os_customize_type: String,
    pub tags: Vec<Tag>,
    pub deletion_protection: bool,
}

impl ModifyClusterNodePoolRequest {
    pub fn from_pool(cluster_id: &str, pool: &NodePoolDetail) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            node_pool_id: pool.node_pool_id.clone(),
            name: pool.name.clone(),
            max_nodes_num: pool.auto_scaling_group_para.max_size,
            min_nodes_num: pool.auto_scaling_group_para.min_size,
            labels: strings_to_labels(&pool.labels),
            taints: strings_to_taints(&pool.taints),
            enable_autoscale: pool.enable_autoscale,
            os_name: pool.node_pool_os.clone(),
            os_customize_type: pool.os_customize_type.clone(),
            tags: strings_to_tags(&pool.tags),
            deletion_protection: pool.deletion_protection,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyNodePoolInstanceTypesRequest {
    pub cluster_id: String,
    pub node_pool_id: String,
    pub instance_types: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyNodePoolDesiredCapacityRequest {
    pub cluster_id: String,
    pub node_pool_id: String,
    pub desired_capacity: i64,
}

// ============================================================================
// Cluster attributes, endpoints and lookups
// ============================================================================

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyClusterAttributeRequest {
    pub cluster_id: String,
    pub project_id: i64,
    pub cluster_name: String,
    pub cluster_desc: String,
    pub cluster_level: String,
    pub auto_upgrade_cluster_level: AutoUpgradeClusterLevel,
    #[serde(rename = "QGPUShareEnable", skip_serializing_if = "Option::is_none")]
    pub qgpu_share_enable: Option<bool>,
}

impl ModifyClusterAttributeRequest {
    pub fn from_spec(spec: &TkeClusterConfigSpec) -> Self {
        let basic = spec.cluster_basic_settings.clone().unwrap_or_default();
        Self {
            cluster_id: spec.cluster_id.clone(),
            project_id: basic.project_id,
            cluster_name: basic.cluster_name,
            cluster_desc: basic.cluster_description,
            cluster_level: basic.cluster_level,
            auto_upgrade_cluster_level: AutoUpgradeClusterLevel {
                is_auto_upgrade: basic.is_auto_upgrade,
            },
            qgpu_share_enable: spec
                .cluster_advanced_settings
                .as_ref()
                .map(|a| a.qgpu_share_enable),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateClusterEndpointRequest {
    pub cluster_id: String,
    pub is_extranet: bool,
    pub subnet_id: String,
    pub domain: String,
    pub security_group: String,
    pub extensive_parameters: String,
}

impl CreateClusterEndpointRequest {
    pub fn from_spec(spec: &TkeClusterConfigSpec, extranet: bool) -> Self {
        let endpoint = spec.cluster_endpoint.clone().unwrap_or_default();
        Self {
            cluster_id: spec.cluster_id.clone(),
            is_extranet: extranet,
            subnet_id: endpoint.subnet_id,
            domain: endpoint.domain,
            security_group: endpoint.security_group,
            extensive_parameters: endpoint.extensive_parameters,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteClusterRequest {
    pub cluster_id: String,
    pub instance_delete_mode: String,
}

impl DeleteClusterRequest {
    pub fn terminate(cluster_id: &str) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            instance_delete_mode: "terminate".to_string(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterRequest {
    pub cluster_id: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeClustersRequest {
    pub cluster_ids: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterNetworkRequest {
    pub cluster_id: String,
    pub is_extranet: bool,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeAutoScalingGroupsRequest {
    pub auto_scaling_group_ids: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeLaunchConfigurationsRequest {
    pub launch_configuration_ids: Vec<String>,
}
