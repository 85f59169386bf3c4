//! Rebuild a spec-shaped view of the upstream cluster.
//!
//! The observed spec has the same layout as `TKEClusterConfigSpec` so it can be
//! compared field by field with the desired one, or adopted wholesale when a
//! cluster is imported. It is rebuilt on every pass and never persisted on its own.

use tracing::warn;

use crate::client::parsing::{
    data_disks_from_remote, labels_to_strings, sorted_ids, system_disk_from_remote,
    tag_specifications_to_strings, tags_to_strings, taints_to_strings,
};
use crate::client::{CloudApi, CloudError, RemoteCluster, RemoteNodePool};
use crate::crd::{
    AutoScalingGroupPara, ClusterAdvancedSettings, ClusterBasicSettings, ClusterCidrSettings,
    LaunchConfigurePara, NodePoolDetail, TkeClusterConfigSpec,
};

/// Build the observed spec from a cluster description and its node pools.
///
/// Each pool is enriched with its scaling group and launch configuration. A
/// pool whose details cannot be fetched is left out with a warning. A required
/// field missing from any upstream object fails the whole call.
pub async fn observed_spec(
    cloud: &dyn CloudApi,
    cluster: &RemoteCluster,
    node_pools: &[RemoteNodePool],
) -> Result<TkeClusterConfigSpec, CloudError> {
    let summary = cluster.decode()?;
    let network = cluster.cluster_network_settings.clone().unwrap_or_default();

    let basic = ClusterBasicSettings {
        cluster_type: cluster.cluster_type.clone().unwrap_or_default(),
        cluster_os: cluster.cluster_os.clone().unwrap_or_default(),
        cluster_version: cluster.cluster_version.clone().unwrap_or_default(),
        cluster_name: cluster.cluster_name.clone().unwrap_or_default(),
        cluster_description: cluster.cluster_description.clone().unwrap_or_default(),
        vpc_id: network.vpc_id.clone().unwrap_or_default(),
        project_id: cluster.project_id.unwrap_or_default(),
        tags: tag_specifications_to_strings(cluster.tag_specification.as_deref().unwrap_or_default()),
        cluster_level: cluster.cluster_level.clone().unwrap_or_default(),
        is_auto_upgrade: cluster.auto_upgrade_cluster_level.unwrap_or_default(),
    };

    let cidr = ClusterCidrSettings {
        cluster_cidr: network.cluster_cidr.clone().unwrap_or_default(),
        ignore_cluster_cidr_conflict: network.ignore_cluster_cidr_conflict.unwrap_or_default(),
        max_node_pod_num: network.max_node_pod_num.unwrap_or_default(),
        max_cluster_service_num: network.max_cluster_service_num.unwrap_or_default(),
        service_cidr: network.service_cidr.clone().unwrap_or_default(),
        eni_subnet_ids: sorted_ids(network.subnets.as_deref()),
        ignore_service_cidr_conflict: network.ignore_service_cidr_conflict.unwrap_or_default(),
        os_customize_type: cluster.os_customize_type.clone().unwrap_or_default(),
        ..Default::default()
    };

    let advanced = ClusterAdvancedSettings {
        ipvs: network.ipvs.unwrap_or_default(),
        container_runtime: cluster.container_runtime.clone().unwrap_or_default(),
        runtime_version: cluster.runtime_version.clone().unwrap_or_default(),
        qgpu_share_enable: cluster.qgpu_share_enable.unwrap_or_default(),
        ..Default::default()
    };

    let mut node_pool_list = Vec::with_capacity(node_pools.len());
    for pool in node_pools {
        if let Some(detail) = observed_pool(cloud, &summary.cluster_id, pool).await? {
            node_pool_list.push(detail);
        }
    }

    Ok(TkeClusterConfigSpec {
        cluster_id: summary.cluster_id,
        cluster_basic_settings: Some(basic),
        cluster_cidr_settings: Some(cidr),
        cluster_advanced_settings: Some(advanced),
        node_pool_list,
        ..Default::default()
    })
}

async fn observed_pool(
    cloud: &dyn CloudApi,
    cluster_id: &str,
    pool: &RemoteNodePool,
) -> Result<Option<NodePoolDetail>, CloudError> {
    let summary = pool.decode()?;

    let group = match cloud
        .describe_auto_scaling_group(&summary.autoscaling_group_id)
        .await
    {
        Ok(group) => group,
        Err(e) => {
            warn!(
                node_pool_id = %summary.node_pool_id,
                group_id = %summary.autoscaling_group_id,
                error = %e,
                "Skipping node pool, failed to get auto scaling group"
            );
            return Ok(None);
        }
    };

    let launch = match cloud
        .describe_launch_configuration(&summary.launch_configuration_id)
        .await
    {
        Ok(launch) => launch,
        Err(e) => {
            warn!(
                node_pool_id = %summary.node_pool_id,
                launch_configuration_id = %summary.launch_configuration_id,
                error = %e,
                "Skipping node pool, failed to get launch configuration"
            );
            return Ok(None);
        }
    };

    let sizes = group.decode()?;
    let instance_type = launch.decode()?;
    let internet = launch.internet_accessible.clone().unwrap_or_default();

    Ok(Some(NodePoolDetail {
        cluster_id: cluster_id.to_string(),
        node_pool_id: summary.node_pool_id,
        auto_scaling_group_para: AutoScalingGroupPara {
            auto_scaling_group_name: group.auto_scaling_group_name.clone().unwrap_or_default(),
            max_size: sizes.max_size,
            min_size: sizes.min_size,
            desired_capacity: sizes.desired_capacity,
            vpc_id: group.vpc_id.clone().unwrap_or_default(),
            subnet_ids: sorted_ids(group.subnet_id_set.as_deref()),
        },
        launch_configure_para: LaunchConfigurePara {
            launch_configuration_name: launch.launch_configuration_name.clone().unwrap_or_default(),
            instance_type,
            system_disk: system_disk_from_remote(launch.system_disk.as_ref()),
            internet_charge_type: internet.internet_charge_type.unwrap_or_default(),
            internet_max_bandwidth_out: internet.internet_max_bandwidth_out.unwrap_or_default(),
            public_ip_assigned: internet.public_ip_assigned.unwrap_or_default(),
            data_disks: data_disks_from_remote(launch.data_disks.as_deref()),
            key_ids: sorted_ids(
                launch
                    .login_settings
                    .as_ref()
                    .and_then(|l| l.key_ids.as_deref()),
            ),
            security_group_ids: sorted_ids(launch.security_group_ids.as_deref()),
            instance_charge_type: launch.instance_charge_type.clone().unwrap_or_default(),
        },
        enable_autoscale: false,
        name: pool.name.clone().unwrap_or_default(),
        labels: labels_to_strings(pool.labels.as_deref().unwrap_or_default()),
        taints: taints_to_strings(pool.taints.as_deref().unwrap_or_default()),
        node_pool_os: pool.node_pool_os.clone().unwrap_or_default(),
        os_customize_type: pool.os_customize_type.clone().unwrap_or_default(),
        tags: tags_to_strings(pool.tags.as_deref().unwrap_or_default()),
        deletion_protection: pool.deletion_protection.unwrap_or_default(),
    }))
}
