//! Desired-versus-observed comparison.
//!
//! [`plan`] is pure: it inspects the desired spec and the observed spec and
//! names the single category of change to apply this pass. Categories are
//! checked in priority order and the first one that needs work wins; the rest
//! wait for a later pass, which re-derives the plan from fresh upstream state.

use std::collections::HashMap;

use crate::client::parsing::same_pairs;
use crate::crd::{NodePoolDetail, TkeClusterConfigSpec};

/// What a pass should do about drift.
#[derive(Debug, PartialEq)]
pub enum DriftPlan<'a> {
    /// Project, name, description, level, auto-upgrade or GPU sharing differ
    ClusterAttributes,
    /// No pools declared and no cluster drift
    NoNodePools,
    /// Indices of declared pools that do not exist upstream yet
    ProvisionNodePools(Vec<usize>),
    /// Existing pools need deleting or modifying
    NodePoolChanges(NodePoolChanges<'a>),
    /// Cluster and pools match
    Converged,
}

/// Per-pool calls for one pass, in the order they are issued.
#[derive(Debug, Default, PartialEq)]
pub struct NodePoolChanges<'a> {
    /// Upstream pools absent from the desired list, deleted in one batch
    pub delete: Vec<String>,
    pub instance_types: Vec<&'a NodePoolDetail>,
    pub attributes: Vec<&'a NodePoolDetail>,
    pub desired_capacity: Vec<&'a NodePoolDetail>,
}

impl NodePoolChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty()
            && self.instance_types.is_empty()
            && self.attributes.is_empty()
            && self.desired_capacity.is_empty()
    }

    /// Number of upstream calls needed to apply these changes.
    pub fn call_count(&self) -> usize {
        usize::from(!self.delete.is_empty())
            + self.instance_types.len()
            + self.attributes.len()
            + self.desired_capacity.len()
    }
}

impl DriftPlan<'_> {
    /// Whether applying the plan issues upstream mutations.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            DriftPlan::ClusterAttributes
                | DriftPlan::ProvisionNodePools(_)
                | DriftPlan::NodePoolChanges(_)
        )
    }
}

/// Choose the drift category to act on.
pub fn plan<'a>(desired: &'a TkeClusterConfigSpec, observed: &TkeClusterConfigSpec) -> DriftPlan<'a> {
    if cluster_attributes_differ(desired, observed) {
        return DriftPlan::ClusterAttributes;
    }

    if desired.node_pool_list.is_empty() {
        return DriftPlan::NoNodePools;
    }

    let unprovisioned: Vec<usize> = desired
        .node_pool_list
        .iter()
        .enumerate()
        .filter(|(_, np)| np.node_pool_id.is_empty())
        .map(|(index, _)| index)
        .collect();
    if !unprovisioned.is_empty() {
        return DriftPlan::ProvisionNodePools(unprovisioned);
    }

    let changes = node_pool_changes(desired, observed);
    if changes.is_empty() {
        DriftPlan::Converged
    } else {
        DriftPlan::NodePoolChanges(changes)
    }
}

/// Cluster-level attributes that ModifyClusterAttribute can change.
pub fn cluster_attributes_differ(desired: &TkeClusterConfigSpec, observed: &TkeClusterConfigSpec) -> bool {
    let basic_differs = desired.cluster_basic_settings.as_ref().is_some_and(|want| {
        let have = observed.cluster_basic_settings.clone().unwrap_or_default();
        want.project_id != have.project_id
            || want.cluster_name != have.cluster_name
            || want.cluster_description != have.cluster_description
            || want.cluster_level != have.cluster_level
            || want.is_auto_upgrade != have.is_auto_upgrade
    });

    let gpu_differs = desired.cluster_advanced_settings.as_ref().is_some_and(|want| {
        let have = observed
            .cluster_advanced_settings
            .as_ref()
            .is_some_and(|a| a.qgpu_share_enable);
        want.qgpu_share_enable != have
    });

    basic_differs || gpu_differs
}

/// The spec sent with ModifyClusterAttribute.
///
/// The call replaces every basic attribute at once, so settings the desired
/// spec leaves out are carried over from the observed cluster.
pub fn attribute_target(
    desired: &TkeClusterConfigSpec,
    observed: &TkeClusterConfigSpec,
) -> TkeClusterConfigSpec {
    let mut target = desired.clone();
    if target.cluster_basic_settings.is_none() {
        target.cluster_basic_settings = observed.cluster_basic_settings.clone();
    }
    target
}

fn node_pool_changes<'a>(
    desired: &'a TkeClusterConfigSpec,
    observed: &TkeClusterConfigSpec,
) -> NodePoolChanges<'a> {
    let wanted: HashMap<&str, &'a NodePoolDetail> = desired
        .node_pool_list
        .iter()
        .map(|np| (np.node_pool_id.as_str(), np))
        .collect();

    let mut changes = NodePoolChanges::default();
    for have in &observed.node_pool_list {
        let Some(want) = wanted.get(have.node_pool_id.as_str()).copied() else {
            changes.delete.push(have.node_pool_id.clone());
            continue;
        };

        if want.launch_configure_para.instance_type != have.launch_configure_para.instance_type {
            changes.instance_types.push(want);
        }
        if pool_attributes_differ(want, have) {
            changes.attributes.push(want);
        }
        if want.auto_scaling_group_para.desired_capacity
            != have.auto_scaling_group_para.desired_capacity
        {
            changes.desired_capacity.push(want);
        }
    }
    changes
}

/// Attributes applied by ModifyClusterNodePool.
pub fn pool_attributes_differ(want: &NodePoolDetail, have: &NodePoolDetail) -> bool {
    want.name != have.name
        || want.auto_scaling_group_para.max_size != have.auto_scaling_group_para.max_size
        || want.auto_scaling_group_para.min_size != have.auto_scaling_group_para.min_size
        || !same_pairs(&want.labels, &have.labels)
        || !same_pairs(&want.taints, &have.taints)
        || want.node_pool_os != have.node_pool_os
        || want.os_customize_type != have.os_customize_type
        || !same_pairs(&want.tags, &have.tags)
        || want.deletion_protection != have.deletion_protection
}
