//! The cloud API capability consumed by the reconciler.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::error::CloudError;
use super::types::{
    AutoScalingGroup, EndpointStatus, LaunchConfiguration, RemoteCluster, RemoteInstance,
    RemoteNodePool,
};
use crate::crd::{NodePoolDetail, TkeClusterConfigSpec};

/// Access key pair resolved from the credential secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_key_id: String,
    pub access_key_secret: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .finish()
    }
}

/// Operations against one region's cluster service, authenticated with one credential.
///
/// Calls are issued one at a time by the reconciler. Implementations own
/// transport retries; the reconciler only decides whether to continue.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn describe_cluster(&self, cluster_id: &str) -> Result<RemoteCluster, CloudError>;

    async fn describe_cluster_node_pools(
        &self,
        cluster_id: &str,
    ) -> Result<Vec<RemoteNodePool>, CloudError>;

    async fn describe_cluster_instances(
        &self,
        cluster_id: &str,
    ) -> Result<Vec<RemoteInstance>, CloudError>;

    async fn describe_cluster_endpoint_status(
        &self,
        cluster_id: &str,
        extranet: bool,
    ) -> Result<EndpointStatus, CloudError>;

    /// Raw kubeconfig YAML for the cluster.
    async fn describe_cluster_kubeconfig(
        &self,
        cluster_id: &str,
        extranet: bool,
    ) -> Result<String, CloudError>;

    /// Create a cluster and return its ID.
    async fn create_cluster(&self, spec: &TkeClusterConfigSpec) -> Result<String, CloudError>;

    async fn delete_cluster(&self, cluster_id: &str) -> Result<(), CloudError>;

    /// Create a node pool and return its ID.
    async fn create_node_pool(
        &self,
        cluster_id: &str,
        pool: &NodePoolDetail,
    ) -> Result<String, CloudError>;

    async fn delete_node_pools(
        &self,
        cluster_id: &str,
        node_pool_ids: &[String],
        keep_instances: bool,
    ) -> Result<(), CloudError>;

    /// Apply name, bounds, labels, taints, OS, tags and deletion protection.
    async fn modify_node_pool(
        &self,
        cluster_id: &str,
        pool: &NodePoolDetail,
    ) -> Result<(), CloudError>;

    async fn modify_node_pool_instance_types(
        &self,
        cluster_id: &str,
        node_pool_id: &str,
        instance_type: &str,
    ) -> Result<(), CloudError>;

    async fn modify_node_pool_desired_capacity(
        &self,
        cluster_id: &str,
        node_pool_id: &str,
        desired_capacity: i64,
    ) -> Result<(), CloudError>;

    /// Apply project, name, description, level, auto-upgrade and GPU sharing.
    async fn modify_cluster_attribute(&self, spec: &TkeClusterConfigSpec)
    -> Result<(), CloudError>;

    async fn create_cluster_endpoint(
        &self,
        spec: &TkeClusterConfigSpec,
        extranet: bool,
    ) -> Result<(), CloudError>;

    async fn describe_auto_scaling_group(
        &self,
        group_id: &str,
    ) -> Result<AutoScalingGroup, CloudError>;

    async fn describe_launch_configuration(
        &self,
        launch_configuration_id: &str,
    ) -> Result<LaunchConfiguration, CloudError>;
}

/// Builds a [`CloudApi`] for a credential and region.
#[cfg_attr(test, automock)]
pub trait CloudConnector: Send + Sync {
    fn connect(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Arc<dyn CloudApi>, CloudError>;
}
