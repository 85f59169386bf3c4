//! Tencent Cloud implementation of [`CloudApi`] over HTTPS.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::cloud_api::{CloudApi, CloudConnector, Credential};
use super::error::CloudError;
use super::requests::{
    ClusterNetworkRequest, ClusterRequest, CreateClusterEndpointRequest,
    CreateClusterNodePoolRequest, CreateClusterRequest, DeleteClusterNodePoolRequest,
    DeleteClusterRequest, DescribeAutoScalingGroupsRequest, DescribeClustersRequest,
    DescribeLaunchConfigurationsRequest, ModifyClusterAttributeRequest,
    ModifyClusterNodePoolRequest, ModifyNodePoolDesiredCapacityRequest,
    ModifyNodePoolInstanceTypesRequest,
};
use super::signing::{CONTENT_TYPE, authorization};
use super::types::{
    AutoScalingGroup, EndpointStatus, LaunchConfiguration, RemoteCluster, RemoteInstance,
    RemoteNodePool,
};
use crate::crd::{NodePoolDetail, TkeClusterConfigSpec};

pub const TKE_ENDPOINT: &str = "https://tke.tencentcloudapi.com";
pub const AS_ENDPOINT: &str = "https://as.tencentcloudapi.com";
const TKE_VERSION: &str = "2018-05-25";
const AS_VERSION: &str = "2018-04-19";

/// One signed API product (service name, version and base URL).
#[derive(Clone, Debug)]
struct Service {
    name: &'static str,
    version: &'static str,
    url: Url,
    host: String,
}

impl Service {
    fn new(name: &'static str, version: &'static str, base: &str) -> Result<Self, CloudError> {
        let url = Url::parse(base)
            .map_err(|e| CloudError::InvalidRequest(format!("invalid endpoint {}: {}", base, e)))?;
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            (None, _) => {
                return Err(CloudError::InvalidRequest(format!(
                    "endpoint {} has no host",
                    base
                )));
            }
        };
        Ok(Self {
            name,
            version,
            url,
            host,
        })
    }
}

/// Signed JSON client for the TKE and Auto Scaling APIs of one region.
pub struct TencentCloudClient {
    http: reqwest::Client,
    credential: Credential,
    region: String,
    tke: Service,
    autoscaling: Service,
}

impl TencentCloudClient {
    /// Client for the public Tencent Cloud endpoints.
    pub fn new(
        http: reqwest::Client,
        credential: Credential,
        region: &str,
    ) -> Result<Self, CloudError> {
        Self::with_endpoints(http, credential, region, TKE_ENDPOINT, AS_ENDPOINT)
    }

    /// Client for explicit endpoints, e.g. a private gateway or a test server.
    pub fn with_endpoints(
        http: reqwest::Client,
        credential: Credential,
        region: &str,
        tke_endpoint: &str,
        as_endpoint: &str,
    ) -> Result<Self, CloudError> {
        Ok(Self {
            http,
            credential,
            region: region.to_string(),
            tke: Service::new("tke", TKE_VERSION, tke_endpoint)?,
            autoscaling: Service::new("as", AS_VERSION, as_endpoint)?,
        })
    }

    async fn call<Req, Resp>(
        &self,
        service: &Service,
        action: &str,
        request: &Req,
    ) -> Result<Resp, CloudError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        debug!(service = service.name, action = action, "client tke action: {}", action);

        let payload = serde_json::to_string(request)
            .map_err(|e| CloudError::InvalidRequest(e.to_string()))?;
        let now = jiff::Timestamp::now();
        let timestamp = now.as_second();
        let date = now.strftime("%Y-%m-%d").to_string();
        let auth = authorization(
            &self.credential,
            service.name,
            &service.host,
            &payload,
            timestamp,
            &date,
        )?;

        let body: Value = self
            .http
            .post(service.url.clone())
            .header("Authorization", auth)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-TC-Action", action)
            .header("X-TC-Timestamp", timestamp.to_string())
            .header("X-TC-Version", service.version)
            .header("X-TC-Region", &self.region)
            .body(payload)
            .send()
            .await?
            .json()
            .await?;

        let response = match body.get("Response") {
            Some(r) if !r.is_null() => r,
            _ => return Err(CloudError::EmptyResponse(action.to_string())),
        };

        if let Some(error) = response.get("Error") {
            let field = |name: &str| {
                error
                    .get(name)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            return Err(CloudError::Api {
                code: field("Code"),
                message: field("Message"),
                request_id: response
                    .get("RequestId")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        serde_json::from_value(response.clone()).map_err(|source| CloudError::Decode {
            action: action.to_string(),
            source,
        })
    }
}

fn present<T>(value: Option<T>, action: &str) -> Result<T, CloudError> {
    value.ok_or_else(|| CloudError::EmptyResponse(action.to_string()))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeClustersResponse {
    clusters: Option<Vec<RemoteCluster>>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeNodePoolsResponse {
    node_pool_set: Option<Vec<RemoteNodePool>>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesResponse {
    instance_set: Option<Vec<RemoteInstance>>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EndpointStatusResponse {
    status: Option<String>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KubeconfigResponse {
    kubeconfig: Option<String>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateClusterResponse {
    cluster_id: Option<String>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateNodePoolResponse {
    node_pool_id: Option<String>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AutoScalingGroupsResponse {
    auto_scaling_group_set: Option<Vec<AutoScalingGroup>>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LaunchConfigurationsResponse {
    launch_configuration_set: Option<Vec<LaunchConfiguration>>,
}

#[derive(serde::Deserialize)]
struct Ack {}

#[async_trait]
impl CloudApi for TencentCloudClient {
    async fn describe_cluster(&self, cluster_id: &str) -> Result<RemoteCluster, CloudError> {
        let response: DescribeClustersResponse = self
            .call(
                &self.tke,
                "DescribeClusters",
                &DescribeClustersRequest {
                    cluster_ids: vec![cluster_id.to_string()],
                },
            )
            .await?;
        response
            .clusters
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| CloudError::NotFound {
                kind: "Cluster",
                id: cluster_id.to_string(),
            })
    }

    async fn describe_cluster_node_pools(
        &self,
        cluster_id: &str,
    ) -> Result<Vec<RemoteNodePool>, CloudError> {
        let response: DescribeNodePoolsResponse = self
            .call(
                &self.tke,
                "DescribeClusterNodePools",
                &ClusterRequest {
                    cluster_id: cluster_id.to_string(),
                },
            )
            .await?;
        Ok(response.node_pool_set.unwrap_or_default())
    }

    async fn describe_cluster_instances(
        &self,
        cluster_id: &str,
    ) -> Result<Vec<RemoteInstance>, CloudError> {
        let response: DescribeInstancesResponse = self
            .call(
                &self.tke,
                "DescribeClusterInstances",
                &ClusterRequest {
                    cluster_id: cluster_id.to_string(),
                },
            )
            .await?;
        Ok(response.instance_set.unwrap_or_default())
    }

    async fn describe_cluster_endpoint_status(
        &self,
        cluster_id: &str,
        extranet: bool,
    ) -> Result<EndpointStatus, CloudError> {
        let action = "DescribeClusterEndpointStatus";
        let response: EndpointStatusResponse = self
            .call(
                &self.tke,
                action,
                &ClusterNetworkRequest {
                    cluster_id: cluster_id.to_string(),
                    is_extranet: extranet,
                },
            )
            .await?;
        Ok(EndpointStatus::parse(&present(response.status, action)?))
    }

    async fn describe_cluster_kubeconfig(
        &self,
        cluster_id: &str,
        extranet: bool,
    ) -> Result<String, CloudError> {
        let action = "DescribeClusterKubeconfig";
        let response: KubeconfigResponse = self
            .call(
                &self.tke,
                action,
                &ClusterNetworkRequest {
                    cluster_id: cluster_id.to_string(),
                    is_extranet: extranet,
                },
            )
            .await?;
        present(response.kubeconfig, action)
    }

    async fn create_cluster(&self, spec: &TkeClusterConfigSpec) -> Result<String, CloudError> {
        let action = "CreateCluster";
        let response: CreateClusterResponse = self
            .call(&self.tke, action, &CreateClusterRequest::from_spec(spec)?)
            .await?;
        present(response.cluster_id, action)
    }

    async fn delete_cluster(&self, cluster_id: &str) -> Result<(), CloudError> {
        let _: Ack = self
            .call(
                &self.tke,
                "DeleteCluster",
                &DeleteClusterRequest::terminate(cluster_id),
            )
            .await?;
        Ok(())
    }

    async fn create_node_pool(
        &self,
        cluster_id: &str,
        pool: &NodePoolDetail,
    ) -> Result<String, CloudError> {
        let action = "CreateClusterNodePool";
        let response: CreateNodePoolResponse = self
            .call(
                &self.tke,
                action,
                &CreateClusterNodePoolRequest::from_pool(cluster_id, pool)?,
            )
            .await?;
        present(response.node_pool_id, action)
    }

    async fn delete_node_pools(
        &self,
        cluster_id: &str,
        node_pool_ids: &[String],
        keep_instances: bool,
    ) -> Result<(), CloudError> {
        let _: Ack = self
            .call(
                &self.tke,
                "DeleteClusterNodePool",
                &DeleteClusterNodePoolRequest {
                    cluster_id: cluster_id.to_string(),
                    node_pool_ids: node_pool_ids.to_vec(),
                    keep_instance: keep_instances,
                },
            )
            .await?;
        Ok(())
    }

    async fn modify_node_pool(
        &self,
        cluster_id: &str,
        pool: &NodePoolDetail,
    ) -> Result<(), CloudError> {
        let _: Ack = self
            .call(
                &self.tke,
                "ModifyClusterNodePool",
                &ModifyClusterNodePoolRequest::from_pool(cluster_id, pool),
            )
            .await?;
        Ok(())
    }

    async fn modify_node_pool_instance_types(
        &self,
        cluster_id: &str,
        node_pool_id: &str,
        instance_type: &str,
    ) -> Result<(), CloudError> {
        let _: Ack = self
            .call(
                &self.tke,
                "ModifyNodePoolInstanceTypes",
                &ModifyNodePoolInstanceTypesRequest {
                    cluster_id: cluster_id.to_string(),
                    node_pool_id: node_pool_id.to_string(),
                    instance_types: vec![instance_type.to_string()],
                },
            )
            .await?;
        Ok(())
    }

    async fn modify_node_pool_desired_capacity(
        &self,
        cluster_id: &str,
        node_pool_id: &str,
        desired_capacity: i64,
    ) -> Result<(), CloudError> {
        let _: Ack = self
            .call(
                &self.tke,
                "ModifyNodePoolDesiredCapacityAboutAsg",
                &ModifyNodePoolDesiredCapacityRequest {
                    cluster_id: cluster_id.to_string(),
                    node_pool_id: node_pool_id.to_string(),
                    desired_capacity,
                },
            )
            .await?;
        Ok(())
    }

    async fn modify_cluster_attribute(
        &self,
        spec: &TkeClusterConfigSpec,
    ) -> Result<(), CloudError> {
        let _: Ack = self
            .call(
                &self.tke,
                "ModifyClusterAttribute",
                &ModifyClusterAttributeRequest::from_spec(spec),
            )
            .await?;
        Ok(())
    }

    async fn create_cluster_endpoint(
        &self,
        spec: &TkeClusterConfigSpec,
        extranet: bool,
    ) -> Result<(), CloudError> {
        let _: Ack = self
            .call(
                &self.tke,
                "CreateClusterEndpoint",
                &CreateClusterEndpointRequest::from_spec(spec, extranet),
            )
            .await?;
        Ok(())
    }

    async fn describe_auto_scaling_group(
        &self,
        group_id: &str,
    ) -> Result<AutoScalingGroup, CloudError> {
        let response: AutoScalingGroupsResponse = self
            .call(
                &self.autoscaling,
                "DescribeAutoScalingGroups",
                &DescribeAutoScalingGroupsRequest {
                    auto_scaling_group_ids: vec![group_id.to_string()],
                },
            )
            .await?;
        response
            .auto_scaling_group_set
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| CloudError::NotFound {
                kind: "AutoScalingGroup",
                id: group_id.to_string(),
            })
    }

    async fn describe_launch_configuration(
        &self,
        launch_configuration_id: &str,
    ) -> Result<LaunchConfiguration, CloudError> {
        let response: LaunchConfigurationsResponse = self
            .call(
                &self.autoscaling,
                "DescribeLaunchConfigurations",
                &DescribeLaunchConfigurationsRequest {
                    launch_configuration_ids: vec![launch_configuration_id.to_string()],
                },
            )
            .await?;
        response
            .launch_configuration_set
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| CloudError::NotFound {
                kind: "LaunchConfiguration",
                id: launch_configuration_id.to_string(),
            })
    }
}

/// Connector producing [`TencentCloudClient`]s that share one HTTP pool.
#[derive(Clone)]
pub struct TencentConnector {
    http: reqwest::Client,
    tke_endpoint: String,
    as_endpoint: String,
}

impl Default for TencentConnector {
    fn default() -> Self {
        Self::new(TKE_ENDPOINT, AS_ENDPOINT)
    }
}

impl TencentConnector {
    pub fn new(tke_endpoint: &str, as_endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            tke_endpoint: tke_endpoint.to_string(),
            as_endpoint: as_endpoint.to_string(),
        }
    }
}

impl CloudConnector for TencentConnector {
    fn connect(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Arc<dyn CloudApi>, CloudError> {
        let client = TencentCloudClient::with_endpoints(
            self.http.clone(),
            credential.clone(),
            region,
            &self.tke_endpoint,
            &self.as_endpoint,
        )?;
        Ok(Arc::new(client))
    }
}
