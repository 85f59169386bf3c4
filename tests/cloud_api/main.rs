// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Wire-level tests for the signed Tencent Cloud client.
//!
//! Each test stands up a local HTTP server in place of the TKE and Auto
//! Scaling endpoints and checks the request headers, the JSON payload and
//! how the response envelope is decoded.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_regex, method};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use tke_operator::client::{CloudApi, CloudError, Credential, EndpointStatus, TencentCloudClient};

const REGION: &str = "ap-guangzhou";

fn credential() -> Credential {
    Credential {
        access_key_id: "AKIDexample".to_string(),
        access_key_secret: "secret".to_string(),
    }
}

/// A TKE server and a separate Auto Scaling server.
struct Servers {
    tke: MockServer,
    autoscaling: MockServer,
}

impl Servers {
    async fn start() -> Self {
        Self {
            tke: MockServer::start().await,
            autoscaling: MockServer::start().await,
        }
    }

    fn client(&self) -> TencentCloudClient {
        TencentCloudClient::with_endpoints(
            reqwest::Client::new(),
            credential(),
            REGION,
            &self.tke.uri(),
            &self.autoscaling.uri(),
        )
        .unwrap()
    }
}

fn envelope(body: serde_json::Value) -> ResponseTemplate {
    let mut response = body;
    response["RequestId"] = json!("req-1");
    ResponseTemplate::new(200).set_body_json(json!({ "Response": response }))
}

/// Authorization header of the only request the server received.
async fn authorization(server: &MockServer) -> String {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    requests[0]
        .headers
        .get("Authorization")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

fn action(name: &str) -> MockBuilder {
    Mock::given(method("POST")).and(header("X-TC-Action", name))
}

mod signing_tests {
    use super::*;

    #[tokio::test]
    async fn test_request_carries_signed_headers() {
        let servers = Servers::start().await;
        action("DescribeClusters")
            .and(header("X-TC-Version", "2018-05-25"))
            .and(header("X-TC-Region", REGION))
            .and(header("Content-Type", "application/json; charset=utf-8"))
            .and(header_regex("X-TC-Timestamp", r"^\d+$"))
            .respond_with(envelope(json!({
                "Clusters": [{"ClusterId": "cls-1", "ClusterStatus": "Running"}]
            })))
            .expect(1)
            .mount(&servers.tke)
            .await;

        let cluster = servers.client().describe_cluster("cls-1").await.unwrap();
        assert_eq!(cluster.cluster_id.as_deref(), Some("cls-1"));

        let auth = authorization(&servers.tke).await;
        let (scope, rest) = auth.split_once(", ").unwrap();
        assert!(scope.starts_with("TC3-HMAC-SHA256 Credential=AKIDexample/"));
        assert!(scope.ends_with("/tke/tc3_request"));
        let (signed_headers, signature) = rest.split_once(", ").unwrap();
        assert_eq!(signed_headers, "SignedHeaders=content-type;host");
        let hex = signature.strip_prefix("Signature=").unwrap();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_autoscaling_calls_use_their_own_endpoint() {
        let servers = Servers::start().await;
        action("DescribeAutoScalingGroups")
            .and(header("X-TC-Version", "2018-04-19"))
            .and(body_partial_json(json!({"AutoScalingGroupIds": ["asg-1"]})))
            .respond_with(envelope(json!({
                "AutoScalingGroupSet": [{"AutoScalingGroupId": "asg-1", "DesiredCapacity": 3}]
            })))
            .expect(1)
            .mount(&servers.autoscaling)
            .await;

        servers
            .client()
            .describe_auto_scaling_group("asg-1")
            .await
            .unwrap();
        assert!(authorization(&servers.autoscaling).await.contains("/as/tc3_request, "));
        assert!(servers.tke.received_requests().await.unwrap().is_empty());
    }
}

mod response_tests {
    use super::*;

    #[tokio::test]
    async fn test_error_payload_maps_to_api_error() {
        let servers = Servers::start().await;
        action("DescribeClusters")
            .respond_with(envelope(json!({
                "Error": {
                    "Code": "FailedOperation.ClusterNotFound",
                    "Message": "cluster cls-9 not found"
                }
            })))
            .mount(&servers.tke)
            .await;

        let err = servers
            .client()
            .describe_cluster("cls-9")
            .await
            .unwrap_err();
        assert!(err.is_cluster_not_found());
        match err {
            CloudError::Api {
                code,
                message,
                request_id,
            } => {
                assert_eq!(code, "FailedOperation.ClusterNotFound");
                assert_eq!(message, "cluster cls-9 not found");
                assert_eq!(request_id, "req-1");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_response_is_empty() {
        let servers = Servers::start().await;
        action("DescribeClusterKubeconfig")
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Response": null})))
            .mount(&servers.tke)
            .await;

        let err = servers
            .client()
            .describe_cluster_kubeconfig("cls-1", false)
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::EmptyResponse(ref a) if a == "DescribeClusterKubeconfig"));
    }

    #[tokio::test]
    async fn test_empty_cluster_list_is_not_found() {
        let servers = Servers::start().await;
        action("DescribeClusters")
            .respond_with(envelope(json!({"Clusters": [], "TotalCount": 0})))
            .mount(&servers.tke)
            .await;

        let err = servers
            .client()
            .describe_cluster("cls-1")
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::NotFound { kind: "Cluster", .. }));
    }

    #[tokio::test]
    async fn test_node_pools_are_decoded() {
        let servers = Servers::start().await;
        action("DescribeClusterNodePools")
            .and(body_partial_json(json!({"ClusterId": "cls-1"})))
            .respond_with(envelope(json!({
                "NodePoolSet": [{
                    "NodePoolId": "np-1",
                    "Name": "workers",
                    "LifeState": "normal",
                    "AutoscalingGroupId": "asg-1",
                    "LaunchConfigurationId": "asc-1",
                    "Labels": [{"Name": "team", "Value": "infra"}]
                }],
                "TotalCount": 1
            })))
            .mount(&servers.tke)
            .await;

        let pools = servers
            .client()
            .describe_cluster_node_pools("cls-1")
            .await
            .unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].node_pool_id.as_deref(), Some("np-1"));
        assert_eq!(pools[0].life_state.as_deref(), Some("normal"));
        assert_eq!(pools[0].labels.as_ref().unwrap()[0].name.as_deref(), Some("team"));
    }

    #[tokio::test]
    async fn test_endpoint_status_is_parsed() {
        let servers = Servers::start().await;
        action("DescribeClusterEndpointStatus")
            .and(body_partial_json(json!({"ClusterId": "cls-1", "IsExtranet": true})))
            .respond_with(envelope(json!({"Status": "Creating"})))
            .mount(&servers.tke)
            .await;

        let status = servers
            .client()
            .describe_cluster_endpoint_status("cls-1", true)
            .await
            .unwrap();
        assert_eq!(status, EndpointStatus::Creating);
    }
}

mod mutation_tests {
    use super::*;
    use tke_operator::crd::{
        AutoScalingGroupPara, ClusterBasicSettings, LaunchConfigurePara, NodePoolDetail,
        TkeClusterConfigSpec,
    };

    fn spec() -> TkeClusterConfigSpec {
        TkeClusterConfigSpec {
            region: REGION.to_string(),
            cluster_basic_settings: Some(ClusterBasicSettings {
                cluster_type: "MANAGED_CLUSTER".to_string(),
                cluster_name: "prod".to_string(),
                vpc_id: "vpc-1".to_string(),
                cluster_level: "L5".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_cluster_returns_id() {
        let servers = Servers::start().await;
        action("CreateCluster")
            .and(body_partial_json(json!({"ClusterType": "MANAGED_CLUSTER"})))
            .respond_with(envelope(json!({"ClusterId": "cls-new"})))
            .expect(1)
            .mount(&servers.tke)
            .await;

        let id = servers.client().create_cluster(&spec()).await.unwrap();
        assert_eq!(id, "cls-new");
    }

    #[tokio::test]
    async fn test_create_node_pool_returns_id() {
        let servers = Servers::start().await;
        action("CreateClusterNodePool")
            .and(body_partial_json(json!({"ClusterId": "cls-1", "Name": "workers"})))
            .respond_with(envelope(json!({"NodePoolId": "np-new"})))
            .expect(1)
            .mount(&servers.tke)
            .await;

        let pool = NodePoolDetail {
            name: "workers".to_string(),
            auto_scaling_group_para: AutoScalingGroupPara {
                max_size: 3,
                min_size: 1,
                desired_capacity: 2,
                vpc_id: "vpc-1".to_string(),
                subnet_ids: vec!["subnet-1".to_string()],
                ..Default::default()
            },
            launch_configure_para: LaunchConfigurePara {
                instance_type: "S5.MEDIUM4".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let id = servers
            .client()
            .create_node_pool("cls-1", &pool)
            .await
            .unwrap();
        assert_eq!(id, "np-new");
    }

    #[tokio::test]
    async fn test_delete_cluster_terminates_instances() {
        let servers = Servers::start().await;
        action("DeleteCluster")
            .and(body_partial_json(json!({
                "ClusterId": "cls-1",
                "InstanceDeleteMode": "terminate"
            })))
            .respond_with(envelope(json!({})))
            .expect(1)
            .mount(&servers.tke)
            .await;

        servers.client().delete_cluster("cls-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_node_pools_passes_keep_instance() {
        let servers = Servers::start().await;
        action("DeleteClusterNodePool")
            .and(body_partial_json(json!({
                "ClusterId": "cls-1",
                "NodePoolIds": ["np-1", "np-2"],
                "KeepInstance": true
            })))
            .respond_with(envelope(json!({})))
            .expect(1)
            .mount(&servers.tke)
            .await;

        servers
            .client()
            .delete_node_pools("cls-1", &["np-1".to_string(), "np-2".to_string()], true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_desired_capacity_request() {
        let servers = Servers::start().await;
        action("ModifyNodePoolDesiredCapacityAboutAsg")
            .and(body_partial_json(json!({
                "ClusterId": "cls-1",
                "NodePoolId": "np-1",
                "DesiredCapacity": 4
            })))
            .respond_with(envelope(json!({})))
            .expect(1)
            .mount(&servers.tke)
            .await;

        servers
            .client()
            .modify_node_pool_desired_capacity("cls-1", "np-1", 4)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_throttled_mutation_is_retryable() {
        let servers = Servers::start().await;
        action("ModifyNodePoolInstanceTypes")
            .respond_with(envelope(json!({
                "Error": {"Code": "RequestLimitExceeded", "Message": "slow down"}
            })))
            .mount(&servers.tke)
            .await;

        let err = servers
            .client()
            .modify_node_pool_instance_types("cls-1", "np-1", "S5.LARGE8")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.code(), Some("RequestLimitExceeded"));
    }
}
