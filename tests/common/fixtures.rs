//! Test fixtures and builder patterns for TKEClusterConfig.

use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tke_operator::controller::credentials::{ACCESS_KEY_ID_KEY, ACCESS_KEY_SECRET_KEY};
use tke_operator::crd::{
    AutoScalingGroupPara, ClusterAdvancedSettings, ClusterBasicSettings, ClusterConfigPhase,
    ClusterEndpoint, LaunchConfigurePara, NodePoolDetail, TkeClusterConfig, TkeClusterConfigSpec,
    TkeClusterConfigStatus,
};

pub const NAMESPACE: &str = "cattle-global-data";
pub const CREDENTIAL_NAME: &str = "tke-credential";

/// Builder for creating TKEClusterConfig test fixtures.
///
/// # Example
/// ```
/// let config = TkeClusterConfigBuilder::new("prod")
///     .cluster_id("cls-abc")
///     .phase(ClusterConfigPhase::Active)
///     .node_pool(NodePoolBuilder::new("workers").id("np-1").build())
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct TkeClusterConfigBuilder {
    name: String,
    namespace: String,
    spec: TkeClusterConfigSpec,
    status: Option<TkeClusterConfigStatus>,
    uid: Option<String>,
}

impl TkeClusterConfigBuilder {
    /// A managed cluster config with credential, region and basic settings set.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            spec: TkeClusterConfigSpec {
                tke_credential_secret: format!("{}:{}", NAMESPACE, CREDENTIAL_NAME),
                region: "ap-guangzhou".to_string(),
                cluster_basic_settings: Some(ClusterBasicSettings {
                    cluster_type: "MANAGED_CLUSTER".to_string(),
                    cluster_os: "tlinux2.4x86_64".to_string(),
                    cluster_version: "1.26.1".to_string(),
                    cluster_name: name.clone(),
                    vpc_id: "vpc-1".to_string(),
                    cluster_level: "L5".to_string(),
                    ..Default::default()
                }),
                cluster_advanced_settings: Some(ClusterAdvancedSettings::default()),
                ..Default::default()
            },
            name,
            namespace: NAMESPACE.to_string(),
            status: None,
            uid: Some("uid-1".to_string()),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.spec.region = region.into();
        self
    }

    pub fn credential(mut self, reference: impl Into<String>) -> Self {
        self.spec.tke_credential_secret = reference.into();
        self
    }

    pub fn cluster_id(mut self, cluster_id: impl Into<String>) -> Self {
        self.spec.cluster_id = cluster_id.into();
        self
    }

    /// Adopt an existing cluster. Imported configs carry no cluster settings.
    pub fn imported(mut self) -> Self {
        self.spec.imported = true;
        self.spec.cluster_basic_settings = None;
        self.spec.cluster_advanced_settings = None;
        self
    }

    pub fn project_id(mut self, project_id: i64) -> Self {
        if let Some(basic) = self.spec.cluster_basic_settings.as_mut() {
            basic.project_id = project_id;
        }
        self
    }

    pub fn without_basic_settings(mut self) -> Self {
        self.spec.cluster_basic_settings = None;
        self
    }

    pub fn gpu_share(mut self, enabled: bool) -> Self {
        self.spec
            .cluster_advanced_settings
            .get_or_insert_with(Default::default)
            .qgpu_share_enable = enabled;
        self
    }

    pub fn extranet_endpoint(mut self) -> Self {
        self.spec.cluster_endpoint = Some(ClusterEndpoint {
            enable: true,
            ..Default::default()
        });
        self
    }

    pub fn node_pool(mut self, pool: NodePoolDetail) -> Self {
        self.spec.node_pool_list.push(pool);
        self
    }

    pub fn phase(mut self, phase: ClusterConfigPhase) -> Self {
        self.status.get_or_insert_with(Default::default).phase = phase;
        self
    }

    pub fn failure_message(mut self, message: impl Into<String>) -> Self {
        self.status.get_or_insert_with(Default::default).failure_message = message.into();
        self
    }

    pub fn without_uid(mut self) -> Self {
        self.uid = None;
        self
    }

    pub fn build(self) -> TkeClusterConfig {
        let mut config = TkeClusterConfig::new(&self.name, self.spec);
        config.metadata.namespace = Some(self.namespace);
        config.metadata.uid = self.uid;
        config.status = self.status;
        config
    }
}

/// Builder for node pool entries.
#[derive(Clone, Debug)]
pub struct NodePoolBuilder {
    pool: NodePoolDetail,
}

impl NodePoolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            pool: NodePoolDetail {
                name: name.into(),
                auto_scaling_group_para: AutoScalingGroupPara {
                    max_size: 5,
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
                labels: vec!["team=infra".to_string()],
                node_pool_os: "tlinux2.4x86_64".to_string(),
                ..Default::default()
            },
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.pool.node_pool_id = id.into();
        self
    }

    pub fn desired_capacity(mut self, capacity: i64) -> Self {
        self.pool.auto_scaling_group_para.desired_capacity = capacity;
        self
    }

    pub fn max_size(mut self, max_size: i64) -> Self {
        self.pool.auto_scaling_group_para.max_size = max_size;
        self
    }

    pub fn instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.pool.launch_configure_para.instance_type = instance_type.into();
        self
    }

    pub fn labels(mut self, labels: &[&str]) -> Self {
        self.pool.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn build(self) -> NodePoolDetail {
        self.pool
    }
}

/// Credential secret matching [`TkeClusterConfigBuilder::new`]'s reference.
pub fn credential_secret() -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(CREDENTIAL_NAME.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([
            (
                ACCESS_KEY_ID_KEY.to_string(),
                ByteString(b"AKIDexample".to_vec()),
            ),
            (
                ACCESS_KEY_SECRET_KEY.to_string(),
                ByteString(b"secret".to_vec()),
            ),
        ])),
        ..Default::default()
    }
}

/// Kubeconfig as returned by DescribeClusterKubeconfig.
pub fn kubeconfig(cluster_id: &str) -> String {
    format!(
        r#"apiVersion: v1
kind: Config
clusters:
- name: {id}
  cluster:
    server: https://{id}.ccs.tencent-cloud.com
    certificate-authority-data: Y2EtYnl0ZXM=
contexts:
- name: {id}-context
  context:
    cluster: {id}
    user: admin
current-context: {id}-context
users:
- name: admin
  user:
    token: secret
"#,
        id = cluster_id
    )
}
