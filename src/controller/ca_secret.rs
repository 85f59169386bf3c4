//! Endpoint and CA secret for a managed cluster.
//!
//! Once the cluster endpoint is reachable, a Secret named after the config is
//! created with the API server address and CA bundle so that downstream
//! consumers can build a kubeconfig. An existing secret is never overwritten.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::config::Kubeconfig;
use kube::{Resource, ResourceExt};
use tracing::{debug, info};

use crate::client::CloudApi;
use crate::controller::error::{Error, Result};
use crate::controller::store::{CreateOutcome, SecretStore};
use crate::crd::TkeClusterConfig;

pub const ENDPOINT_KEY: &str = "endpoint";
pub const CA_KEY: &str = "ca";

/// API server address and CA data taken from a kubeconfig.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterAccess {
    pub endpoint: String,
    /// Base64-encoded CA bundle
    pub ca: String,
}

/// Extract the endpoint and CA of the current context's cluster.
///
/// Falls back to the first cluster when no current context is set.
pub fn parse_kubeconfig(raw: &str) -> Result<ClusterAccess> {
    let kubeconfig = Kubeconfig::from_yaml(raw).map_err(|e| Error::Kubeconfig(e.to_string()))?;

    let current_cluster = kubeconfig.current_context.as_ref().and_then(|current| {
        kubeconfig
            .contexts
            .iter()
            .find(|c| &c.name == current)
            .and_then(|c| c.context.as_ref())
            .map(|c| c.cluster.clone())
    });

    let named = match current_cluster {
        Some(cluster_name) => kubeconfig
            .clusters
            .iter()
            .find(|c| c.name == cluster_name),
        None => kubeconfig.clusters.first(),
    }
    .ok_or_else(|| Error::Kubeconfig("no cluster entry".to_string()))?;

    let cluster = named
        .cluster
        .as_ref()
        .ok_or_else(|| Error::Kubeconfig(format!("cluster {} has no details", named.name)))?;

    let endpoint = cluster
        .server
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Kubeconfig(format!("cluster {} has no server", named.name)))?;

    let ca_data = cluster
        .certificate_authority_data
        .as_deref()
        .ok_or_else(|| Error::Kubeconfig(format!("cluster {} has no CA data", named.name)))?;
    let ca_bytes = STANDARD
        .decode(ca_data.trim())
        .map_err(|e| Error::Kubeconfig(format!("CA data is not base64: {}", e)))?;

    Ok(ClusterAccess {
        endpoint,
        ca: STANDARD.encode(ca_bytes),
    })
}

/// Build the secret for `config`, owned by it for garbage collection.
pub fn build_secret(config: &TkeClusterConfig, access: &ClusterAccess) -> Result<Secret> {
    let uid = config
        .uid()
        .ok_or_else(|| Error::MissingField("metadata.uid".to_string()))?;

    let data = BTreeMap::from([
        (
            ENDPOINT_KEY.to_string(),
            ByteString(access.endpoint.clone().into_bytes()),
        ),
        (CA_KEY.to_string(), ByteString(access.ca.clone().into_bytes())),
    ]);

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(config.name_any()),
            namespace: config.namespace(),
            owner_references: Some(vec![OwnerReference {
                api_version: TkeClusterConfig::api_version(&()).into_owned(),
                kind: TkeClusterConfig::kind(&()).into_owned(),
                name: config.name_any(),
                uid,
                ..Default::default()
            }]),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    })
}

/// Ensure the endpoint/CA secret for `config` exists.
///
/// An existing secret is left alone without fetching the kubeconfig.
pub async fn ensure_ca_secret(
    cloud: &dyn CloudApi,
    secrets: &dyn SecretStore,
    config: &TkeClusterConfig,
) -> Result<()> {
    let namespace = config
        .namespace()
        .ok_or_else(|| Error::MissingField("metadata.namespace".to_string()))?;
    if secrets
        .get_secret(&namespace, &config.name_any())
        .await?
        .is_some()
    {
        debug!(name = %config.name_any(), "CA secret present");
        return Ok(());
    }

    let raw = cloud
        .describe_cluster_kubeconfig(&config.spec.cluster_id, config.extranet_endpoint())
        .await?;
    let access = parse_kubeconfig(&raw)?;
    let secret = build_secret(config, &access)?;

    match secrets.create_secret(&secret).await? {
        CreateOutcome::Created => {
            info!(name = %config.name_any(), cluster_id = %config.spec.cluster_id, "Created CA secret");
        }
        CreateOutcome::AlreadyExists => {
            info!(name = %config.name_any(), "CA secret already exists, ignoring");
        }
    }
    Ok(())
}
