//! Persistence seams for TKEClusterConfig objects and secrets.
//!
//! The reconciler never mutates an object it was handed. It reads an immutable
//! snapshot, describes the delta as a [`SpecPatch`] or [`StatusPatch`], and
//! the store writes that delta against the snapshot's resourceVersion.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use tracing::warn;

#[cfg(test)]
use mockall::automock;

use crate::controller::error::{Error, Result};
use crate::crd::{
    ClusterConfigPhase, NodePoolDetail, TkeClusterConfig, TkeClusterConfigSpec,
    TkeClusterConfigStatus,
};
use crate::retry::{RetryConfig, retry_with_backoff};

// ============================================================================
// Patches
// ============================================================================

/// A pool created upstream whose ID still has to be written back.
#[derive(Clone, Debug, PartialEq)]
struct CreatedPool {
    index: usize,
    name: String,
    id: String,
}

impl CreatedPool {
    /// Position in `pools` that should receive this ID.
    ///
    /// The pool at the recorded index wins when its name matches and it has
    /// no ID yet. Otherwise the ID goes to the only ID-less pool carrying the
    /// same name. A pool that already has an ID is never reassigned.
    fn slot(&self, pools: &[NodePoolDetail]) -> Option<usize> {
        if pools.iter().any(|p| p.node_pool_id == self.id) {
            return None;
        }
        let open = |p: &NodePoolDetail| p.name == self.name && p.node_pool_id.is_empty();
        if pools.get(self.index).is_some_and(open) {
            return Some(self.index);
        }
        let mut candidates = pools
            .iter()
            .enumerate()
            .filter(|(_, p)| open(p))
            .map(|(i, _)| i);
        match (candidates.next(), candidates.next()) {
            (Some(i), None) => Some(i),
            _ => None,
        }
    }
}

/// Delta to persist on `spec`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpecPatch {
    cluster_id: Option<String>,
    node_pool_ids: Vec<CreatedPool>,
    adopted: Option<Box<TkeClusterConfigSpec>>,
}

impl SpecPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the upstream ID of a newly created cluster.
    pub fn cluster_id(mut self, cluster_id: impl Into<String>) -> Self {
        self.cluster_id = Some(cluster_id.into());
        self
    }

    /// Record the upstream ID of the pool `name` found at `index` in `nodePoolList`.
    pub fn node_pool_id(
        mut self,
        index: usize,
        name: impl Into<String>,
        node_pool_id: impl Into<String>,
    ) -> Self {
        self.node_pool_ids.push(CreatedPool {
            index,
            name: name.into(),
            id: node_pool_id.into(),
        });
        self
    }

    /// Take cluster settings and node pools from an observed spec.
    ///
    /// Identity, credential, region and endpoint fields are left untouched.
    pub fn adopt(mut self, observed: TkeClusterConfigSpec) -> Self {
        self.adopted = Some(Box::new(observed));
        self
    }

    /// The spec that results from applying this patch to `spec`.
    pub fn apply(&self, spec: &TkeClusterConfigSpec) -> TkeClusterConfigSpec {
        let mut next = spec.clone();
        if let Some(observed) = &self.adopted {
            next.cluster_basic_settings = observed.cluster_basic_settings.clone();
            next.cluster_cidr_settings = observed.cluster_cidr_settings.clone();
            next.cluster_advanced_settings = observed.cluster_advanced_settings.clone();
            next.node_pool_list = observed.node_pool_list.clone();
        }
        if let Some(cluster_id) = &self.cluster_id {
            next.cluster_id = cluster_id.clone();
        }
        for created in &self.node_pool_ids {
            let slot = created.slot(&next.node_pool_list);
            if let Some(pool) = slot.and_then(|i| next.node_pool_list.get_mut(i)) {
                pool.node_pool_id = created.id.clone();
            } else if !next.node_pool_list.iter().any(|p| p.node_pool_id == created.id) {
                warn!(
                    node_pool = %created.name,
                    node_pool_id = %created.id,
                    "No unambiguous pool to record created node pool ID on"
                );
            }
        }
        next
    }
}

/// Delta to persist on `status`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusPatch {
    phase: Option<ClusterConfigPhase>,
    failure_message: Option<String>,
}

impl StatusPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(mut self, phase: ClusterConfigPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    pub fn target_phase(&self) -> Option<ClusterConfigPhase> {
        self.phase
    }

    /// The status that results from applying this patch to `status`.
    pub fn apply(&self, status: Option<&TkeClusterConfigStatus>) -> TkeClusterConfigStatus {
        let mut next = status.cloned().unwrap_or_default();
        if let Some(phase) = self.phase {
            next.phase = phase;
        }
        if let Some(message) = &self.failure_message {
            next.failure_message = message.clone();
        }
        next
    }
}

// ============================================================================
// Store traits
// ============================================================================

/// Read and write access to TKEClusterConfig objects.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fresh read, bypassing any cache.
    async fn get(&self, namespace: &str, name: &str) -> Result<TkeClusterConfig>;

    /// Replace `spec` with `patch` applied to the snapshot.
    ///
    /// Fails with [`Error::Conflict`] if the object changed since `snapshot` was read.
    async fn update_spec(
        &self,
        snapshot: &TkeClusterConfig,
        patch: &SpecPatch,
    ) -> Result<TkeClusterConfig>;

    /// Write `status` with `patch` applied to the snapshot.
    ///
    /// Fails with [`Error::Conflict`] if the object changed since `snapshot` was read.
    async fn update_status(
        &self,
        snapshot: &TkeClusterConfig,
        patch: &StatusPatch,
    ) -> Result<TkeClusterConfig>;
}

/// Outcome of creating a secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Read and create access to secrets.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    async fn create_secret(&self, secret: &Secret) -> Result<CreateOutcome>;
}

// ============================================================================
// Kubernetes implementation
// ============================================================================

/// Field manager name for writes made by the operator
pub const FIELD_MANAGER: &str = "tke-operator";

/// [`ConfigStore`] and [`SecretStore`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn configs(&self, namespace: &str) -> Api<TkeClusterConfig> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn namespace_of(config: &TkeClusterConfig) -> Result<String> {
    config
        .namespace()
        .ok_or_else(|| Error::MissingField("metadata.namespace".to_string()))
}

fn write_error(kind: &str, name: &str, err: kube::Error) -> Error {
    match err {
        kube::Error::Api(e) if e.code == 409 => Error::Conflict(format!("{} of {}", kind, name)),
        other => Error::Kube(other),
    }
}

#[async_trait]
impl ConfigStore for KubeStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<TkeClusterConfig> {
        Ok(self.configs(namespace).get(name).await?)
    }

    async fn update_spec(
        &self,
        snapshot: &TkeClusterConfig,
        patch: &SpecPatch,
    ) -> Result<TkeClusterConfig> {
        let namespace = namespace_of(snapshot)?;
        let name = snapshot.name_any();

        let mut next = snapshot.clone();
        next.spec = patch.apply(&snapshot.spec);

        self.configs(&namespace)
            .replace(
                &name,
                &PostParams {
                    field_manager: Some(FIELD_MANAGER.to_string()),
                    ..PostParams::default()
                },
                &next,
            )
            .await
            .map_err(|e| write_error("spec", &name, e))
    }

    async fn update_status(
        &self,
        snapshot: &TkeClusterConfig,
        patch: &StatusPatch,
    ) -> Result<TkeClusterConfig> {
        let namespace = namespace_of(snapshot)?;
        let name = snapshot.name_any();
        let status = patch.apply(snapshot.status.as_ref());

        // resourceVersion in a merge patch makes the write conditional
        let body = serde_json::json!({
            "metadata": { "resourceVersion": snapshot.resource_version() },
            "status": status,
        });

        self.configs(&namespace)
            .patch_status(
                &name,
                &PatchParams {
                    field_manager: Some(FIELD_MANAGER.to_string()),
                    ..PatchParams::default()
                },
                &Patch::Merge(&body),
            )
            .await
            .map_err(|e| write_error("status", &name, e))
    }
}

#[async_trait]
impl SecretStore for KubeStore {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_secret(&self, secret: &Secret) -> Result<CreateOutcome> {
        let namespace = secret
            .namespace()
            .ok_or_else(|| Error::MissingField("secret metadata.namespace".to_string()))?;
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);

        match api.create(&PostParams::default(), secret).await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(kube::Error::Api(e)) if e.code == 409 => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Read-modify-write
// ============================================================================

/// Run a read-modify-write `transaction` until it stops failing with a conflict.
///
/// The transaction must re-read the object on every call. Any error other than
/// a conflict, or a conflict on the last attempt, is returned unchanged.
pub async fn retry_on_conflict<T, F, Fut>(attempts: u32, transaction: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let policy = RetryConfig {
        max_attempts: attempts,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(10),
        backoff_multiplier: 1.0,
    };
    retry_with_backoff(&policy, "retry_on_conflict", Error::is_conflict, transaction).await
}
