//! In-memory Kubernetes object store for functional tests.
//!
//! Writes are conditional on the snapshot's resourceVersion, as the API server
//! does, and every successful write bumps it. Conflicts can be injected to
//! exercise the read-modify-write paths.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use tke_operator::controller::error::{Error, Result};
use tke_operator::controller::store::{
    ConfigStore, CreateOutcome, SecretStore, SpecPatch, StatusPatch,
};
use tke_operator::crd::{NodePoolDetail, TkeClusterConfig};

type Key = (String, String);

#[derive(Debug, Default)]
struct StoreState {
    configs: BTreeMap<Key, TkeClusterConfig>,
    secrets: BTreeMap<Key, Secret>,
    version: u64,
    spec_writes: usize,
    status_writes: usize,
    pending_conflicts: usize,
    insert_on_conflict: Option<(usize, NodePoolDetail)>,
}

/// TKEClusterConfig and Secret storage with optimistic concurrency.
#[derive(Debug, Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
}

fn key_of(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn not_found(name: &str) -> Error {
    Error::Kube(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("tkeclusterconfigs \"{}\" not found", name),
        reason: "NotFound".to_string(),
        code: 404,
    }))
}

impl FakeStore {
    /// Store `config` as a new object.
    pub fn insert(&self, mut config: TkeClusterConfig) {
        let mut state = self.state.lock().unwrap();
        state.version += 1;
        config.metadata.resource_version = Some(state.version.to_string());
        let key = key_of(&config.namespace().unwrap_or_default(), &config.name_any());
        state.configs.insert(key, config);
    }

    pub fn insert_secret(&self, secret: Secret) {
        let key = key_of(&secret.namespace().unwrap_or_default(), &secret.name_any());
        self.state.lock().unwrap().secrets.insert(key, secret);
    }

    pub fn config(&self, namespace: &str, name: &str) -> TkeClusterConfig {
        self.state
            .lock()
            .unwrap()
            .configs
            .get(&key_of(namespace, name))
            .cloned()
            .unwrap()
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(&key_of(namespace, name))
            .cloned()
    }

    /// Simulate another writer touching the object.
    pub fn touch(&self, namespace: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.version += 1;
        let version = state.version.to_string();
        if let Some(config) = state.configs.get_mut(&key_of(namespace, name)) {
            config.metadata.resource_version = Some(version);
        }
    }

    /// Fail the next `count` writes with a conflict.
    pub fn conflict_next(&self, count: usize) {
        self.state.lock().unwrap().pending_conflicts = count;
    }

    /// Fail the next write with a conflict caused by another writer
    /// inserting `pool` at `index` in `nodePoolList`.
    pub fn insert_pool_on_conflict(&self, index: usize, pool: NodePoolDetail) {
        let mut state = self.state.lock().unwrap();
        state.pending_conflicts = 1;
        state.insert_on_conflict = Some((index, pool));
    }

    pub fn spec_writes(&self) -> usize {
        self.state.lock().unwrap().spec_writes
    }

    pub fn status_writes(&self) -> usize {
        self.state.lock().unwrap().status_writes
    }

    fn write(
        &self,
        snapshot: &TkeClusterConfig,
        kind: &str,
        change: impl FnOnce(&mut TkeClusterConfig),
    ) -> Result<TkeClusterConfig> {
        let mut state = self.state.lock().unwrap();
        let name = snapshot.name_any();
        let key = key_of(&snapshot.namespace().unwrap_or_default(), &name);

        if state.pending_conflicts > 0 {
            state.pending_conflicts -= 1;
            if let Some((index, pool)) = state.insert_on_conflict.take() {
                state.version += 1;
                let version = state.version.to_string();
                if let Some(config) = state.configs.get_mut(&key) {
                    config.spec.node_pool_list.insert(index, pool);
                    config.metadata.resource_version = Some(version);
                }
            }
            return Err(Error::Conflict(format!("{} of {}", kind, name)));
        }

        let stored = state.configs.get(&key).cloned().ok_or_else(|| not_found(&name))?;
        if stored.metadata.resource_version != snapshot.metadata.resource_version {
            return Err(Error::Conflict(format!("{} of {}", kind, name)));
        }

        let mut next = stored;
        change(&mut next);
        state.version += 1;
        next.metadata.resource_version = Some(state.version.to_string());
        state.configs.insert(key, next.clone());
        Ok(next)
    }
}

#[async_trait]
impl ConfigStore for FakeStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<TkeClusterConfig> {
        self.state
            .lock()
            .unwrap()
            .configs
            .get(&key_of(namespace, name))
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    async fn update_spec(
        &self,
        snapshot: &TkeClusterConfig,
        patch: &SpecPatch,
    ) -> Result<TkeClusterConfig> {
        let updated = self.write(snapshot, "spec", |next| {
            next.spec = patch.apply(&snapshot.spec);
        })?;
        self.state.lock().unwrap().spec_writes += 1;
        Ok(updated)
    }

    async fn update_status(
        &self,
        snapshot: &TkeClusterConfig,
        patch: &StatusPatch,
    ) -> Result<TkeClusterConfig> {
        let updated = self.write(snapshot, "status", |next| {
            next.status = Some(patch.apply(snapshot.status.as_ref()));
        })?;
        self.state.lock().unwrap().status_writes += 1;
        Ok(updated)
    }
}

#[async_trait]
impl SecretStore for FakeStore {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        Ok(self.secret(namespace, name))
    }

    async fn create_secret(&self, secret: &Secret) -> Result<CreateOutcome> {
        let key = key_of(&secret.namespace().unwrap_or_default(), &secret.name_any());
        let mut state = self.state.lock().unwrap();
        if state.secrets.contains_key(&key) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        state.secrets.insert(key, secret.clone());
        Ok(CreateOutcome::Created)
    }
}
