//! Wiring of the lifecycle against the in-memory fakes.
//!
//! A [`Harness`] drives passes the way the controller does: each pass starts
//! from a fresh read of the stored object.

use std::sync::Arc;

use kube::ResourceExt;
use tke_operator::config::ReconcileSettings;
use tke_operator::controller::lifecycle::{Lifecycle, PassResult};
use tke_operator::controller::removal::RemovalOutcome;
use tke_operator::controller::requeue::Requeue;
use tke_operator::controller::store::ConfigStore;
use tke_operator::crd::{ClusterConfigPhase, TkeClusterConfig};
use tke_operator::retry::RetryConfig;

use crate::fake_cloud::{FakeCloud, FakeConnector};
use crate::fake_store::FakeStore;
use crate::fixtures::credential_secret;

pub struct Harness {
    pub store: Arc<FakeStore>,
    pub cloud: Arc<FakeCloud>,
    pub connector: Arc<FakeConnector>,
    pub lifecycle: Lifecycle,
    namespace: String,
    name: String,
}

/// Settings with removal retries that do not sleep.
pub fn test_settings() -> ReconcileSettings {
    ReconcileSettings {
        removal_backoff: RetryConfig::immediate(3),
        ..ReconcileSettings::default()
    }
}

impl Harness {
    /// Store `config` with the credential secret and wire a lifecycle around it.
    pub fn new(config: TkeClusterConfig) -> Self {
        Self::with_settings(config, test_settings())
    }

    pub fn with_settings(config: TkeClusterConfig, settings: ReconcileSettings) -> Self {
        let store = Arc::new(FakeStore::default());
        let cloud = FakeCloud::new();
        let connector = FakeConnector::new(cloud.clone());

        let namespace = config.namespace().unwrap_or_default();
        let name = config.name_any();
        store.insert(config);
        store.insert_secret(credential_secret());

        let lifecycle = Lifecycle::new(store.clone(), store.clone(), connector.clone(), settings);
        Self {
            store,
            cloud,
            connector,
            lifecycle,
            namespace,
            name,
        }
    }

    /// The stored object.
    pub fn config(&self) -> TkeClusterConfig {
        self.store.config(&self.namespace, &self.name)
    }

    pub fn phase(&self) -> ClusterConfigPhase {
        self.config().phase()
    }

    /// Run one pass against a fresh read.
    pub async fn pass(&self) -> PassResult {
        let latest = self.store.get(&self.namespace, &self.name).await.unwrap();
        self.lifecycle.on_change(latest).await
    }

    /// Run passes until one finishes without asking to run again immediately.
    ///
    /// Panics after `limit` passes.
    pub async fn settle(&self, limit: usize) -> PassResult {
        for _ in 0..limit {
            let result = self.pass().await;
            if !matches!(result.outcome, Ok(Requeue::Immediate)) {
                return result;
            }
        }
        panic!("did not settle within {} passes", limit);
    }

    pub async fn remove(&self) -> tke_operator::controller::error::Result<RemovalOutcome> {
        self.lifecycle.on_remove(&self.config()).await
    }
}
