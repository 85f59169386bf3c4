//! tke-operator library crate
//!
//! Reconciles `TKEClusterConfig` resources against Tencent Kubernetes Engine.
//! Exports the controller, CRD definitions, the cloud client and configuration.

pub mod client;
pub mod config;
pub mod controller;
pub mod crd;
pub mod health;
pub mod retry;

pub use health::HealthState;

use std::sync::Arc;

use futures::{Stream, StreamExt};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::{Controller, WatchStreamExt, predicates, reflector, watcher};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use client::CloudConnector;
use config::ReconcileSettings;
use controller::cluster_reconciler::{error_policy, reconcile};
use controller::context::Context;
use controller::lifecycle::Lifecycle;
use controller::store::KubeStore;
use crd::TkeClusterConfig;

/// Create namespaced or cluster-wide API based on scope
pub fn scoped_api<T>(client: Client, namespace: Option<&str>) -> Api<T>
where
    T: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <T as Resource>::DynamicType: Default,
    T: Clone + DeserializeOwned + std::fmt::Debug,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

fn default_watcher_config() -> WatcherConfig {
    WatcherConfig::default().any_semantic()
}

/// Create a reflector-backed stream that drops status-only updates.
///
/// Returns the reflector store and the filtered stream.
fn create_filtered_stream<K>(
    api: Api<K>,
    watcher_config: WatcherConfig,
) -> (
    reflector::Store<K>,
    impl Stream<Item = Result<K, watcher::Error>>,
)
where
    K: Resource + Clone + DeserializeOwned + std::fmt::Debug + Send + 'static,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    let (reader, writer) = reflector::store();
    let stream = reflector(writer, watcher(api, watcher_config))
        .default_backoff()
        .applied_objects()
        .predicate_filter(predicates::generation);
    (reader, stream)
}

/// Run the TKEClusterConfig controller.
///
/// When `namespace` is `Some(ns)`, only watches resources in that namespace.
/// When `namespace` is `None`, watches resources cluster-wide.
pub async fn run_controller(
    client: Client,
    health_state: Option<Arc<HealthState>>,
    connector: Arc<dyn CloudConnector>,
    settings: ReconcileSettings,
    namespace: Option<&str>,
) {
    let scope_msg = namespace.unwrap_or("cluster-wide");
    info!(
        "Starting controller for TKEClusterConfig resources (scope: {})",
        scope_msg
    );

    if let Some(ref state) = health_state {
        state.set_ready(true).await;
    }

    let store = Arc::new(KubeStore::new(client.clone()));
    let lifecycle = Lifecycle::new(store.clone(), store, connector, settings)
        .with_health(health_state.clone());

    let configs: Api<TkeClusterConfig> = scoped_api(client.clone(), namespace);
    let (reader, resource_stream) = create_filtered_stream(configs, default_watcher_config());

    let ctx = Arc::new(
        Context::new(client, health_state, Arc::new(lifecycle)).with_cache(reader.clone()),
    );

    Controller::for_stream(resource_stream, reader)
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    debug!("Reconciled: {}", obj.name);
                }
                Err(e) => {
                    let is_not_found = match &e {
                        kube::runtime::controller::Error::ObjectNotFound(_) => true,
                        kube::runtime::controller::Error::ReconcilerFailed(err, _) => {
                            err.is_not_found()
                        }
                        _ => false,
                    };
                    if is_not_found {
                        debug!("Object no longer exists (likely deleted): {:?}", e);
                    } else {
                        error!("Reconciliation error: {:?}", e);
                    }
                }
            }
        })
        .await;

    info!("Controller stream ended");
}
