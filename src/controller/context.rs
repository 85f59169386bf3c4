//! Shared context for the controller.
//!
//! Holds the Kubernetes client, the event reporter and the lifecycle that
//! runs each pass.

use std::sync::Arc;

use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::runtime::reflector::Store;
use kube::{Client, Resource};

use crate::controller::lifecycle::Lifecycle;
use crate::controller::store::FIELD_MANAGER;
use crate::crd::TkeClusterConfig;
use crate::health::HealthState;

/// Shared context for the controller
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Event reporter identity
    reporter: Reporter,
    /// Optional health state for metrics and readiness
    pub health_state: Option<Arc<HealthState>>,
    /// Phase handlers and removal workflow
    pub lifecycle: Arc<Lifecycle>,
    /// Reflector cache, used for per-phase gauges
    pub cache: Option<Store<TkeClusterConfig>>,
}

impl Context {
    pub fn new(
        client: Client,
        health_state: Option<Arc<HealthState>>,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        Self {
            client,
            reporter: Reporter {
                controller: FIELD_MANAGER.into(),
                instance: std::env::var("POD_NAME").ok(),
            },
            health_state,
            lifecycle,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Store<TkeClusterConfig>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn recorder(&self) -> Recorder {
        Recorder::new(self.client.clone(), self.reporter.clone())
    }

    async fn publish(
        &self,
        resource: &TkeClusterConfig,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let object_ref = resource.object_ref(&());
        if let Err(e) = self
            .recorder()
            .publish(
                &Event {
                    type_,
                    reason: reason.into(),
                    note,
                    action: action.into(),
                    secondary: None,
                },
                &object_ref,
            )
            .await
        {
            tracing::warn!(reason = %reason, error = %e, "Failed to publish event");
        }
    }

    /// Publish a normal event for a TKEClusterConfig
    pub async fn publish_normal_event(
        &self,
        resource: &TkeClusterConfig,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        self.publish(resource, EventType::Normal, reason, action, note)
            .await;
    }

    /// Publish a warning event for a TKEClusterConfig
    pub async fn publish_warning_event(
        &self,
        resource: &TkeClusterConfig,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        self.publish(resource, EventType::Warning, reason, action, note)
            .await;
    }
}
