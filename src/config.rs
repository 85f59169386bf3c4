//! Operator configuration.
//!
//! Every setting is a command-line flag with an environment variable fallback.
//! [`ReconcileSettings`] is the part handed to the reconciliation core.

use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::client::tencent::{AS_ENDPOINT, TKE_ENDPOINT};
use crate::retry::RetryConfig;

/// Region used when a resource leaves `spec.region` empty.
pub const DEFAULT_REGION: &str = "ap-guangzhou";

/// Command-line configuration for the operator process.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tke-operator",
    version,
    about = "Reconciles TKEClusterConfig resources against Tencent Kubernetes Engine"
)]
pub struct OperatorConfig {
    /// Region used when a resource does not name one
    #[arg(long, env = "TKE_DEFAULT_REGION", default_value = DEFAULT_REGION)]
    pub default_region: String,

    /// Delay before re-checking an in-flight upstream operation
    #[arg(long, env = "TKE_REQUEUE_INTERVAL_SECS", default_value_t = 30)]
    pub requeue_interval_secs: u64,

    /// Attempts at deleting the upstream cluster before giving up
    #[arg(long, env = "TKE_REMOVAL_MAX_ATTEMPTS", default_value_t = 12)]
    pub removal_max_attempts: u32,

    #[arg(long, env = "TKE_REMOVAL_INITIAL_DELAY_SECS", default_value_t = 2)]
    pub removal_initial_delay_secs: u64,

    #[arg(long, env = "TKE_REMOVAL_MAX_DELAY_SECS", default_value_t = 30)]
    pub removal_max_delay_secs: u64,

    /// Growth factor between removal attempts, at least 1
    #[arg(
        long,
        env = "TKE_REMOVAL_BACKOFF_MULTIPLIER",
        default_value_t = 2.0,
        value_parser = parse_backoff_multiplier
    )]
    pub removal_backoff_multiplier: f64,

    /// Attempts at a status read-modify-write that hits a conflict
    #[arg(long, env = "TKE_CONFLICT_RETRIES", default_value_t = 5)]
    pub conflict_retries: u32,

    /// Keep the instances of deleted node pools instead of terminating them
    #[arg(
        long,
        env = "TKE_KEEP_INSTANCES_ON_POOL_DELETE",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub keep_instances_on_pool_delete: bool,

    /// Only watch this namespace (cluster-wide when unset)
    #[arg(long, env = "TKE_WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Run Lease-based leader election before starting the controller
    #[arg(long, env = "TKE_LEADER_ELECT")]
    pub leader_elect: bool,

    #[arg(long, env = "TKE_LOCK_NAME", default_value = "tke-operator-pandaria-lock")]
    pub lock_name: String,

    #[arg(long, env = "TKE_LOCK_NAMESPACE", default_value = "cattle-system")]
    pub lock_namespace: String,

    /// Port for /healthz, /readyz and /metrics
    #[arg(long, env = "TKE_HEALTH_PORT", default_value_t = 8080)]
    pub health_port: u16,

    #[arg(long, env = "TKE_API_ENDPOINT", default_value = TKE_ENDPOINT)]
    pub tke_endpoint: String,

    #[arg(long, env = "TKE_AS_API_ENDPOINT", default_value = AS_ENDPOINT)]
    pub as_endpoint: String,
}

impl OperatorConfig {
    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            default_region: self.default_region.clone(),
            requeue_interval: Duration::from_secs(self.requeue_interval_secs),
            removal_backoff: RetryConfig {
                max_attempts: self.removal_max_attempts,
                initial_delay: Duration::from_secs(self.removal_initial_delay_secs),
                max_delay: Duration::from_secs(self.removal_max_delay_secs),
                backoff_multiplier: self.removal_backoff_multiplier,
            },
            conflict_retries: self.conflict_retries,
            keep_instances_on_pool_delete: self.keep_instances_on_pool_delete,
        }
    }
}

fn parse_backoff_multiplier(s: &str) -> std::result::Result<f64, String> {
    match s.parse::<f64>() {
        Ok(multiplier) if multiplier.is_finite() && multiplier >= 1.0 => Ok(multiplier),
        _ => Err(format!(
            "invalid backoff multiplier '{}', must be a finite number of at least 1",
            s
        )),
    }
}

/// Settings the reconciliation core depends on.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconcileSettings {
    pub default_region: String,
    /// Fixed interval for delayed requeues
    pub requeue_interval: Duration,
    /// Backoff for deleting the upstream cluster
    pub removal_backoff: RetryConfig,
    /// Attempts for conflicting status writes
    pub conflict_retries: u32,
    pub keep_instances_on_pool_delete: bool,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            default_region: DEFAULT_REGION.to_string(),
            requeue_interval: Duration::from_secs(30),
            removal_backoff: RetryConfig::default(),
            conflict_retries: 5,
            keep_instances_on_pool_delete: true,
        }
    }
}
