//! tke-operator - reconciles TKEClusterConfig resources against Tencent Kubernetes Engine.
//!
//! This is the main entry point that:
//! - Parses flags and initializes structured logging
//! - Creates the Kubernetes client
//! - Optionally runs leader election
//! - Starts the controller and health server

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kube::Client;
use kube_leader_election::{LeaseLock, LeaseLockParams};
use tokio::signal;
use tracing::{error, info, warn};

use tke_operator::client::{CloudConnector, TencentConnector};
use tke_operator::config::OperatorConfig;
use tke_operator::health::{HealthState, run_health_server};
use tke_operator::run_controller;

/// Lease configuration
const LEASE_TTL_SECS: u64 = 15;
const LEASE_RENEW_INTERVAL_SECS: u64 = 5;

/// Grace period for in-flight reconciliations to complete during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = OperatorConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tke_operator=info".parse()?)
                .add_directive("kube=info".parse()?)
                .add_directive("kube_leader_election=info".parse()?),
        )
        .json()
        .init();

    info!(
        default_region = %config.default_region,
        requeue_interval_secs = config.requeue_interval_secs,
        namespace = ?config.namespace,
        leader_elect = config.leader_elect,
        "Starting tke-operator"
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let health_state = Arc::new(HealthState::new());

    // Probes should work even as non-leader
    let health_handle = {
        let health_state = health_state.clone();
        let port = config.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        })
    };

    let lease_renewal_handle = if config.leader_elect {
        Some(acquire_leadership(&client, &config).await)
    } else {
        None
    };

    let controller_handle = {
        let health_state = health_state.clone();
        let controller_client = client.clone();
        let connector: Arc<dyn CloudConnector> = Arc::new(TencentConnector::new(
            &config.tke_endpoint,
            &config.as_endpoint,
        ));
        let settings = config.reconcile_settings();
        let namespace = config.namespace.clone();
        tokio::spawn(async move {
            run_controller(
                controller_client,
                Some(health_state),
                connector,
                settings,
                namespace.as_deref(),
            )
            .await;
        })
    };

    tokio::select! {
        result = controller_handle => {
            if let Err(e) = result {
                error!("Controller task panicked: {}", e);
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        // Lease renewal only exits via process::exit() or panic
        result = async {
            match lease_renewal_handle {
                Some(handle) => handle.await,
                None => std::future::pending().await,
            }
        } => {
            if let Err(e) = result {
                error!("Lease renewal task panicked: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            health_state.set_ready(false).await;
            info!("Marked operator as not ready");

            info!(
                "Waiting {}s for in-flight reconciliations to complete...",
                SHUTDOWN_GRACE_PERIOD_SECS
            );
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;

            info!("Grace period complete, shutting down");
        }
    }

    info!("Operator stopped");
    Ok(())
}

/// Block until this instance holds the lease, then keep renewing it.
///
/// Losing the lease exits the process so Kubernetes restarts it into a new election.
async fn acquire_leadership(
    client: &Client,
    config: &OperatorConfig,
) -> tokio::task::JoinHandle<()> {
    let holder_id = std::env::var("POD_NAME").unwrap_or_else(|_| {
        warn!("POD_NAME not set, using hostname");
        hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    });

    info!(
        holder_id = %holder_id,
        namespace = %config.lock_namespace,
        lease_name = %config.lock_name,
        "Initializing leader election"
    );

    let lease_lock = LeaseLock::new(
        client.clone(),
        &config.lock_namespace,
        LeaseLockParams {
            holder_id,
            lease_name: config.lock_name.clone(),
            lease_ttl: Duration::from_secs(LEASE_TTL_SECS),
        },
    );

    info!("Waiting to acquire leadership...");
    loop {
        match lease_lock.try_acquire_or_renew().await {
            Ok(result) if result.acquired_lease => {
                info!("Acquired leadership");
                break;
            }
            Ok(_) => info!("Another instance is leader, waiting..."),
            Err(e) => warn!("Failed to acquire lease: {}, retrying...", e),
        }
        tokio::time::sleep(Duration::from_secs(LEASE_RENEW_INTERVAL_SECS)).await;
    }

    #[allow(clippy::exit)]
    let renewal = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(LEASE_RENEW_INTERVAL_SECS)).await;

            match lease_lock.try_acquire_or_renew().await {
                Ok(result) if result.acquired_lease => {}
                Ok(_) => {
                    error!("Lost leadership! Shutting down...");
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("Failed to renew lease: {}. Shutting down...", e);
                    std::process::exit(1);
                }
            }
        }
    });
    renewal
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Signal handler setup failures are fatal.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
