//! Removal of the upstream cluster when a config is deleted.

use tke_operator::controller::removal::RemovalOutcome;
use tke_operator::crd::ClusterConfigPhase;

use crate::fixtures::TkeClusterConfigBuilder;
use crate::{Call, Harness};

fn managed(phase: ClusterConfigPhase) -> Harness {
    let config = TkeClusterConfigBuilder::new("prod")
        .cluster_id("cls-1")
        .phase(phase)
        .build();
    let h = Harness::new(config.clone());
    h.cloud.seed_cluster("cls-1", &config.spec, "Running");
    h
}

/// Imported clusters outlive their config.
#[tokio::test]
async fn test_imported_cluster_is_kept() {
    let config = TkeClusterConfigBuilder::new("adopted")
        .imported()
        .cluster_id("cls-1")
        .phase(ClusterConfigPhase::Active)
        .build();
    let h = Harness::new(config.clone());
    h.cloud.seed_cluster("cls-1", &config.spec, "Running");

    assert_eq!(h.remove().await.unwrap(), RemovalOutcome::SkippedImported);
    assert!(h.cloud.calls().is_empty());
    assert!(h.cloud.cluster().is_some());
}

/// A config that never reached creating owns nothing upstream.
#[tokio::test]
async fn test_never_created_cluster_is_kept() {
    let h = managed(ClusterConfigPhase::NotCreated);

    assert_eq!(h.remove().await.unwrap(), RemovalOutcome::SkippedNotCreated);
    assert!(h.cloud.calls().is_empty());
    assert!(h.connector.connections().is_empty());
}

#[tokio::test]
async fn test_active_cluster_is_deleted() {
    let h = managed(ClusterConfigPhase::Active);

    let outcome = h.remove().await.unwrap();
    assert_eq!(outcome, RemovalOutcome::Deleted);
    assert!(outcome.attempted_delete());
    assert_eq!(h.cloud.calls(), vec![Call::DeleteCluster("cls-1".to_string())]);
    assert!(h.cloud.cluster().is_none());
}

/// Removing twice is safe; the second attempt finds nothing.
#[tokio::test]
async fn test_second_removal_sees_cluster_gone() {
    let h = managed(ClusterConfigPhase::Updating);

    assert_eq!(h.remove().await.unwrap(), RemovalOutcome::Deleted);
    assert_eq!(h.remove().await.unwrap(), RemovalOutcome::AlreadyGone);
}

/// Transient upstream errors are retried within the removal budget.
#[tokio::test]
async fn test_transient_delete_error_is_retried() {
    let h = managed(ClusterConfigPhase::Active);
    h.cloud.fail_next("DeleteCluster", "InternalError", "try again");

    assert_eq!(h.remove().await.unwrap(), RemovalOutcome::Deleted);
    assert_eq!(h.cloud.calls().len(), 2);
}

/// Errors that retrying cannot fix surface on the first attempt.
#[tokio::test]
async fn test_permanent_delete_error_is_not_retried() {
    let h = managed(ClusterConfigPhase::Active);
    h.cloud.fail_next(
        "DeleteCluster",
        "AuthFailure.SignatureFailure",
        "signature mismatch",
    );

    let err = h.remove().await.unwrap_err();
    assert!(err.to_string().contains("AuthFailure.SignatureFailure"));
    assert_eq!(h.cloud.calls().len(), 1);
    assert!(h.cloud.cluster().is_some());
}

/// A config without a region is removed through the default region.
#[tokio::test]
async fn test_removal_falls_back_to_default_region() {
    let config = TkeClusterConfigBuilder::new("prod")
        .cluster_id("cls-1")
        .region("")
        .phase(ClusterConfigPhase::Creating)
        .build();
    let h = Harness::new(config.clone());
    h.cloud.seed_cluster("cls-1", &config.spec, "Creating");

    assert_eq!(h.remove().await.unwrap(), RemovalOutcome::Deleted);
    assert_eq!(
        h.connector.connections(),
        vec![("AKIDexample".to_string(), "ap-guangzhou".to_string())]
    );
}

/// A deleting config is not reconciled forward.
#[tokio::test]
async fn test_deleting_config_skips_pass() {
    let mut config = TkeClusterConfigBuilder::new("prod").build();
    config.metadata.deletion_timestamp = Some(
        k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(k8s_openapi::chrono::Utc::now()),
    );
    let h = Harness::new(config.clone());

    let result = h.lifecycle.on_change(config).await;
    assert!(result.config.is_none());
    assert!(result.outcome.is_ok());
    assert!(h.cloud.calls().is_empty());
}
