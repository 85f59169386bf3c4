// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Unit tests for tke-operator.
//!
//! These tests run without a Kubernetes cluster and test individual
//! components in isolation.

mod crd_tests {
    use tke_operator::crd::{ClusterConfigPhase, TkeClusterConfig, TkeClusterConfigSpec};

    #[test]
    fn test_phase_display() {
        assert_eq!(ClusterConfigPhase::NotCreated.to_string(), "NotCreated");
        assert_eq!(ClusterConfigPhase::Importing.to_string(), "importing");
        assert_eq!(ClusterConfigPhase::Creating.to_string(), "creating");
        assert_eq!(ClusterConfigPhase::Active.to_string(), "active");
        assert_eq!(ClusterConfigPhase::Updating.to_string(), "updating");
    }

    #[test]
    fn test_phase_default() {
        assert_eq!(ClusterConfigPhase::default(), ClusterConfigPhase::NotCreated);
    }

    #[test]
    fn test_empty_phase_reads_as_not_created() {
        let phase: ClusterConfigPhase = serde_json::from_str("\"\"").unwrap();
        assert_eq!(phase, ClusterConfigPhase::NotCreated);
    }

    #[test]
    fn test_missing_status_reads_as_not_created() {
        let config = TkeClusterConfig::new("prod", TkeClusterConfigSpec::default());
        assert_eq!(config.phase(), ClusterConfigPhase::NotCreated);
        assert_eq!(config.failure_message(), "");
        assert!(!config.extranet_endpoint());
    }

    #[test]
    fn test_spec_wire_names() {
        let config: TkeClusterConfig = serde_json::from_value(serde_json::json!({
            "apiVersion": "tke.pandaria.io/v1",
            "kind": "TKEClusterConfig",
            "metadata": {"name": "prod", "namespace": "cattle-global-data"},
            "spec": {
                "tkeCredentialSecret": "cattle-global-data:cc-abc",
                "region": "ap-shanghai",
                "clusterId": "cls-1",
                "clusterCIDRSettings": {"clusterCIDR": "172.16.0.0/16"},
                "nodePoolList": [{
                    "nodePoolId": "np-1",
                    "autoScalingGroupPara": {"desiredCapacity": 3},
                    "launchConfigurePara": {"instanceType": "S5.MEDIUM4"},
                    "labels": ["team=infra"]
                }]
            },
            "status": {"phase": "active", "failureMessage": "boom"}
        }))
        .unwrap();

        assert_eq!(config.spec.region, "ap-shanghai");
        assert_eq!(
            config.spec.cluster_cidr_settings.unwrap().cluster_cidr,
            "172.16.0.0/16"
        );
        let pool = &config.spec.node_pool_list[0];
        assert_eq!(pool.auto_scaling_group_para.desired_capacity, 3);
        assert_eq!(pool.launch_configure_para.instance_type, "S5.MEDIUM4");
        assert_eq!(config.status.as_ref().unwrap().phase, ClusterConfigPhase::Active);
        assert_eq!(config.status.unwrap().failure_message, "boom");
    }
}

mod state_machine_tests {
    use tke_operator::controller::state_machine::{
        ClusterEvent, ClusterStateMachine, PhaseHandler, handler_for,
    };
    use tke_operator::crd::ClusterConfigPhase;

    #[test]
    fn test_valid_events_from_not_created() {
        let sm = ClusterStateMachine::new();
        let events = sm.valid_events(ClusterConfigPhase::NotCreated);
        assert_eq!(events.len(), 2);
        assert!(events.contains(&ClusterEvent::ImportRequested));
        assert!(events.contains(&ClusterEvent::CreationRequested));
    }

    #[test]
    fn test_failures_only_move_active_clusters() {
        let sm = ClusterStateMachine::new();
        assert!(sm.can_transition(ClusterConfigPhase::Active, ClusterEvent::FailureRecorded));
        assert!(sm.can_transition(ClusterConfigPhase::Updating, ClusterEvent::FailureRecorded));
        assert!(!sm.can_transition(ClusterConfigPhase::NotCreated, ClusterEvent::FailureRecorded));
        assert!(!sm.can_transition(ClusterConfigPhase::Creating, ClusterEvent::FailureRecorded));
        assert!(!sm.can_transition(ClusterConfigPhase::Importing, ClusterEvent::FailureRecorded));
    }

    #[test]
    fn test_nothing_returns_to_not_created() {
        let sm = ClusterStateMachine::new();
        for phase in ClusterConfigPhase::ALL {
            for event in sm.valid_events(phase) {
                assert!(sm.can_transition(phase, event));
            }
        }
        for phase in [
            ClusterConfigPhase::Importing,
            ClusterConfigPhase::Creating,
            ClusterConfigPhase::Active,
            ClusterConfigPhase::Updating,
        ] {
            assert!(!sm.can_transition(phase, ClusterEvent::CreationRequested));
            assert!(!sm.can_transition(phase, ClusterEvent::ImportRequested));
        }
    }

    #[test]
    fn test_handler_dispatch() {
        assert_eq!(handler_for(ClusterConfigPhase::NotCreated), PhaseHandler::Create);
        assert_eq!(handler_for(ClusterConfigPhase::Importing), PhaseHandler::Import);
        assert_eq!(handler_for(ClusterConfigPhase::Creating), PhaseHandler::AwaitCreation);
        assert_eq!(handler_for(ClusterConfigPhase::Active), PhaseHandler::CheckAndUpdate);
        assert_eq!(handler_for(ClusterConfigPhase::Updating), PhaseHandler::CheckAndUpdate);
    }
}

mod error_tests {
    use std::time::Duration;
    use tke_operator::client::CloudError;
    use tke_operator::controller::error::{Error, PERMANENT_ERROR_REQUEUE};

    #[test]
    fn test_error_is_retryable() {
        assert!(Error::from(CloudError::api("RequestLimitExceeded", "slow down")).is_retryable());
        assert!(Error::from(CloudError::api("FailedOperation.ClusterState", "busy")).is_retryable());
        assert!(!Error::from(CloudError::api("AuthFailure", "bad key")).is_retryable());
        assert!(!Error::Validation("x".to_string()).is_retryable());
        assert!(!Error::Credential("x".to_string()).is_retryable());
    }

    #[test]
    fn test_permanent_errors_back_off_longer() {
        let interval = Duration::from_secs(30);
        assert_eq!(
            Error::Validation("x".to_string()).requeue_after(interval),
            PERMANENT_ERROR_REQUEUE
        );
        assert_eq!(
            Error::from(CloudError::api("InternalError", "x")).requeue_after(interval),
            interval
        );
    }

    #[test]
    fn test_cluster_not_found_code() {
        let err = CloudError::api("FailedOperation.ClusterNotFound", "gone");
        assert!(err.is_cluster_not_found());
        assert_eq!(err.code(), Some("FailedOperation.ClusterNotFound"));
        assert!(!CloudError::api("InternalError", "x").is_cluster_not_found());
    }
}

mod parsing_tests {
    use tke_operator::client::parsing::{
        labels_to_strings, same_pairs, split_pair, strings_to_labels, strings_to_tag_specifications,
        tag_specifications_to_strings,
    };

    #[test]
    fn test_split_on_first_equals() {
        assert_eq!(split_pair("a=b=c"), Some(("a", "b=c")));
        assert_eq!(split_pair("a="), Some(("a", "")));
        assert_eq!(split_pair("novalue"), None);
    }

    #[test]
    fn test_entries_without_equals_are_dropped() {
        let labels = strings_to_labels(&["a=1".to_string(), "broken".to_string()]);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels_to_strings(&labels), vec!["a=1".to_string()]);
    }

    #[test]
    fn test_cluster_tags_round_trip() {
        let tags = vec!["env=prod".to_string(), "owner=ops".to_string()];
        let specs = strings_to_tag_specifications(&tags);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].resource_type.as_deref(), Some("cluster"));
        assert_eq!(tag_specifications_to_strings(&specs), tags);
        assert!(strings_to_tag_specifications(&[]).is_empty());
    }

    #[test]
    fn test_pairs_compare_unordered() {
        let a = vec!["x=1".to_string(), "y=2".to_string()];
        let b = vec!["y=2".to_string(), "x=1".to_string()];
        assert!(same_pairs(&a, &b));
        assert!(!same_pairs(&a, &a[..1]));
    }
}

mod config_tests {
    use clap::Parser;
    use std::time::Duration;
    use tke_operator::config::{DEFAULT_REGION, OperatorConfig, ReconcileSettings};

    #[test]
    fn test_defaults() {
        let config = OperatorConfig::try_parse_from(["tke-operator"]).unwrap();
        let settings = config.reconcile_settings();
        assert_eq!(settings.default_region, DEFAULT_REGION);
        assert_eq!(settings.requeue_interval, Duration::from_secs(30));
        assert_eq!(settings.removal_backoff.max_attempts, 12);
        assert!(settings.keep_instances_on_pool_delete);
        assert_eq!(config.lock_name, "tke-operator-pandaria-lock");
        assert!(!config.leader_elect);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = OperatorConfig::try_parse_from([
            "tke-operator",
            "--default-region",
            "ap-beijing",
            "--requeue-interval-secs",
            "10",
            "--keep-instances-on-pool-delete",
            "false",
            "--namespace",
            "tke",
        ])
        .unwrap();
        let settings = config.reconcile_settings();
        assert_eq!(settings.default_region, "ap-beijing");
        assert_eq!(settings.requeue_interval, Duration::from_secs(10));
        assert!(!settings.keep_instances_on_pool_delete);
        assert_eq!(config.namespace.as_deref(), Some("tke"));
    }

    #[test]
    fn test_settings_default_matches_flags() {
        let defaults = ReconcileSettings::default();
        let parsed = OperatorConfig::try_parse_from(["tke-operator"])
            .unwrap()
            .reconcile_settings();
        assert_eq!(defaults.requeue_interval, parsed.requeue_interval);
        assert_eq!(defaults.conflict_retries, parsed.conflict_retries);
    }
}

mod ca_secret_tests {
    use tke_operator::controller::ca_secret::parse_kubeconfig;

    #[test]
    fn test_endpoint_kept_verbatim() {
        let raw = r#"
apiVersion: v1
kind: Config
clusters:
- name: c
  cluster:
    server: https://1.2.3.4:443/
    certificate-authority-data: Y2E=
"#;
        let access = parse_kubeconfig(raw).unwrap();
        assert_eq!(access.endpoint, "https://1.2.3.4:443/");
        assert_eq!(access.ca, "Y2E=");
    }

    #[test]
    fn test_missing_ca_is_rejected() {
        let raw = r#"
apiVersion: v1
kind: Config
clusters:
- name: c
  cluster:
    server: https://1.2.3.4
"#;
        let err = parse_kubeconfig(raw).unwrap_err();
        assert!(err.to_string().contains("no CA data"));
    }
}
