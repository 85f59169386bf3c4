//! Custom Resource Definitions for the TKE operator.

mod tke_cluster_config;

pub use tke_cluster_config::*;
