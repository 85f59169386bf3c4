//! Tencent Cloud client for the TKE operator.
//!
//! The reconciler talks to the cloud through the [`CloudApi`] trait; the
//! production implementation is [`TencentCloudClient`], a signed JSON client for
//! the TKE and Auto Scaling APIs.

pub mod cloud_api;
pub mod error;
pub mod parsing;
pub mod requests;
pub mod signing;
pub mod tencent;
pub mod types;

pub use cloud_api::{CloudApi, CloudConnector, Credential};
pub use error::CloudError;
pub use tencent::{TencentCloudClient, TencentConnector};
pub use types::{
    AutoScalingGroup, ClusterStatus, EndpointStatus, InstanceState, LaunchConfiguration,
    NodePoolLifeState, RemoteCluster, RemoteInstance, RemoteNodePool,
};
