//! Errors returned by the cloud API client.

use thiserror::Error;

/// Upstream error code for a cluster that does not exist.
pub const CLUSTER_NOT_FOUND: &str = "FailedOperation.ClusterNotFound";

/// Error type for cloud API operations
#[derive(Error, Debug)]
pub enum CloudError {
    /// The API answered with an error payload
    #[error("[TencentCloudSDKError] Code={code}, Message={message}, RequestId={request_id}")]
    Api {
        code: String,
        message: String,
        request_id: String,
    },

    /// The request never produced an answer
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The answer could not be decoded
    #[error("failed to decode {action} response: {source}")]
    Decode {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    /// A field required for correctness was absent
    #[error("missing required field {resource}.{field}")]
    MissingField {
        resource: &'static str,
        field: &'static str,
    },

    /// The answer carried no payload
    #[error("error while getting response for {0}")]
    EmptyResponse(String),

    /// A describe call returned no matching object
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// A request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl CloudError {
    /// Build an API error from its code and message.
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        CloudError::Api {
            code: code.into(),
            message: message.into(),
            request_id: String::new(),
        }
    }

    /// Upstream error code, if the API answered with one.
    pub fn code(&self) -> Option<&str> {
        match self {
            CloudError::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether the error means the cluster is already gone.
    pub fn is_cluster_not_found(&self) -> bool {
        match self {
            CloudError::Api { code, .. } => code == CLUSTER_NOT_FOUND,
            CloudError::NotFound { kind, .. } => *kind == "Cluster",
            _ => false,
        }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CloudError::Transport(_) | CloudError::EmptyResponse(_) => true,
            CloudError::Api { code, .. } => {
                code.starts_with("InternalError")
                    || code.starts_with("RequestLimitExceeded")
                    || code.starts_with("ResourceUnavailable")
                    || code.starts_with("FailedOperation")
            }
            CloudError::NotFound { .. } => true,
            CloudError::Decode { .. }
            | CloudError::MissingField { .. }
            | CloudError::InvalidRequest(_) => false,
        }
    }
}
