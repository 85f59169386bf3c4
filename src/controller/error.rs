//! Error types for the controller.
//!
//! Defines custom error types with classification for retry behavior.

use std::time::Duration;
use thiserror::Error;

use crate::client::CloudError;

/// Back-off for errors that will not clear without a spec or secret change.
pub const PERMANENT_ERROR_REQUEUE: Duration = Duration::from_secs(300);

/// Error type for controller operations
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Cloud API error, rendered exactly as the upstream reported it
    #[error("{0}")]
    Cloud(#[from] CloudError),

    /// Validation error in resource spec
    #[error("{0}")]
    Validation(String),

    /// The credential secret is missing or incomplete
    #[error("invalid tke credential: {0}")]
    Credential(String),

    /// Missing required field in resource
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Optimistic-concurrency write lost against another writer
    #[error("conflict writing {0}")]
    Conflict(String),

    /// The upstream kubeconfig could not be used
    #[error("invalid cluster kubeconfig: {0}")]
    Kubeconfig(String),

    /// The upstream cluster reported a failed creation
    #[error("{0}")]
    CreationFailed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Validation failure for an empty required field.
    pub fn required_field(field: &str, name: &str) -> Self {
        Error::Validation(format!(
            "field [{}] cannot be nil for cluster [{}]",
            field, name
        ))
    }

    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 404)
    }

    /// Check if this error is a lost optimistic-concurrency race
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Conflict(_) => true,
            Error::Kube(kube::Error::Api(e)) => e.code == 409,
            _ => false,
        }
    }

    /// Check if this error should be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube(e) => {
                // Retry on network errors, rate limiting, conflicts and server errors
                matches!(
                    e,
                    kube::Error::Api(api_err)
                        if api_err.code >= 500 || api_err.code == 429 || api_err.code == 409
                ) || matches!(e, kube::Error::Service(_))
            }
            Error::Cloud(e) => e.is_retryable(),
            Error::Conflict(_) | Error::CreationFailed(_) | Error::Kubeconfig(_) => true,
            Error::Validation(_) | Error::Credential(_) | Error::MissingField(_) => false,
            Error::Serialization(_) => false,
        }
    }

    /// Get the recommended requeue duration for this error
    pub fn requeue_after(&self, interval: Duration) -> Duration {
        if self.is_retryable() {
            interval
        } else {
            PERMANENT_ERROR_REQUEUE
        }
    }
}

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;
