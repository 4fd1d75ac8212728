//! Backend error types.

use thiserror::Error;

/// Errors returned by compute directory and load balancer backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend refused the request.
    #[error("request rejected (status={status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The service catalog has no endpoint for the region.
    #[error("no {service} endpoint for region {region}")]
    NoEndpoint { service: String, region: String },
}

impl BackendError {
    /// Returns true if the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if credentials were rejected.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
