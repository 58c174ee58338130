//! Error types for cmsrelease-gateway.

use thiserror::Error;

/// Failures talking to the content backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The backend answered with a non-success HTTP status.
    #[error("{method} {path} failed with status {status}: {message}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        message: String,
    },

    /// Connection, DNS, TLS or timeout failure before any response.
    #[error("transport error on {method} {path}: {message}")]
    Transport {
        method: &'static str,
        path: String,
        message: String,
    },

    /// A response body did not match the expected shape.
    #[error("unexpected response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Used by the in-memory gateway for scripted failures.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::Status { status: 404, .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GatewayError::Status { status: 429, .. })
    }
}
