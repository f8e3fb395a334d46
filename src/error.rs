//! Error types for asset generation workflows.

use std::time::Duration;

/// Errors that can occur while generating or assembling assets.
#[derive(Debug, thiserror::Error)]
pub enum ReelError {
    /// Missing or invalid configuration (project id, credential file).
    /// Raised before any network activity.
    #[error("configuration error: {0}")]
    Config(String),

    /// Token exchange or credential parsing failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Service returned success but no usable artifact.
    #[error("generation returned no result: {0}")]
    EmptyResult(String),

    /// A submitted operation completed with an explicit failure payload.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// A long-running operation did not finish within the poll budget.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The external concatenation tool exited non-zero.
    #[error("concatenation failed: {0}")]
    Concatenation(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving an artifact).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReelError {
    /// Returns true if this error is likely transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_)
        )
    }

    /// Returns the suggested retry delay, if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Timeout(_) => Some(Duration::from_secs(1)),
            Self::Network(_) => Some(Duration::from_secs(2)),
            _ => None,
        }
    }
}

/// Result type alias for workflow operations.
pub type Result<T> = std::result::Result<T, ReelError>;
