//! Source API error types

use thiserror::Error;

/// Error that can occur while fetching from the source API.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The health endpoint did not report `UP`.
    #[error("source is not healthy: status '{status}'")]
    Unhealthy { status: String },

    /// Credentials were rejected (401/403).
    #[error("source rejected credentials: {0}")]
    AuthError(String),

    /// Resource not found (404).
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("source error (HTTP {status}): {detail}")]
    Status { status: u16, detail: String },

    /// Response body could not be decoded.
    #[error("failed to parse response: {0}")]
    ParseError(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SourceError {
    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            SourceError::Http(_) => "SOURCE_UNREACHABLE",
            SourceError::Unhealthy { .. } => "SOURCE_UNHEALTHY",
            SourceError::AuthError(_) => "SOURCE_AUTH_FAILED",
            SourceError::NotFound(_) => "SOURCE_NOT_FOUND",
            SourceError::Status { .. } => "SOURCE_HTTP_ERROR",
            SourceError::ParseError(_) => "SOURCE_PARSE_ERROR",
            SourceError::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;
