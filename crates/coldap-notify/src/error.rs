//! Notification error types

use thiserror::Error;

/// Errors from opening or using a notification transport.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The transport could not be opened.
    #[error("Connection to {target} failed: {cause}")]
    ConnectionFailed { target: String, cause: String },

    /// A message could not be handed to the transport.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Message exceeds what the transport can carry.
    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

impl NotifyError {
    /// Create a connection failed error.
    pub fn connection_failed(target: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        NotifyError::ConnectionFailed {
            target: target.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type for notification operations.
pub type NotifyResult<T> = Result<T, NotifyError>;
