//! Directory error types
//!
//! Every failed write carries the target address and the payload that was
//! attempted, so the fatal report at the top of the run can show both.

use thiserror::Error;

/// Error that can occur while talking to the directory store.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Failed to reach or bind to the directory server.
    #[error("directory connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Bind was rejected with invalid credentials (LDAP result code 49).
    #[error("directory bind failed: invalid credentials for {bind_dn}")]
    AuthenticationFailed { bind_dn: String },

    /// A search could not be executed.
    #[error("search under '{base}' with filter {filter} failed: {message}")]
    SearchFailed {
        base: String,
        filter: String,
        message: String,
    },

    /// The directory rejected an add, modify or delete.
    #[error("{operation} of '{dn}' rejected: {message} (payload: {payload})")]
    WriteRejected {
        operation: WriteOperation,
        dn: String,
        payload: String,
        message: String,
    },

    /// Invalid address or attribute data built by the caller.
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// The kind of write that was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    Add,
    Modify,
    Delete,
}

impl std::fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteOperation::Add => write!(f, "add"),
            WriteOperation::Modify => write!(f, "modify"),
            WriteOperation::Delete => write!(f, "delete"),
        }
    }
}

impl DirectoryError {
    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::ConnectionFailed { .. } => "DIRECTORY_CONNECTION_FAILED",
            DirectoryError::AuthenticationFailed { .. } => "DIRECTORY_AUTH_FAILED",
            DirectoryError::SearchFailed { .. } => "DIRECTORY_SEARCH_FAILED",
            DirectoryError::WriteRejected { .. } => "DIRECTORY_WRITE_REJECTED",
            DirectoryError::InvalidData { .. } => "INVALID_DATA",
            DirectoryError::InvalidConfiguration { .. } => "INVALID_CONFIG",
        }
    }

    /// Whether this error happened before any entry was touched.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            DirectoryError::ConnectionFailed { .. }
                | DirectoryError::AuthenticationFailed { .. }
                | DirectoryError::InvalidConfiguration { .. }
        )
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a search failed error.
    pub fn search_failed(
        base: impl Into<String>,
        filter: impl std::fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        DirectoryError::SearchFailed {
            base: base.into(),
            filter: filter.to_string(),
            message: message.into(),
        }
    }

    /// Create a rejected write error.
    pub fn write_rejected(
        operation: WriteOperation,
        dn: impl Into<String>,
        payload: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        DirectoryError::WriteRejected {
            operation,
            dn: dn.into(),
            payload: payload.into(),
            message: message.into(),
        }
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
