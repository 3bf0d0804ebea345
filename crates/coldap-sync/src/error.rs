//! Sync error types
//!
//! Every error ends the run. The orchestrator returns it to the caller, which
//! is the single place that decides to abort.

use coldap_directory::DirectoryError;
use coldap_notify::NotifyError;
use coldap_source::SourceError;
use thiserror::Error;

/// Error that aborts a reconciliation run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Directory failure, including rejected writes.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Source API failure.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Notification channel could not be opened.
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// More than one entry matched an identity that must be unique.
    #[error("{count} entries match {filter} under '{base}', expected at most one")]
    NotUnique {
        base: String,
        filter: String,
        count: usize,
    },
}

impl SyncError {
    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::Directory(e) => e.error_code(),
            SyncError::Source(e) => e.error_code(),
            SyncError::Notify(_) => "NOTIFY_UNAVAILABLE",
            SyncError::NotUnique { .. } => "NOT_UNIQUE",
        }
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
