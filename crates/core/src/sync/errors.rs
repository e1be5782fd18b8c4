//! Errors raised by a synchronization run

use carindex_domain::CarIndexError;
use thiserror::Error;

/// Failures that end a run early. Everything else is counted in the summary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("a catalog sync is already running")]
    AlreadyRunning,

    #[error("failed to enumerate catalog years: {0}")]
    Enumeration(#[source] CarIndexError),

    #[error("catalog authentication failed: {0}")]
    Auth(#[source] CarIndexError),

    #[error("catalog store failed: {0}")]
    Store(#[source] CarIndexError),
}

impl From<SyncError> for CarIndexError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::AlreadyRunning => CarIndexError::InvalidInput(err.to_string()),
            SyncError::Enumeration(source) | SyncError::Auth(source) | SyncError::Store(source) => {
                source
            }
        }
    }
}
