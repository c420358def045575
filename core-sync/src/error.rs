//! Sync error taxonomy and retry classification.

use core_records::RecordsError;
use store_traits::StoreError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised during a sync pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The session disappeared. Ends the pass quietly; never shown as a
    /// failure because it is the normal sign-out transition.
    #[error("No authenticated session")]
    NotAuthenticated,

    /// Transient remote failure; the executor retries the pass.
    #[error("Network error: {0}")]
    Network(String),

    /// A payload failed a data invariant. Per-record cases are handled
    /// inline during the download merge; one that reaches the executor is a
    /// malformed page and retrying cannot fix it.
    #[error("Data corruption: {0}")]
    DataCorruption(String),

    /// Local store failure.
    #[error("Database error: {0}")]
    Database(String),

    /// The caller paused the engine; remaining steps are abandoned.
    #[error("Sync paused")]
    Paused,

    /// An interval string outside the supported presets.
    #[error("Invalid sync interval: {0}")]
    InvalidInterval(String),
}

/// What the executor should do with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Retry the whole step sequence after the configured delay.
    Retry,
    /// Stop immediately; further attempts cannot succeed.
    Abort,
}

impl SyncError {
    pub fn retry_class(&self) -> RetryClass {
        match self {
            SyncError::NotAuthenticated
            | SyncError::Paused
            | SyncError::InvalidInterval(_)
            | SyncError::DataCorruption(_) => RetryClass::Abort,
            SyncError::Network(_) | SyncError::Database(_) => RetryClass::Retry,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        if err.is_auth_loss() {
            return SyncError::NotAuthenticated;
        }
        match err {
            StoreError::Network(_) | StoreError::Remote { .. } => {
                SyncError::Network(err.to_string())
            }
            StoreError::Serialization(m) => SyncError::DataCorruption(m),
            StoreError::Settings(m) => SyncError::Database(m),
            StoreError::Unauthorized(_) => SyncError::NotAuthenticated,
        }
    }
}

impl From<RecordsError> for SyncError {
    fn from(err: RecordsError) -> Self {
        SyncError::Database(err.to_string())
    }
}
