//! Error types for the records crate.

use thiserror::Error;

/// Result type alias for record operations.
pub type Result<T> = std::result::Result<T, RecordsError>;

/// Errors raised by the local record store.
#[derive(Debug, Error)]
pub enum RecordsError {
    /// Underlying SQLite failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed on startup.
    #[error("Migration error: {0}")]
    Migration(String),
}
