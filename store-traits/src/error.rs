//! Error types shared by store implementations.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by remote-collection and settings-store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Remote endpoint rejected the request with an HTTP status.
    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Transport-level failure (connection refused, timeout, DNS, ...).
    #[error("Network error: {0}")]
    Network(String),

    /// The caller's credentials were missing or rejected.
    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    /// Payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backing key-value storage failed.
    #[error("Settings storage error: {0}")]
    Settings(String),
}

impl StoreError {
    /// Remote error from status plus message.
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// True when the failure means the session is gone.
    pub fn is_auth_loss(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
            || matches!(self, Self::Remote { status, .. } if *status == 401 || *status == 403)
    }
}
