//! Error types for runtime infrastructure.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up runtime infrastructure.
#[derive(Debug, Error)]
pub enum Error {
    /// Logging was initialized more than once or the filter was invalid.
    #[error("Logging initialization failed: {0}")]
    Logging(String),

    /// Configuration value was rejected.
    #[error("Invalid configuration: {field}: {message}")]
    InvalidConfig { field: String, message: String },
}
