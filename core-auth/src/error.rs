use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No active session")]
    NotAuthenticated,

    #[error("Invalid principal id: {0}")]
    InvalidPrincipal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
