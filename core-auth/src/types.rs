//! Identity types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::AuthError;

/// Unique identifier for a signed-in principal (the remote account whose
/// collections this device syncs against).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(pub Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, AuthError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| AuthError::InvalidPrincipal(e.to_string()))
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An active session: the principal plus the bearer token used for remote
/// API calls. The token is absent for providers that authenticate at the
/// transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub principal_id: PrincipalId,
    pub access_token: Option<String>,
}

impl Session {
    pub fn new(principal_id: PrincipalId) -> Self {
        Self {
            principal_id,
            access_token: None,
        }
    }

    pub fn with_token(principal_id: PrincipalId, token: impl Into<String>) -> Self {
        Self {
            principal_id,
            access_token: Some(token.into()),
        }
    }
}
