//! # Core Auth Module
//!
//! Session identity for the sync engine. Sync passes only run while a
//! principal is signed in; the engine checks the current session before
//! each remote step and aborts quietly when it disappears.
//!
//! The [`SessionProvider`] trait is the seam the engine depends on; the
//! in-process [`SessionManager`] is the default implementation and emits
//! auth events on sign-in and sign-out.

pub mod error;
pub mod session;
pub mod types;

pub use error::{AuthError, Result};
pub use session::{SessionManager, SessionProvider};
pub use types::{PrincipalId, Session};
