//! Session provider trait and the in-process session manager.

use async_trait::async_trait;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use tokio::sync::RwLock;
use tracing::info;

use crate::types::Session;

/// Source of the current session, checked by the engine before each remote
/// step. Implementations must be cheap to call; the engine polls this
/// between retry attempts.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The active session, or `None` when signed out.
    async fn current_session(&self) -> Option<Session>;
}

/// In-process session holder.
///
/// Sign-in and sign-out are driven by the host application; the manager
/// only tracks the result and broadcasts the transition so the engine can
/// react (e.g. stop the scheduler on sign-out).
pub struct SessionManager {
    session: RwLock<Option<Session>>,
    events: EventBus,
}

impl SessionManager {
    pub fn new(events: EventBus) -> Self {
        Self {
            session: RwLock::new(None),
            events,
        }
    }

    pub async fn sign_in(&self, session: Session) {
        let principal_id = session.principal_id;
        *self.session.write().await = Some(session);
        info!(principal = %principal_id, "Session established");
        let _ = self.events.emit(CoreEvent::Auth(AuthEvent::SignedIn {
            principal_id: principal_id.to_string(),
        }));
    }

    pub async fn sign_out(&self) {
        let previous = self.session.write().await.take();
        if let Some(session) = previous {
            info!(principal = %session.principal_id, "Session cleared");
            let _ = self.events.emit(CoreEvent::Auth(AuthEvent::SignedOut {
                principal_id: session.principal_id.to_string(),
            }));
        }
    }

    pub async fn is_signed_in(&self) -> bool {
        self.session.read().await.is_some()
    }
}

#[async_trait]
impl SessionProvider for SessionManager {
    async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrincipalId;

    #[tokio::test]
    async fn sign_in_then_out_clears_session() {
        let manager = SessionManager::new(EventBus::default());
        assert!(manager.current_session().await.is_none());

        let session = Session::new(PrincipalId::new());
        manager.sign_in(session.clone()).await;
        assert_eq!(manager.current_session().await, Some(session));
        assert!(manager.is_signed_in().await);

        manager.sign_out().await;
        assert!(manager.current_session().await.is_none());
    }

    #[tokio::test]
    async fn auth_transitions_are_broadcast() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let manager = SessionManager::new(bus);

        let principal = PrincipalId::new();
        manager.sign_in(Session::new(principal)).await;
        manager.sign_out().await;

        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SignedIn {
                principal_id: principal.to_string()
            })
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SignedOut {
                principal_id: principal.to_string()
            })
        );
    }

    #[tokio::test]
    async fn sign_out_when_signed_out_is_silent() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let manager = SessionManager::new(bus);

        manager.sign_out().await;
        assert!(rx.try_recv().is_err());
    }
}
