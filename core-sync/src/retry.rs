//! Retryable step-sequence executor.
//!
//! Runs an ordered list of named idempotent async steps as one unit. Any
//! failure retries the whole sequence from the beginning after a fixed
//! delay. Fixed rather than exponential: the steps are cheap checks plus
//! bulk I/O, and remote quota pressure is governed by the scheduler cadence.
//!
//! Before every step the executor re-checks the session and the pause flag;
//! authentication loss and pause both short-circuit all remaining retries.

use core_auth::SessionProvider;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Result, RetryClass, SyncError};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// One named, idempotent unit of a sync pass.
pub struct SyncStep {
    name: &'static str,
    run: Box<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>,
}

impl SyncStep {
    pub fn new<F>(name: &'static str, run: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        Self {
            name,
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Retry bounds for one executed sequence.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

pub struct RetryExecutor {
    sessions: Arc<dyn SessionProvider>,
    paused: Arc<AtomicBool>,
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        paused: Arc<AtomicBool>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            sessions,
            paused,
            policy,
        }
    }

    /// Run the full sequence, retrying on failure.
    ///
    /// `on_error` is invoked once per failed attempt with the error and the
    /// 1-based attempt number; it is not invoked for aborting errors, which
    /// are returned immediately.
    pub async fn execute<F>(&self, steps: &[SyncStep], mut on_error: F) -> Result<()>
    where
        F: FnMut(&SyncError, u32) + Send,
    {
        let mut attempt: u32 = 1;
        loop {
            match self.run_sequence(steps).await {
                Ok(()) => return Ok(()),
                Err(err) if err.retry_class() == RetryClass::Abort => {
                    debug!(error = %err, "Aborting retries");
                    return Err(err);
                }
                Err(err) => {
                    warn!(error = %err, attempt, "Sync attempt failed");
                    on_error(&err, attempt);
                    if attempt > self.policy.max_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
            }
        }
    }

    async fn run_sequence(&self, steps: &[SyncStep]) -> Result<()> {
        for step in steps {
            self.checkpoint().await?;
            debug!(step = step.name, "Running sync step");
            (step.run)().await?;
        }
        Ok(())
    }

    /// Session and pause check performed before every step.
    async fn checkpoint(&self) -> Result<()> {
        if self.paused.load(Ordering::SeqCst) {
            return Err(SyncError::Paused);
        }
        if self.sessions.current_session().await.is_none() {
            return Err(SyncError::NotAuthenticated);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use core_auth::{PrincipalId, Session};
    use std::sync::atomic::AtomicUsize;

    mockall::mock! {
        Sessions {}

        #[async_trait]
        impl SessionProvider for Sessions {
            async fn current_session(&self) -> Option<Session>;
        }
    }

    fn signed_in() -> Arc<MockSessions> {
        let mut sessions = MockSessions::new();
        sessions
            .expect_current_session()
            .returning(|| Some(Session::new(PrincipalId::new())));
        Arc::new(sessions)
    }

    fn executor(sessions: Arc<MockSessions>) -> RetryExecutor {
        RetryExecutor::new(
            sessions,
            Arc::new(AtomicBool::new(false)),
            RetryPolicy {
                max_retries: 3,
                retry_delay: Duration::from_millis(1),
            },
        )
    }

    fn flaky_step(failures: usize, calls: Arc<AtomicUsize>) -> SyncStep {
        SyncStep::new("flaky", move || {
            let calls = calls.clone();
            Box::pin(async move {
                if calls.fetch_add(1, Ordering::SeqCst) < failures {
                    Err(SyncError::Network("connection reset".into()))
                } else {
                    Ok(())
                }
            })
        })
    }

    #[tokio::test]
    async fn passes_on_first_attempt_without_retrying() {
        let calls = Arc::new(AtomicUsize::new(0));
        let steps = vec![flaky_step(0, calls.clone())];
        let mut errors = 0;

        executor(signed_in())
            .execute(&steps, |_, _| errors += 1)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(errors, 0);
    }

    #[tokio::test]
    async fn transient_failure_retries_the_whole_sequence() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let steps = vec![
            SyncStep::new("count", {
                let first = first.clone();
                move || {
                    let first = first.clone();
                    Box::pin(async move {
                        first.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                }
            }),
            flaky_step(2, second.clone()),
        ];

        executor(signed_in()).execute(&steps, |_, _| {}).await.unwrap();
        // Both earlier steps re-run on each retry.
        assert_eq!(first.load(Ordering::SeqCst), 3);
        assert_eq!(second.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_return_the_final_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let steps = vec![flaky_step(usize::MAX, calls.clone())];
        let mut reported = Vec::new();

        let err = executor(signed_in())
            .execute(&steps, |_, attempt| reported.push(attempt))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Network(_)));
        // Initial attempt plus three retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(reported, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn malformed_payload_aborts_instead_of_retrying() {
        let calls = Arc::new(AtomicUsize::new(0));
        let steps = vec![SyncStep::new("decode", {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(SyncError::DataCorruption("truncated page".into()))
                })
            }
        })];

        let err = executor(signed_in())
            .execute(&steps, |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::DataCorruption(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn auth_loss_short_circuits_all_retries() {
        let mut sessions = MockSessions::new();
        sessions.expect_current_session().times(1).returning(|| None);
        let calls = Arc::new(AtomicUsize::new(0));
        let steps = vec![flaky_step(0, calls.clone())];
        let mut errors = 0;

        let err = executor(Arc::new(sessions))
            .execute(&steps, |_, _| errors += 1)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::NotAuthenticated));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(errors, 0);
    }

    #[tokio::test]
    async fn sign_out_between_steps_stops_the_sequence() {
        let mut sessions = MockSessions::new();
        let mut remaining = 1;
        sessions.expect_current_session().returning(move || {
            if remaining > 0 {
                remaining -= 1;
                Some(Session::new(PrincipalId::new()))
            } else {
                None
            }
        });

        let ran = Arc::new(AtomicUsize::new(0));
        let steps = vec![flaky_step(0, ran.clone()), flaky_step(0, ran.clone())];

        let err = executor(Arc::new(sessions))
            .execute(&steps, |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::NotAuthenticated));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pause_flag_aborts_before_the_next_step() {
        let paused = Arc::new(AtomicBool::new(true));
        let executor = RetryExecutor::new(signed_in(), paused, RetryPolicy::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let steps = vec![flaky_step(0, calls.clone())];

        let err = executor.execute(&steps, |_, _| {}).await.unwrap_err();
        assert!(matches!(err, SyncError::Paused));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
