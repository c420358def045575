//! # Sync Engine Module
//!
//! Reconciles locally-mutated lead records against a remote keyed-document
//! store without a central coordinator:
//!
//! - [`sweeper`]: removes records that fail the identity/content invariants
//! - [`conflict`]: whole-record last-writer-wins with a five-minute local
//!   edit grace window
//! - [`retry`]: bounded fixed-delay retry over an ordered step sequence
//! - [`deletion`]: immediate local delete, best-effort remote propagation
//! - [`engine`]: the orchestrator; status state machine, pass phases and
//!   the periodic scheduler
//!
//! Delivery guarantee is at-least-once with idempotent upserts keyed by
//! record id; there is no field-level merge beyond the monotonic-presence
//! rule for optional dates.

pub mod conflict;
pub mod deletion;
pub mod engine;
pub mod error;
pub mod retry;
pub mod status;
pub mod sweeper;

pub use conflict::{apply_remote, materialize, resolve, Resolution, GRACE_WINDOW_SECS};
pub use deletion::DeletionPropagator;
pub use engine::{
    PassStats, SyncConfig, SyncEngine, SyncEngineDeps, AUTO_SYNC_ENABLED_KEY, LAST_SYNC_DATE_KEY,
    SYNC_INTERVAL_KEY,
};
pub use error::{Result, RetryClass, SyncError};
pub use retry::{RetryExecutor, RetryPolicy, SyncStep};
pub use status::{SyncInterval, SyncStatus};
pub use sweeper::RecordSweeper;
