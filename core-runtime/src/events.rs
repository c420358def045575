//! # Event Bus System
//!
//! Event-driven state notification for the sync core, built on
//! `tokio::sync::broadcast`. Modules emit typed events; any number of
//! subscribers (UI layers, tests, loggers) consume them independently.
//!
//! ```text
//! ┌─────────────┐     emit      ┌───────────┐
//! │ Auth Module ├──────────────>│           │
//! └─────────────┘               │ EventBus  │     subscribe    ┌────────────┐
//! ┌─────────────┐     emit      │ (broadcast├─────────────────>│ Subscriber │
//! │ Sync Engine ├──────────────>│  channel) │                  └────────────┘
//! └─────────────┘               └───────────┘
//! ```
//!
//! Subscribers should treat `RecvError::Lagged` as non-fatal (events were
//! missed, the stream continues) and `RecvError::Closed` as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authentication-related events
    Auth(AuthEvent),
    /// Sync engine lifecycle events
    Sync(SyncEvent),
    /// Record-level events outside a sync pass
    Record(RecordEvent),
}

impl CoreEvent {
    /// Coarse severity for log routing and UI badges.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Record(RecordEvent::RemoteDeleteFailed { .. }) => EventSeverity::Warning,
            _ => EventSeverity::Info,
        }
    }
}

/// Severity classification for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
}

/// Authentication lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    /// A principal signed in.
    SignedIn { principal_id: String },
    /// The principal signed out; sync quiesces silently.
    SignedOut { principal_id: String },
}

/// Sync engine lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A sync pass started.
    Started,
    /// A sync pass finished successfully.
    Completed {
        records_uploaded: u64,
        records_created: u64,
        records_overwritten: u64,
        records_skipped: u64,
        records_corrupt: u64,
    },
    /// A sync pass exhausted its retries.
    Failed { message: String },
    /// The caller paused the engine; in-flight work winds down.
    Paused,
}

impl SyncEvent {
    pub fn description(&self) -> &'static str {
        match self {
            SyncEvent::Started => "Sync started",
            SyncEvent::Completed { .. } => "Sync completed successfully",
            SyncEvent::Failed { .. } => "Sync failed",
            SyncEvent::Paused => "Sync paused",
        }
    }
}

/// Record events emitted outside of a sync pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RecordEvent {
    /// A record was deleted locally; remote propagation is best-effort.
    Deleted { record_id: String },
    /// The asynchronous remote delete for a record failed and was abandoned.
    RemoteDeleteFailed { record_id: String, message: String },
}

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cheap to clone; all clones share the same channel. Events are cloned per
/// subscriber, so payloads are kept lightweight.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers that fall behind by more than `capacity` events receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none. Callers that do not care whether anyone is
    /// listening should `.ok()` the result.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new independent subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
