//! Local-first record deletion with best-effort remote propagation.
//!
//! The local row is removed synchronously so callers observe the deletion
//! immediately; the paired remote delete runs on a spawned task and is
//! abandoned on failure. A failed remote delete cannot resurrect the
//! record: the upload phase iterates the local store's current contents
//! and will simply never send it again.

use core_auth::SessionProvider;
use core_records::{RecordId, RecordRepository};
use core_runtime::events::{CoreEvent, EventBus, RecordEvent};
use std::sync::Arc;
use store_traits::RemoteCollection;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};

pub struct DeletionPropagator {
    repository: Arc<dyn RecordRepository>,
    remote: Arc<dyn RemoteCollection>,
    sessions: Arc<dyn SessionProvider>,
    collection: String,
    events: EventBus,
}

impl DeletionPropagator {
    pub fn new(
        repository: Arc<dyn RecordRepository>,
        remote: Arc<dyn RemoteCollection>,
        sessions: Arc<dyn SessionProvider>,
        collection: impl Into<String>,
        events: EventBus,
    ) -> Self {
        Self {
            repository,
            remote,
            sessions,
            collection: collection.into(),
            events,
        }
    }

    /// Delete one record: locally now, remotely in the background.
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        if !self.repository.delete(id).await? {
            return Err(SyncError::Database(format!("no record with id {id}")));
        }
        debug!(record_id = %id, "Record deleted locally");
        self.events
            .emit(CoreEvent::Record(RecordEvent::Deleted {
                record_id: id.to_string(),
            }))
            .ok();

        // Unauthenticated deletes stay local; the account's remote copy is
        // out of this device's reach anyway.
        let Some(session) = self.sessions.current_session().await else {
            return Ok(());
        };

        let remote = self.remote.clone();
        let events = self.events.clone();
        let collection = self.collection.clone();
        let principal = session.principal_id.to_string();
        let key = id.to_string();
        tokio::spawn(async move {
            if let Err(err) = remote.delete(&principal, &collection, &key).await {
                warn!(record_id = %key, error = %err, "Remote delete failed, giving up");
                events
                    .emit(CoreEvent::Record(RecordEvent::RemoteDeleteFailed {
                        record_id: key,
                        message: err.to_string(),
                    }))
                    .ok();
            }
        });

        Ok(())
    }

    /// Delete a batch of records; partial remote failure is tolerated and
    /// does not roll back any local deletion.
    pub async fn delete_batch(&self, ids: &[RecordId]) -> Result<()> {
        for id in ids {
            self.delete(id).await?;
        }
        Ok(())
    }
}
