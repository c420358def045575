//! Corrupted-record sweeper.
//!
//! Removes local rows that violate the record invariants: an id that does
//! not parse as a UUID, or no identity-bearing content (name and address
//! both blank). Runs before upload so corruption is never propagated, and
//! again before the download merge. Local-only; never contacts the remote
//! store.

use core_records::{IdentityRow, RecordRepository};
use core_runtime::logging::redact_contact;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;

pub struct RecordSweeper {
    repository: Arc<dyn RecordRepository>,
}

impl RecordSweeper {
    pub fn new(repository: Arc<dyn RecordRepository>) -> Self {
        Self { repository }
    }

    /// Deletes every corrupt row and returns how many were removed.
    pub async fn sweep(&self) -> Result<usize> {
        let rows = self.repository.identity_rows().await?;
        let total = rows.len();

        let mut removed = 0usize;
        for row in rows.into_iter().filter(IdentityRow::is_corrupt) {
            warn!(
                record = %redact_contact(&row.name),
                "Removing corrupt record from local store"
            );
            if self.repository.delete_raw(&row.id).await? {
                removed += 1;
            }
        }

        debug!(scanned = total, removed, "Corruption sweep finished");
        Ok(removed)
    }
}
