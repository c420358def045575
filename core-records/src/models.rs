//! Domain model for lead records.

use crate::status::LeadStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use store_traits::RemoteDocument;
use uuid::Uuid;

/// Unique identifier for a lead record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Current unix timestamp in seconds.
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// A customer lead record as persisted in the local store.
///
/// Content fields are opaque to the sync engine except for the identity
/// invariant: at least one of `name` / `address` must be non-blank, or the
/// record is corrupt and subject to sweeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: RecordId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub notes: String,
    pub status: LeadStatus,
    pub amount: Option<f64>,
    /// Unix seconds; set at creation, immutable afterwards.
    pub created_at: i64,
    /// Unix seconds; bumped by the owning application on every content edit.
    pub local_modified_at: i64,
    /// Remote `dateModified` as last seen by the engine, if any.
    pub remote_modified_at: Option<i64>,
    /// Optional dates under the monotonic-presence merge rule.
    pub follow_up_date: Option<i64>,
    pub last_contact_date: Option<i64>,
}

impl LeadRecord {
    /// Create a fresh record with the given identity content.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        let now = now_timestamp();
        Self {
            id: RecordId::new(),
            name: name.into(),
            address: address.into(),
            phone: String::new(),
            email: String::new(),
            notes: String::new(),
            status: LeadStatus::default(),
            amount: None,
            created_at: now,
            local_modified_at: now,
            remote_modified_at: None,
            follow_up_date: None,
            last_contact_date: None,
        }
    }

    /// True when the record carries identity-bearing content.
    pub fn has_identity_content(&self) -> bool {
        !self.name.trim().is_empty() || !self.address.trim().is_empty()
    }

    /// Materialize a local record from a remote document.
    ///
    /// The caller decides the id (remote key when parseable, fresh
    /// otherwise); status strings are normalized on the way in and the
    /// document's `dateModified` becomes both the last-seen remote timestamp
    /// and the local modification time, so a just-downloaded record does not
    /// immediately look locally edited.
    pub fn from_remote(id: RecordId, doc: &RemoteDocument, now: i64) -> Self {
        Self {
            id,
            name: doc.name.clone().unwrap_or_default(),
            address: doc.address.clone().unwrap_or_default(),
            phone: doc.phone.clone().unwrap_or_default(),
            email: doc.email.clone().unwrap_or_default(),
            notes: doc.notes.clone().unwrap_or_default(),
            status: doc
                .status
                .as_deref()
                .map(LeadStatus::normalize)
                .unwrap_or_default(),
            amount: doc.amount,
            created_at: doc.date_created.unwrap_or(now),
            local_modified_at: doc.date_modified.unwrap_or(now),
            remote_modified_at: doc.date_modified,
            follow_up_date: doc.follow_up_date,
            last_contact_date: doc.last_contact_date,
        }
    }

    /// Build the upload document for this record.
    ///
    /// Optional fields that are locally absent are omitted rather than sent
    /// as null, so a merge upsert never erases a value another device wrote.
    pub fn to_remote_document(&self) -> RemoteDocument {
        RemoteDocument {
            key: self.id.to_string(),
            name: Some(self.name.clone()),
            address: Some(self.address.clone()),
            phone: Some(self.phone.clone()),
            email: Some(self.email.clone()),
            notes: Some(self.notes.clone()),
            status: Some(self.status.as_str().to_string()),
            amount: self.amount,
            date_created: Some(self.created_at),
            date_modified: Some(self.local_modified_at),
            follow_up_date: self.follow_up_date,
            last_contact_date: self.last_contact_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_has_identity_and_fresh_timestamps() {
        let record = LeadRecord::new("Jane Doe", "");
        assert!(record.has_identity_content());
        assert_eq!(record.created_at, record.local_modified_at);
        assert_eq!(record.status, LeadStatus::NotContacted);
    }

    #[test]
    fn blank_name_and_address_fail_identity_check() {
        let record = LeadRecord::new("  ", "");
        assert!(!record.has_identity_content());
    }

    #[test]
    fn from_remote_normalizes_status_and_adopts_timestamps() {
        let doc = RemoteDocument {
            key: "k".to_string(),
            name: Some("Jane".to_string()),
            status: Some("sold".to_string()),
            date_modified: Some(1_700_000_000),
            ..Default::default()
        };
        let record = LeadRecord::from_remote(RecordId::new(), &doc, 1_700_000_500);
        assert_eq!(record.status, LeadStatus::Converted);
        assert_eq!(record.local_modified_at, 1_700_000_000);
        assert_eq!(record.remote_modified_at, Some(1_700_000_000));
        // No dateCreated on the document: fall back to now.
        assert_eq!(record.created_at, 1_700_000_500);
    }

    #[test]
    fn upload_document_omits_absent_optional_dates() {
        let record = LeadRecord::new("Jane", "12 Elm St");
        let doc = record.to_remote_document();
        assert_eq!(doc.key, record.id.to_string());
        assert_eq!(doc.follow_up_date, None);
        assert_eq!(doc.date_modified, Some(record.local_modified_at));
    }
}
