//! Remote keyed-document collection trait and wire types.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single document in a remote keyed collection.
///
/// Every field except `key` is optional: a document written by an older
/// client may lack fields this version manages, and on upload absent fields
/// are omitted from the payload entirely so a merge upsert never clobbers
/// remote data the engine does not own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    /// Document key; equal to the string form of the record id.
    pub key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Raw status string; may carry legacy vocabulary that the reader must
    /// normalize before comparison or storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    /// Unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<i64>,

    /// Unix seconds; drives last-writer-wins arbitration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_contact_date: Option<i64>,
}

impl RemoteDocument {
    /// True when the document carries at least one identity-bearing content
    /// field (non-blank name or address).
    pub fn has_identity_content(&self) -> bool {
        let non_blank = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        non_blank(&self.name) || non_blank(&self.address)
    }
}

/// A keyed-document remote store scoped under an authenticated principal.
///
/// Implementations must provide idempotent upserts: writing the same document
/// twice under the same key is equivalent to writing it once, which is what
/// lets the engine guarantee at-least-once delivery.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// List one page of documents in `collection` for `principal`.
    ///
    /// Returns the page plus an opaque continuation cursor; `None` means the
    /// listing is complete.
    async fn list(
        &self,
        principal: &str,
        collection: &str,
        cursor: Option<String>,
    ) -> Result<(Vec<RemoteDocument>, Option<String>)>;

    /// Merge-write a document under its key.
    ///
    /// Fields absent from `document` must be left untouched on the remote
    /// side (partial update, not full replace).
    async fn upsert_merge(
        &self,
        principal: &str,
        collection: &str,
        document: &RemoteDocument,
    ) -> Result<()>;

    /// Delete the document with `key`, if it exists.
    async fn delete(&self, principal: &str, collection: &str, key: &str) -> Result<()>;
}
