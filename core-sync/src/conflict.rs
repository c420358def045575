//! Per-record conflict arbitration for the download phase.
//!
//! Whole-record last-writer-wins, gated by a grace window: a local record
//! edited within the last five minutes is preserved unless the remote copy
//! is strictly newer. The window exists because an application edit and a
//! background pass can race; without it, a pass started moments after a
//! local edit could overwrite that edit with a stale remote snapshot.
//!
//! Known limitation: simultaneous edits to different fields on two devices
//! resolve whole-record, not field-level. The only field-level exception is
//! the monotonic-presence rule for the optional dates.

use core_records::{LeadRecord, RecordId};
use store_traits::RemoteDocument;

/// Local edits younger than this are protected from stale remote overwrites.
pub const GRACE_WINDOW_SECS: i64 = 5 * 60;

/// Outcome of arbitrating one remote document against the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No local record with this id; materialize one from the document.
    CreateLocal,
    /// Remote wins; replace the local record's content.
    OverwriteLocal,
    /// Local wins; the document is ignored.
    SkipPreserveLocal,
}

/// Decide what to do with `remote` given the current local state.
///
/// Missing timestamps default to the distant past, so a document that never
/// carried `dateModified` loses to any locally-timestamped record inside
/// the grace window and ties are broken in favor of local.
pub fn resolve(local: Option<&LeadRecord>, remote: &RemoteDocument, now: i64) -> Resolution {
    let local = match local {
        None => return Resolution::CreateLocal,
        Some(local) => local,
    };

    let remote_modified = remote.date_modified.unwrap_or(0);
    let local_modified = local.local_modified_at;
    let grace_deadline = now - GRACE_WINDOW_SECS;

    if remote_modified > local_modified || local_modified < grace_deadline {
        Resolution::OverwriteLocal
    } else {
        Resolution::SkipPreserveLocal
    }
}

/// Materialize an [`Resolution::OverwriteLocal`] outcome.
///
/// The remote content replaces the local record wholesale, except that a
/// present local optional date survives an absent remote one. Absence is
/// not informative; only an explicitly present remote value replaces a
/// local value.
pub fn apply_remote(local: &LeadRecord, remote: &RemoteDocument, now: i64) -> LeadRecord {
    let mut merged = LeadRecord::from_remote(local.id, remote, now);
    merged.created_at = local.created_at.min(merged.created_at);
    merged.follow_up_date = remote.follow_up_date.or(local.follow_up_date);
    merged.last_contact_date = remote.last_contact_date.or(local.last_contact_date);
    merged
}

/// Materialize a [`Resolution::CreateLocal`] outcome.
///
/// The remote key becomes the record id when it parses; an unparseable key
/// on a document that still carries identity content gets a fresh id rather
/// than being dropped. Returns `None` only for documents with neither a
/// usable key nor identity-bearing content.
pub fn materialize(remote: &RemoteDocument, now: i64) -> Option<LeadRecord> {
    let id = match RecordId::from_string(&remote.key) {
        Ok(id) => id,
        Err(_) if remote.has_identity_content() => RecordId::new(),
        Err(_) => return None,
    };
    Some(LeadRecord::from_remote(id, remote, now))
}
