//! Full sync pass scenarios against an in-memory remote collection and an
//! in-memory SQLite store.

use async_trait::async_trait;
use core_auth::{PrincipalId, Session, SessionManager};
use core_records::models::now_timestamp;
use core_records::{
    create_test_pool, LeadRecord, LeadStatus, RecordId, RecordRepository, SqliteRecordRepository,
    ARCHIVE_COLLECTION, PRIMARY_COLLECTION,
};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_sync::{RetryPolicy, SyncConfig, SyncEngine, SyncEngineDeps, SyncStatus};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use store_traits::{RemoteCollection, RemoteDocument, StoreError};
use tokio::sync::{Mutex, Notify};
use tokio::time::sleep;

/// In-memory keyed-document store with real pagination and merge-upsert
/// semantics.
struct FakeRemote {
    collections: Mutex<HashMap<String, BTreeMap<String, RemoteDocument>>>,
    page_size: usize,
    /// When set, every `list` call blocks until notified.
    gate: Option<Arc<Notify>>,
    /// When set, every `upsert_merge` call blocks until notified.
    upsert_gate: Option<Arc<Notify>>,
    upsert_calls: AtomicUsize,
}

impl FakeRemote {
    fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            page_size: 100,
            gate: None,
            upsert_gate: None,
            upsert_calls: AtomicUsize::new(0),
        }
    }

    fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::new()
        }
    }

    fn with_gate(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    fn with_upsert_gate(gate: Arc<Notify>) -> Self {
        Self {
            upsert_gate: Some(gate),
            ..Self::new()
        }
    }

    async fn seed(&self, collection: &str, doc: RemoteDocument) {
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(doc.key.clone(), doc);
    }

    async fn documents(&self, collection: &str) -> Vec<RemoteDocument> {
        self.collections
            .lock()
            .await
            .get(collection)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    fn merge(existing: &mut RemoteDocument, incoming: &RemoteDocument) {
        macro_rules! take_present {
            ($($field:ident),+ $(,)?) => {$(
                if incoming.$field.is_some() {
                    existing.$field = incoming.$field.clone();
                }
            )+};
        }
        take_present!(
            name,
            address,
            phone,
            email,
            notes,
            status,
            amount,
            date_created,
            date_modified,
            follow_up_date,
            last_contact_date,
        );
    }
}

#[async_trait]
impl RemoteCollection for FakeRemote {
    async fn list(
        &self,
        _principal: &str,
        collection: &str,
        cursor: Option<String>,
    ) -> store_traits::Result<(Vec<RemoteDocument>, Option<String>)> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let collections = self.collections.lock().await;
        let docs: Vec<RemoteDocument> = collections
            .get(collection)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();

        let offset: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let page: Vec<RemoteDocument> =
            docs.iter().skip(offset).take(self.page_size).cloned().collect();
        let next = if offset + page.len() < docs.len() {
            Some((offset + page.len()).to_string())
        } else {
            None
        };
        Ok((page, next))
    }

    async fn upsert_merge(
        &self,
        _principal: &str,
        collection: &str,
        document: &RemoteDocument,
    ) -> store_traits::Result<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.upsert_gate {
            gate.notified().await;
        }
        let mut collections = self.collections.lock().await;
        let entry = collections
            .entry(collection.to_string())
            .or_default()
            .entry(document.key.clone())
            .or_insert_with(|| RemoteDocument {
                key: document.key.clone(),
                ..Default::default()
            });
        Self::merge(entry, document);
        Ok(())
    }

    async fn delete(
        &self,
        _principal: &str,
        collection: &str,
        key: &str,
    ) -> store_traits::Result<()> {
        if let Some(map) = self.collections.lock().await.get_mut(collection) {
            map.remove(key);
        }
        Ok(())
    }
}

/// Remote whose listing always fails the same way.
struct FailingRemote {
    error: fn() -> StoreError,
}

#[async_trait]
impl RemoteCollection for FailingRemote {
    async fn list(
        &self,
        _principal: &str,
        _collection: &str,
        _cursor: Option<String>,
    ) -> store_traits::Result<(Vec<RemoteDocument>, Option<String>)> {
        Err((self.error)())
    }

    async fn upsert_merge(
        &self,
        _principal: &str,
        _collection: &str,
        _document: &RemoteDocument,
    ) -> store_traits::Result<()> {
        Ok(())
    }

    async fn delete(
        &self,
        _principal: &str,
        _collection: &str,
        _key: &str,
    ) -> store_traits::Result<()> {
        Ok(())
    }
}

struct Harness {
    engine: Arc<SyncEngine>,
    repo: Arc<SqliteRecordRepository>,
    sessions: Arc<SessionManager>,
    events: EventBus,
}

async fn harness(remote: Arc<dyn RemoteCollection>) -> Harness {
    harness_with_archive(remote, false).await
}

async fn harness_with_archive(remote: Arc<dyn RemoteCollection>, archive: bool) -> Harness {
    let pool = create_test_pool().await.unwrap();
    let repo = Arc::new(SqliteRecordRepository::new(pool.clone(), PRIMARY_COLLECTION));
    let events = EventBus::default();
    let sessions = Arc::new(SessionManager::new(events.clone()));
    sessions.sign_in(Session::new(PrincipalId::new())).await;

    let engine = SyncEngine::new(
        SyncEngineDeps {
            records: repo.clone(),
            archive: archive.then(|| {
                Arc::new(SqliteRecordRepository::new(pool, ARCHIVE_COLLECTION))
                    as Arc<dyn RecordRepository>
            }),
            remote,
            sessions: sessions.clone(),
            settings: Arc::new(store_traits::MemorySettingsStore::new()),
            events: events.clone(),
        },
        SyncConfig {
            max_concurrent_upserts: 2,
            retry: RetryPolicy {
                max_retries: 1,
                retry_delay: Duration::from_millis(1),
            },
        },
    );
    Harness {
        engine,
        repo,
        sessions,
        events,
    }
}

fn remote_doc(key: &str, name: &str, status: &str, modified: i64) -> RemoteDocument {
    RemoteDocument {
        key: key.to_string(),
        name: Some(name.to_string()),
        status: Some(status.to_string()),
        date_modified: Some(modified),
        ..Default::default()
    }
}

#[tokio::test]
async fn empty_local_store_adopts_remote_document() {
    let remote = Arc::new(FakeRemote::new());
    let id = RecordId::new();
    remote
        .seed(
            PRIMARY_COLLECTION,
            remote_doc(&id.to_string(), "Jane", "prospect", now_timestamp()),
        )
        .await;

    let h = harness(remote).await;
    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Completed);

    let records = h.repo.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
    assert_eq!(records[0].name, "Jane");
    assert_eq!(records[0].status, LeadStatus::Interested);
}

#[tokio::test]
async fn recent_local_edit_survives_stale_remote() {
    let now = now_timestamp();
    let mut local = LeadRecord::new("Jane Doe", "");
    local.local_modified_at = now;

    let remote = Arc::new(FakeRemote::new());
    remote
        .seed(
            PRIMARY_COLLECTION,
            remote_doc(&local.id.to_string(), "Jane", "interested", now - 3600),
        )
        .await;

    let h = harness(remote).await;
    h.repo.save(&local).await.unwrap();
    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Completed);

    let after = h.repo.find_by_id(&local.id).await.unwrap().unwrap();
    assert_eq!(after.name, "Jane Doe");
}

#[tokio::test]
async fn newer_remote_overwrites_untouched_local_record() {
    let now = now_timestamp();
    let mut local = LeadRecord::new("Jane", "12 Elm St");
    local.local_modified_at = now - 3600;
    // Already synced once; a clean record is not re-uploaded.
    local.remote_modified_at = Some(now - 3600);

    let remote = Arc::new(FakeRemote::new());
    remote
        .seed(
            PRIMARY_COLLECTION,
            remote_doc(&local.id.to_string(), "Jane Q", "sold", now - 60),
        )
        .await;

    let h = harness(remote).await;
    h.repo.save(&local).await.unwrap();
    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Completed);

    let after = h.repo.find_by_id(&local.id).await.unwrap().unwrap();
    assert_eq!(after.name, "Jane Q");
    assert_eq!(after.status, LeadStatus::Converted);
}

#[tokio::test]
async fn absent_remote_optional_date_never_erases_local_value() {
    let now = now_timestamp();
    let mut local = LeadRecord::new("Jane", "");
    local.local_modified_at = now - 3600;
    local.remote_modified_at = Some(now - 3600);
    local.follow_up_date = Some(now + 86_400);

    let remote = Arc::new(FakeRemote::new());
    remote
        .seed(
            PRIMARY_COLLECTION,
            remote_doc(&local.id.to_string(), "Jane Q", "interested", now - 60),
        )
        .await;

    let h = harness(remote).await;
    h.repo.save(&local).await.unwrap();
    h.engine.run_sync_pass().await;

    let after = h.repo.find_by_id(&local.id).await.unwrap().unwrap();
    assert_eq!(after.name, "Jane Q");
    assert_eq!(after.follow_up_date, Some(now + 86_400));
}

#[tokio::test]
async fn upload_pushes_local_records_before_download() {
    let remote = Arc::new(FakeRemote::new());
    let h = harness(remote.clone()).await;

    let record = LeadRecord::new("Jane", "12 Elm St");
    h.repo.save(&record).await.unwrap();
    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Completed);

    let docs = remote.documents(PRIMARY_COLLECTION).await;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].key, record.id.to_string());
    assert_eq!(docs[0].name.as_deref(), Some("Jane"));
    assert_eq!(docs[0].date_modified, Some(record.local_modified_at));

    // The record we just uploaded comes back unchanged on download.
    assert_eq!(h.repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn edit_landing_during_upload_survives_and_stays_dirty() {
    let gate = Arc::new(Notify::new());
    let remote = Arc::new(FakeRemote::with_upsert_gate(gate.clone()));
    let h = harness(remote.clone()).await;

    let record = LeadRecord::new("Jane", "");
    h.repo.save(&record).await.unwrap();

    let engine = h.engine.clone();
    let pass = tokio::spawn(async move { engine.run_sync_pass().await });

    // Wait for the pass to take its snapshot and block inside the upsert.
    for _ in 0..100 {
        if remote.upsert_calls.load(Ordering::SeqCst) == 1 {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(remote.upsert_calls.load(Ordering::SeqCst), 1);

    // An application edit commits while the upload is in flight.
    let mut edited = record.clone();
    edited.name = "Jane Edited".to_string();
    edited.local_modified_at += 60;
    h.repo.save(&edited).await.unwrap();

    gate.notify_one();
    assert_eq!(pass.await.unwrap(), SyncStatus::Completed);

    let after = h.repo.find_by_id(&record.id).await.unwrap().unwrap();
    assert_eq!(after.name, "Jane Edited");
    assert_eq!(after.local_modified_at, edited.local_modified_at);
    // The stale watermark matched nothing, so the edit uploads next pass.
    assert_eq!(after.remote_modified_at, None);
}

#[tokio::test]
async fn corrupt_rows_are_swept_and_never_uploaded() {
    let remote = Arc::new(FakeRemote::new());
    let h = harness(remote.clone()).await;
    let mut rx = h.events.subscribe();

    h.repo.save(&LeadRecord::new("Jane", "")).await.unwrap();
    // A record with no identity-bearing content is corrupt by definition.
    h.repo.save(&LeadRecord::new("  ", "")).await.unwrap();

    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Completed);
    assert_eq!(h.repo.count().await.unwrap(), 1);
    assert_eq!(remote.documents(PRIMARY_COLLECTION).await.len(), 1);

    let mut corrupt_count = None;
    while let Ok(event) = rx.try_recv() {
        if let CoreEvent::Sync(SyncEvent::Completed { records_corrupt, .. }) = event {
            corrupt_count = Some(records_corrupt);
        }
    }
    assert_eq!(corrupt_count, Some(1));
}

#[tokio::test]
async fn download_paginates_through_the_whole_collection() {
    let remote = Arc::new(FakeRemote::with_page_size(2));
    let now = now_timestamp();
    for i in 0..5 {
        remote
            .seed(
                PRIMARY_COLLECTION,
                remote_doc(&RecordId::new().to_string(), &format!("Lead {i}"), "new", now),
            )
            .await;
    }

    let h = harness(remote).await;
    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Completed);
    assert_eq!(h.repo.count().await.unwrap(), 5);
}

#[tokio::test]
async fn unparseable_remote_key_with_content_is_adopted_under_fresh_id() {
    let remote = Arc::new(FakeRemote::new());
    let now = now_timestamp();
    remote
        .seed(PRIMARY_COLLECTION, remote_doc("legacy-key-17", "Jane", "new", now))
        .await;
    remote
        .seed(
            PRIMARY_COLLECTION,
            RemoteDocument {
                key: "legacy-key-18".to_string(),
                notes: Some("no identity here".to_string()),
                date_modified: Some(now),
                ..Default::default()
            },
        )
        .await;

    let h = harness(remote).await;
    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Completed);

    // Identity-bearing content is kept under a fresh id; the contentless
    // document is skipped.
    let records = h.repo.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Jane");
}

#[tokio::test]
async fn overlapping_start_sync_merges_into_inflight_pass() {
    let gate = Arc::new(Notify::new());
    let remote = Arc::new(FakeRemote::with_gate(gate.clone()));
    let h = harness(remote).await;

    let engine = h.engine.clone();
    let first = tokio::spawn(async move { engine.run_sync_pass().await });

    // Wait for the pass to block inside the download phase.
    for _ in 0..100 {
        if h.engine.status().await == SyncStatus::Syncing {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(h.engine.status().await, SyncStatus::Syncing);

    // The redundant call neither starts a second pass nor moves status.
    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Syncing);
    assert_eq!(h.engine.status().await, SyncStatus::Syncing);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), SyncStatus::Completed);
}

#[tokio::test]
async fn auth_loss_mid_pass_ends_idle_not_failed() {
    let remote = Arc::new(FailingRemote {
        error: || StoreError::remote(401, "token revoked"),
    });
    let h = harness(remote).await;
    let mut rx = h.events.subscribe();

    h.repo.save(&LeadRecord::new("Jane", "")).await.unwrap();
    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Idle);
    assert_eq!(h.engine.status().await, SyncStatus::Idle);
    assert!(h.engine.last_sync_date().await.is_none());

    while let Ok(event) = rx.try_recv() {
        assert!(!matches!(event, CoreEvent::Sync(SyncEvent::Failed { .. })));
    }
}

#[tokio::test]
async fn network_failure_exhausts_retries_and_surfaces_failed() {
    let remote = Arc::new(FailingRemote {
        error: || StoreError::Network("connection refused".to_string()),
    });
    let h = harness(remote).await;
    let mut rx = h.events.subscribe();

    let status = h.engine.run_sync_pass().await;
    assert!(matches!(status, SyncStatus::Failed { .. }));

    let mut failed = false;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, CoreEvent::Sync(SyncEvent::Failed { .. })) {
            failed = true;
        }
    }
    assert!(failed);
}

#[tokio::test]
async fn signed_out_engine_stays_idle_without_events() {
    let remote = Arc::new(FakeRemote::new());
    let h = harness(remote).await;
    h.sessions.sign_out().await;
    let mut rx = h.events.subscribe();

    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Idle);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn completed_status_survives_a_signed_out_pass() {
    let remote = Arc::new(FakeRemote::new());
    let h = harness(remote).await;
    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Completed);

    h.sessions.sign_out().await;
    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Completed);
    assert_eq!(h.engine.status().await, SyncStatus::Completed);
}

#[tokio::test]
async fn pause_then_resume_round_trip() {
    let remote = Arc::new(FakeRemote::new());
    let h = harness(remote).await;

    h.engine.pause_sync().await;
    assert_eq!(h.engine.status().await, SyncStatus::Idle);

    // While paused, a pass aborts at the first checkpoint and stays out of
    // the failed state.
    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Idle);

    h.engine.resume_sync().await;
    for _ in 0..100 {
        if h.engine.status().await == SyncStatus::Completed {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("resume never completed a pass");
}

#[tokio::test]
async fn archive_collection_syncs_after_the_primary_one() {
    let remote = Arc::new(FakeRemote::new());
    let now = now_timestamp();
    remote
        .seed(
            ARCHIVE_COLLECTION,
            remote_doc(&RecordId::new().to_string(), "Old Lead", "lost", now),
        )
        .await;

    let h = harness_with_archive(remote.clone(), true).await;
    let record = LeadRecord::new("Jane", "");
    h.repo.save(&record).await.unwrap();

    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Completed);

    // Primary uploaded, archive downloaded; collections stay isolated.
    assert_eq!(remote.documents(PRIMARY_COLLECTION).await.len(), 1);
    assert_eq!(h.repo.count().await.unwrap(), 1);

    let archive_pool_docs = remote.documents(ARCHIVE_COLLECTION).await;
    assert_eq!(archive_pool_docs.len(), 1);
}

#[tokio::test]
async fn deleted_record_is_not_resurrected_by_the_next_pass() {
    let remote = Arc::new(FakeRemote::new());
    let h = harness(remote.clone()).await;

    let record = LeadRecord::new("Jane", "");
    h.repo.save(&record).await.unwrap();
    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Completed);
    assert_eq!(remote.documents(PRIMARY_COLLECTION).await.len(), 1);

    h.engine.delete_record(&record.id).await.unwrap();
    assert!(h.repo.find_by_id(&record.id).await.unwrap().is_none());

    // Wait for the background remote delete to land.
    for _ in 0..100 {
        if remote.documents(PRIMARY_COLLECTION).await.is_empty() {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert!(remote.documents(PRIMARY_COLLECTION).await.is_empty());

    assert_eq!(h.engine.run_sync_pass().await, SyncStatus::Completed);
    assert!(h.repo.find_by_id(&record.id).await.unwrap().is_none());
}
