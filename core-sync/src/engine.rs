//! Sync orchestrator.
//!
//! Owns the status state machine (`Idle -> Syncing -> {Completed, Failed}
//! -> Idle`), drives a pass through the retry executor, and runs the
//! periodic scheduler. One logical pass runs at a time; a `start_sync`
//! that lands while a pass is in flight merges into it instead of
//! launching a second pass.

use core_auth::SessionProvider;
use core_records::models::now_timestamp;
use core_records::{RecordId, RecordRepository, ARCHIVE_COLLECTION, PRIMARY_COLLECTION};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use store_traits::{RemoteCollection, SettingsStore};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::conflict::{self, Resolution};
use crate::deletion::DeletionPropagator;
use crate::error::{Result, SyncError};
use crate::retry::{RetryExecutor, RetryPolicy, SyncStep};
use crate::status::{SyncInterval, SyncStatus};
use crate::sweeper::RecordSweeper;

/// Settings keys persisted via the [`SettingsStore`].
pub const SYNC_INTERVAL_KEY: &str = "sync_interval";
pub const AUTO_SYNC_ENABLED_KEY: &str = "auto_sync_enabled";
pub const LAST_SYNC_DATE_KEY: &str = "last_sync_date";

/// Tunable bounds for a sync pass.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Concurrent remote upserts within the upload phase.
    pub max_concurrent_upserts: usize,
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_upserts: 4,
            retry: RetryPolicy::default(),
        }
    }
}

/// Per-pass counters, shared across the concurrent upload futures.
#[derive(Debug, Default)]
pub struct PassStats {
    pub uploaded: AtomicU64,
    pub created: AtomicU64,
    pub overwritten: AtomicU64,
    pub skipped: AtomicU64,
    pub corrupt: AtomicU64,
}

impl PassStats {
    fn completed_event(&self) -> SyncEvent {
        SyncEvent::Completed {
            records_uploaded: self.uploaded.load(Ordering::SeqCst),
            records_created: self.created.load(Ordering::SeqCst),
            records_overwritten: self.overwritten.load(Ordering::SeqCst),
            records_skipped: self.skipped.load(Ordering::SeqCst),
            records_corrupt: self.corrupt.load(Ordering::SeqCst),
        }
    }
}

/// Collaborators injected at construction.
pub struct SyncEngineDeps {
    pub records: Arc<dyn RecordRepository>,
    /// Optional secondary collection synced after the primary one.
    pub archive: Option<Arc<dyn RecordRepository>>,
    pub remote: Arc<dyn RemoteCollection>,
    pub sessions: Arc<dyn SessionProvider>,
    pub settings: Arc<dyn SettingsStore>,
    pub events: EventBus,
}

struct SchedulerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

pub struct SyncEngine {
    records: Arc<dyn RecordRepository>,
    archive: Option<Arc<dyn RecordRepository>>,
    remote: Arc<dyn RemoteCollection>,
    sessions: Arc<dyn SessionProvider>,
    settings: Arc<dyn SettingsStore>,
    events: EventBus,
    config: SyncConfig,
    deletion: DeletionPropagator,

    status: RwLock<SyncStatus>,
    last_sync_date: RwLock<Option<i64>>,
    interval: RwLock<SyncInterval>,
    auto_sync: AtomicBool,
    paused: Arc<AtomicBool>,
    /// Held for the duration of one pass; try-locked, never awaited.
    pass_lock: Mutex<()>,
    scheduler: StdMutex<Option<SchedulerHandle>>,
}

impl SyncEngine {
    pub fn new(deps: SyncEngineDeps, config: SyncConfig) -> Arc<Self> {
        let deletion = DeletionPropagator::new(
            deps.records.clone(),
            deps.remote.clone(),
            deps.sessions.clone(),
            PRIMARY_COLLECTION,
            deps.events.clone(),
        );
        Arc::new(Self {
            records: deps.records,
            archive: deps.archive,
            remote: deps.remote,
            sessions: deps.sessions,
            settings: deps.settings,
            events: deps.events,
            config,
            deletion,
            status: RwLock::new(SyncStatus::Idle),
            last_sync_date: RwLock::new(None),
            interval: RwLock::new(SyncInterval::default()),
            auto_sync: AtomicBool::new(false),
            paused: Arc::new(AtomicBool::new(false)),
            pass_lock: Mutex::new(()),
            scheduler: StdMutex::new(None),
        })
    }

    /// Load persisted settings and start the scheduler if auto-sync was
    /// left enabled. Call once after construction.
    pub async fn initialize(self: &Arc<Self>) -> Result<()> {
        if let Some(raw) = self.settings.get_string(SYNC_INTERVAL_KEY).await? {
            match raw.parse::<SyncInterval>() {
                Ok(interval) => *self.interval.write().await = interval,
                Err(_) => warn!(value = %raw, "Ignoring unrecognized persisted sync interval"),
            }
        }
        if let Some(ts) = self.settings.get_i64(LAST_SYNC_DATE_KEY).await? {
            *self.last_sync_date.write().await = Some(ts);
        }
        let enabled = self
            .settings
            .get_bool(AUTO_SYNC_ENABLED_KEY)
            .await?
            .unwrap_or(false);
        self.auto_sync.store(enabled, Ordering::SeqCst);
        if enabled {
            self.restart_scheduler().await;
        }
        Ok(())
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    pub async fn last_sync_date(&self) -> Option<i64> {
        *self.last_sync_date.read().await
    }

    pub fn is_auto_sync_enabled(&self) -> bool {
        self.auto_sync.load(Ordering::SeqCst)
    }

    pub async fn sync_interval(&self) -> SyncInterval {
        *self.interval.read().await
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Request a sync pass. Returns once the pass is spawned; observe
    /// completion through `status()` or the event bus.
    pub async fn start_sync(self: &Arc<Self>) {
        let engine = self.clone();
        tokio::spawn(async move {
            engine.run_sync_pass().await;
        });
    }

    /// Run one full pass and return the terminal status.
    ///
    /// A call that lands while another pass holds the lock is a logical
    /// merge into that pass: it returns the current status without side
    /// effects.
    #[instrument(skip(self))]
    pub async fn run_sync_pass(self: &Arc<Self>) -> SyncStatus {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            debug!("Sync already in flight, merging request");
            return self.status().await;
        };

        // Signed-out is the quiet path: cold launches dispatch a sync
        // before the user has authenticated and must not show a failure.
        // A terminal status from an earlier pass stays visible.
        let Some(session) = self.sessions.current_session().await else {
            debug!("No session, skipping sync");
            return self.status().await;
        };

        self.set_status(SyncStatus::Syncing).await;
        self.events.emit(CoreEvent::Sync(SyncEvent::Started)).ok();
        info!(principal = %session.principal_id, "Sync pass started");

        let stats = Arc::new(PassStats::default());
        let steps = self.build_steps(session.principal_id.to_string(), stats.clone());
        let executor = RetryExecutor::new(
            self.sessions.clone(),
            self.paused.clone(),
            self.config.retry,
        );

        let outcome = executor
            .execute(&steps, |err, attempt| {
                debug!(error = %err, attempt, "Pass attempt failed, will retry");
            })
            .await;

        let status = match outcome {
            Ok(()) => {
                let now = now_timestamp();
                *self.last_sync_date.write().await = Some(now);
                if let Err(err) = self.settings.set_i64(LAST_SYNC_DATE_KEY, now).await {
                    warn!(error = %err, "Failed to persist last sync date");
                }
                self.events.emit(CoreEvent::Sync(stats.completed_event())).ok();
                info!("Sync pass completed");
                SyncStatus::Completed
            }
            // Sign-out and pause both end the pass without a user-facing
            // failure state.
            Err(SyncError::NotAuthenticated) | Err(SyncError::Paused) => SyncStatus::Idle,
            Err(err) => {
                let reason = err.to_string();
                warn!(reason, "Sync pass failed");
                self.events
                    .emit(CoreEvent::Sync(SyncEvent::Failed {
                        message: reason.clone(),
                    }))
                    .ok();
                SyncStatus::Failed { reason }
            }
        };

        self.set_status(status.clone()).await;
        status
    }

    /// Force idle. In-flight network calls are not interrupted; remaining
    /// steps observe the pause at their next checkpoint.
    pub async fn pause_sync(&self) {
        self.paused.store(true, Ordering::SeqCst);
        self.set_status(SyncStatus::Idle).await;
        self.events.emit(CoreEvent::Sync(SyncEvent::Paused)).ok();
        info!("Sync paused");
    }

    /// Clear the pause flag and request a fresh pass.
    pub async fn resume_sync(self: &Arc<Self>) {
        self.paused.store(false, Ordering::SeqCst);
        self.start_sync().await;
    }

    /// Best-effort flush before session teardown. Fire-and-forget: the
    /// pass is not guaranteed to finish before the session disappears.
    pub fn sync_before_teardown(self: &Arc<Self>) {
        let engine = self.clone();
        tokio::spawn(async move {
            engine.run_sync_pass().await;
        });
    }

    pub async fn toggle_auto_sync(self: &Arc<Self>, enabled: bool) -> Result<()> {
        self.auto_sync.store(enabled, Ordering::SeqCst);
        self.settings.set_bool(AUTO_SYNC_ENABLED_KEY, enabled).await?;
        if enabled {
            self.restart_scheduler().await;
        } else {
            self.stop_scheduler();
        }
        info!(enabled, "Auto-sync toggled");
        Ok(())
    }

    pub async fn set_sync_interval(self: &Arc<Self>, interval: SyncInterval) -> Result<()> {
        *self.interval.write().await = interval;
        self.settings
            .set_string(SYNC_INTERVAL_KEY, interval.as_str())
            .await?;
        if self.auto_sync.load(Ordering::SeqCst) {
            self.restart_scheduler().await;
        }
        info!(interval = %interval, "Sync interval changed");
        Ok(())
    }

    /// Delete a record locally now and remotely best-effort.
    pub async fn delete_record(&self, id: &RecordId) -> Result<()> {
        self.deletion.delete(id).await
    }

    /// Delete several records; partial remote failure is tolerated.
    pub async fn delete_records(&self, ids: &[RecordId]) -> Result<()> {
        self.deletion.delete_batch(ids).await
    }

    async fn set_status(&self, status: SyncStatus) {
        *self.status.write().await = status;
    }

    fn build_steps(self: &Arc<Self>, principal: String, stats: Arc<PassStats>) -> Vec<SyncStep> {
        let mut steps = Vec::new();

        {
            let engine = self.clone();
            let stats = stats.clone();
            steps.push(SyncStep::new("sweep", move || {
                let engine = engine.clone();
                let stats = stats.clone();
                Box::pin(async move { engine.sweep_phase(&stats).await })
            }));
        }
        {
            let engine = self.clone();
            let stats = stats.clone();
            let principal = principal.clone();
            steps.push(SyncStep::new("upload", move || {
                let engine = engine.clone();
                let stats = stats.clone();
                let principal = principal.clone();
                Box::pin(async move {
                    let records = engine.records.clone();
                    engine
                        .upload_phase(&records, PRIMARY_COLLECTION, &principal, &stats)
                        .await
                })
            }));
        }
        {
            let engine = self.clone();
            let stats = stats.clone();
            let principal = principal.clone();
            steps.push(SyncStep::new("download", move || {
                let engine = engine.clone();
                let stats = stats.clone();
                let principal = principal.clone();
                Box::pin(async move {
                    let records = engine.records.clone();
                    engine
                        .download_phase(&records, PRIMARY_COLLECTION, &principal, &stats)
                        .await
                })
            }));
        }
        if self.archive.is_some() {
            let engine = self.clone();
            steps.push(SyncStep::new("sync-archive", move || {
                let engine = engine.clone();
                let stats = stats.clone();
                let principal = principal.clone();
                Box::pin(async move {
                    let Some(archive) = engine.archive.clone() else {
                        return Ok(());
                    };
                    engine
                        .upload_phase(&archive, ARCHIVE_COLLECTION, &principal, &stats)
                        .await?;
                    engine
                        .download_phase(&archive, ARCHIVE_COLLECTION, &principal, &stats)
                        .await
                })
            }));
        }

        steps
    }

    async fn sweep_phase(&self, stats: &PassStats) -> Result<()> {
        let removed = RecordSweeper::new(self.records.clone()).sweep().await?;
        stats.corrupt.fetch_add(removed as u64, Ordering::SeqCst);
        Ok(())
    }

    /// Push dirty local records as merge upserts, bounded-concurrent.
    ///
    /// A record is dirty when it has never been uploaded or has been edited
    /// since the last-seen remote timestamp. Clean records are left alone so
    /// a newer edit from another device is not clobbered moments before the
    /// download phase would have adopted it.
    async fn upload_phase(
        &self,
        repo: &Arc<dyn RecordRepository>,
        collection: &str,
        principal: &str,
        stats: &PassStats,
    ) -> Result<()> {
        use futures::stream::{self, TryStreamExt};

        let dirty: Vec<_> = repo
            .list_all()
            .await?
            .into_iter()
            .filter(|r| r.remote_modified_at.map_or(true, |seen| r.local_modified_at > seen))
            .collect();
        let total = dirty.len();

        stream::iter(dirty.into_iter().map(Ok::<_, SyncError>))
            .try_for_each_concurrent(self.config.max_concurrent_upserts, |record| {
                let remote = self.remote.clone();
                let repo = repo.clone();
                async move {
                    remote
                        .upsert_merge(principal, collection, &record.to_remote_document())
                        .await?;
                    // Guarded watermark: an application edit committed since
                    // the snapshot leaves the record dirty and untouched.
                    // Idempotent on retry: a re-run sees the record as clean.
                    repo.set_remote_watermark(&record.id, record.local_modified_at)
                        .await?;
                    stats.uploaded.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await?;

        debug!(collection, total, "Upload phase finished");
        Ok(())
    }

    /// Pull the remote collection page by page and arbitrate each document
    /// against the local store. Re-sweeps first so the merge never runs
    /// against corrupt rows.
    async fn download_phase(
        &self,
        repo: &Arc<dyn RecordRepository>,
        collection: &str,
        principal: &str,
        stats: &PassStats,
    ) -> Result<()> {
        let removed = RecordSweeper::new(repo.clone()).sweep().await?;
        stats.corrupt.fetch_add(removed as u64, Ordering::SeqCst);

        let mut cursor: Option<String> = None;
        let mut total = 0usize;
        loop {
            let (documents, next) = self.remote.list(principal, collection, cursor).await?;
            total += documents.len();
            let now = now_timestamp();
            for document in &documents {
                self.apply_document(repo, document, now, stats).await?;
            }
            match next {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        debug!(collection, total, "Download phase finished");
        Ok(())
    }

    /// Arbitrate one downloaded document. Per-document problems are
    /// counted and skipped; only store failures abort the batch.
    async fn apply_document(
        &self,
        repo: &Arc<dyn RecordRepository>,
        document: &store_traits::RemoteDocument,
        now: i64,
        stats: &PassStats,
    ) -> Result<()> {
        let local = match RecordId::from_string(&document.key) {
            Ok(id) => repo.find_by_id(&id).await?,
            Err(_) => None,
        };

        match conflict::resolve(local.as_ref(), document, now) {
            Resolution::CreateLocal => match conflict::materialize(document, now) {
                Some(record) => {
                    repo.save(&record).await?;
                    stats.created.fetch_add(1, Ordering::SeqCst);
                }
                None => {
                    warn!(key = %document.key, "Skipping remote document with no identity");
                    stats.skipped.fetch_add(1, Ordering::SeqCst);
                }
            },
            Resolution::OverwriteLocal => {
                if let Some(existing) = local {
                    repo.save(&conflict::apply_remote(&existing, document, now))
                        .await?;
                    stats.overwritten.fetch_add(1, Ordering::SeqCst);
                }
            }
            Resolution::SkipPreserveLocal => {
                stats.skipped.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    async fn restart_scheduler(self: &Arc<Self>) {
        self.stop_scheduler();

        let period = self.interval.read().await.as_duration();
        let token = CancellationToken::new();
        let task_token = token.clone();
        let engine = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; consume it so the cadence
            // starts one full period from now.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(engine) = Weak::upgrade(&engine) else { break };
                        debug!("Scheduled sync fired");
                        engine.start_sync().await;
                    }
                }
            }
        });

        let mut slot = self.scheduler.lock().expect("scheduler lock poisoned");
        *slot = Some(SchedulerHandle { token, task });
    }

    fn stop_scheduler(&self) {
        let handle = self.scheduler.lock().expect("scheduler lock poisoned").take();
        if let Some(handle) = handle {
            handle.token.cancel();
            handle.task.abort();
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.stop_scheduler();
    }
}
