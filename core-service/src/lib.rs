//! # Core Service Facade
//!
//! Composition root for the sync core. A host process constructs one
//! [`SyncCore`] at startup; it wires the database pool, repositories,
//! session manager, remote client, event bus and sync engine together and
//! hands out references. There are no globals: everything downstream
//! receives its collaborators explicitly.

use core_auth::{Session, SessionManager};
use core_records::{
    create_pool, DatabaseConfig, RecordRepository, RecordsError, SqliteRecordRepository,
    SqliteSettingsStore, ARCHIVE_COLLECTION, PRIMARY_COLLECTION,
};
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use core_runtime::logging::{init_logging, LoggingConfig};
use core_sync::{SyncConfig, SyncEngine, SyncEngineDeps, SyncError};
use provider_rest::{RestCollectionClient, RestConfig};
use sqlx::SqlitePool;
use std::sync::Arc;
use store_traits::StoreError;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Records(#[from] RecordsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Everything needed to stand up the service.
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub remote: RestConfig,
    pub sync: SyncConfig,
    /// `None` when the host configures tracing itself.
    pub logging: Option<LoggingConfig>,
    /// Sync the archive collection after the primary one.
    pub sync_archive: bool,
}

impl CoreConfig {
    pub fn new(database: DatabaseConfig, remote: RestConfig) -> Self {
        Self {
            database,
            remote,
            sync: SyncConfig::default(),
            logging: Some(LoggingConfig::default()),
            sync_archive: false,
        }
    }
}

/// The assembled sync core.
pub struct SyncCore {
    pool: SqlitePool,
    events: EventBus,
    sessions: Arc<SessionManager>,
    records: Arc<SqliteRecordRepository>,
    engine: Arc<SyncEngine>,
}

impl SyncCore {
    /// Build and initialize the whole stack. Runs migrations, restores
    /// persisted sync settings and starts the scheduler if auto-sync was
    /// left enabled.
    pub async fn new(config: CoreConfig) -> Result<Self> {
        if let Some(logging) = config.logging {
            init_logging(logging)?;
        }

        let pool = create_pool(config.database).await?;
        let events = EventBus::default();
        let sessions = Arc::new(SessionManager::new(events.clone()));
        let records = Arc::new(SqliteRecordRepository::new(
            pool.clone(),
            PRIMARY_COLLECTION,
        ));
        let archive = config.sync_archive.then(|| {
            Arc::new(SqliteRecordRepository::new(pool.clone(), ARCHIVE_COLLECTION))
                as Arc<dyn RecordRepository>
        });
        let settings = Arc::new(SqliteSettingsStore::new(pool.clone()));
        let remote = Arc::new(RestCollectionClient::new(config.remote, sessions.clone())?);

        let engine = SyncEngine::new(
            SyncEngineDeps {
                records: records.clone(),
                archive,
                remote,
                sessions: sessions.clone(),
                settings,
                events: events.clone(),
            },
            config.sync,
        );
        engine.initialize().await?;

        info!("Sync core initialized");
        Ok(Self {
            pool,
            events,
            sessions,
            records,
            engine,
        })
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn records(&self) -> &Arc<SqliteRecordRepository> {
        &self.records
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Establish a session and kick off an immediate pass so the device
    /// converges without waiting for the scheduler.
    pub async fn sign_in(&self, session: Session) {
        self.sessions.sign_in(session).await;
        self.engine.start_sync().await;
    }

    /// Flush local changes best-effort, then tear the session down.
    pub async fn sign_out(&self) {
        self.engine.sync_before_teardown();
        self.sessions.sign_out().await;
    }
}
