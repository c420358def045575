//! # Database Connection Pool Module
//!
//! SQLite connection pooling for the local record store.
//!
//! - **WAL Mode** for concurrent readers alongside the sync engine's writes
//! - **Connection Pooling** with configurable limits and timeouts
//! - **Foreign Keys** enforced
//! - **Automatic Migrations** embedded via `sqlx::migrate!` and run on init
//!
//! The local store is shared between the application's UI threads and the
//! sync engine; all multi-record scans and mutations go through this pool so
//! UI reads never observe a partially-applied sync pass.

use crate::error::{RecordsError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Database configuration for the SQLite connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (`sqlite:path.db` or `sqlite::memory:`)
    pub database_url: String,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// Configuration for an on-disk database file.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        Self {
            database_url: format!("sqlite:{}", path.display()),
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Configuration for an in-memory database (testing).
    ///
    /// A single connection is required: each SQLite `:memory:` connection is
    /// its own database.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Set the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

/// Create a connection pool, run migrations, and verify connectivity.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Creating database connection pool"
    );

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(RecordsError::Database)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .create_if_missing(true);

    debug!("SQLite connection options configured");

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create connection pool");
            RecordsError::Database(e)
        })?;

    run_migrations(&pool).await?;
    health_check(&pool).await?;

    Ok(pool)
}

/// Create an in-memory pool with migrations applied (testing).
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}

/// Apply pending migrations embedded from `migrations/`.
async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Migration failed");
            RecordsError::Migration(e.to_string())
        })?;

    Ok(())
}

/// Verify the pool can execute a trivial query.
async fn health_check(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(RecordsError::Database)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_applies_schema() {
        let pool = create_test_pool().await.unwrap();

        // Both tables from the initial migration must exist.
        sqlx::query("SELECT COUNT(*) FROM records")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("SELECT COUNT(*) FROM settings")
            .execute(&pool)
            .await
            .unwrap();
    }
}
