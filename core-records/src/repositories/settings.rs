//! SQLite-backed key-value settings store.

use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};
use store_traits::{SettingsStore, StoreError};

/// Persists engine settings (sync interval, auto-sync flag, last sync time)
/// in the local database so they survive restarts.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn set_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        query(
            "INSERT INTO settings (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Settings(e.to_string()))?;
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Settings(e.to_string()))?;
        Ok(row.map(|(value,)| value))
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_raw(key, value).await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.get_raw(key).await
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<(), StoreError> {
        self.set_raw(key, if value { "true" } else { "false" }).await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>, StoreError> {
        Ok(self.get_raw(key).await?.map(|v| v == "true"))
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.set_raw(key, &value.to_string()).await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let raw = self.get_raw(key).await?;
        match raw {
            Some(v) => v
                .parse::<i64>()
                .map(Some)
                .map_err(|e| StoreError::Settings(format!("invalid i64 for {key}: {e}"))),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Settings(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn string_round_trip_and_overwrite() {
        let store = SqliteSettingsStore::new(create_test_pool().await.unwrap());
        assert_eq!(store.get_string("sync_interval").await.unwrap(), None);

        store.set_string("sync_interval", "1h").await.unwrap();
        store.set_string("sync_interval", "30m").await.unwrap();
        assert_eq!(
            store.get_string("sync_interval").await.unwrap().as_deref(),
            Some("30m")
        );
    }

    #[tokio::test]
    async fn bool_and_i64_round_trip() {
        let store = SqliteSettingsStore::new(create_test_pool().await.unwrap());

        store.set_bool("auto_sync_enabled", true).await.unwrap();
        assert_eq!(store.get_bool("auto_sync_enabled").await.unwrap(), Some(true));

        store.set_i64("last_sync_date", 1_700_000_000).await.unwrap();
        assert_eq!(
            store.get_i64("last_sync_date").await.unwrap(),
            Some(1_700_000_000)
        );
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let store = SqliteSettingsStore::new(create_test_pool().await.unwrap());
        store.set_string("auto_sync_enabled", "true").await.unwrap();
        store.delete("auto_sync_enabled").await.unwrap();
        assert_eq!(store.get_string("auto_sync_enabled").await.unwrap(), None);
    }
}
