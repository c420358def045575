//! In-memory settings store for tests and ephemeral hosts.

use crate::error::Result;
use crate::settings::SettingsStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// [`SettingsStore`] backed by a process-local map. Values do not survive
/// restarts; intended for tests and hosts without persistent configuration.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&self, key: &str, value: String) {
        self.values
            .lock()
            .expect("settings map poisoned")
            .insert(key.to_string(), value);
    }

    fn read(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .expect("settings map poisoned")
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read(key))
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.put(key, value.to_string());
        Ok(())
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.read(key).map(|v| v == "true"))
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.put(key, value.to_string());
        Ok(())
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.read(key).and_then(|v| v.parse().ok()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values
            .lock()
            .expect("settings map poisoned")
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_round_trip() {
        let store = MemorySettingsStore::new();
        store.set_string("sync_interval", "1h").await.unwrap();
        store.set_bool("auto_sync_enabled", true).await.unwrap();
        store.set_i64("last_sync_date", 42).await.unwrap();

        assert_eq!(
            store.get_string("sync_interval").await.unwrap().as_deref(),
            Some("1h")
        );
        assert_eq!(store.get_bool("auto_sync_enabled").await.unwrap(), Some(true));
        assert_eq!(store.get_i64("last_sync_date").await.unwrap(), Some(42));

        store.delete("last_sync_date").await.unwrap();
        assert_eq!(store.get_i64("last_sync_date").await.unwrap(), None);
    }
}
