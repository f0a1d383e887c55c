//! [`StorageArea`] backed by the SQLite settings table.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use super::{StorageArea, StorageChange, StoreError};
use crate::db::Database;

/// Change notification buffer. Slow subscribers skip old changes.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Local storage area persisted in SQLite. Values are stored as JSON text.
pub struct SqliteStorage {
    db: Mutex<Database>,
    changes: broadcast::Sender<StorageChange>,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("subscribers", &self.changes.receiver_count())
            .finish()
    }
}

impl SqliteStorage {
    /// Wrap an opened database. Runs migrations first.
    pub fn new(mut db: Database) -> anyhow::Result<Self> {
        db.migrate()?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            db: Mutex::new(db),
            changes,
        })
    }

    /// Fresh in-memory storage, mostly useful for tests.
    pub fn in_memory() -> anyhow::Result<Self> {
        Self::new(Database::open_in_memory()?)
    }

    fn read(db: &Database, key: &str) -> Result<Option<Value>, StoreError> {
        match db.get_setting(key)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StorageArea for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        Self::read(&db, key)
    }

    async fn get_all(&self) -> Result<Map<String, Value>, StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        let mut all = Map::new();
        for (key, text) in db.list_settings()? {
            all.insert(key, serde_json::from_str(&text)?);
        }
        Ok(all)
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(&value)?;
        let old_value = {
            let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
            // A corrupt previous value doesn't block the write
            let old = Self::read(&db, key).ok().flatten();
            db.set_setting(key, &text)?;
            old
        };

        // No subscribers is fine
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
            old_value,
            new_value: value,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_then_get() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.set("width", json!(320)).await.unwrap();
        assert_eq!(storage.get("width").await.unwrap(), Some(json!(320)));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let storage = SqliteStorage::in_memory().unwrap();
        assert_eq!(storage.get("theme").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_all_only_returns_stored_keys() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.set("theme", json!("light")).await.unwrap();
        storage.set("compact", json!(true)).await.unwrap();

        let all = storage.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["theme"], json!("light"));
        assert_eq!(all["compact"], json!(true));
    }

    #[tokio::test]
    async fn test_set_emits_change_every_time() {
        let storage = SqliteStorage::in_memory().unwrap();
        let mut changes = storage.subscribe();

        storage.set("right", json!(true)).await.unwrap();
        storage.set("right", json!(true)).await.unwrap();

        let first = changes.recv().await.unwrap();
        assert_eq!(first.key, "right");
        assert_eq!(first.old_value, None);
        assert_eq!(first.new_value, json!(true));

        let second = changes.recv().await.unwrap();
        assert_eq!(second.old_value, Some(json!(true)));
        assert_eq!(second.new_value, json!(true));
    }

    #[tokio::test]
    async fn test_corrupt_value_is_serialization_error() {
        let mut db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.set_setting("theme", "not json {{").unwrap();
        let storage = SqliteStorage::new(db).unwrap();

        let err = storage.get("theme").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.db");

        {
            let storage = SqliteStorage::new(Database::open_at(path.clone()).unwrap()).unwrap();
            storage.set("toggleDisplayHotkey", json!("control-alt-b")).await.unwrap();
        }

        let storage = SqliteStorage::new(Database::open_at(path).unwrap()).unwrap();
        assert_eq!(
            storage.get("toggleDisplayHotkey").await.unwrap(),
            Some(json!("control-alt-b"))
        );
    }
}
