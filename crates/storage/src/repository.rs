use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Asynchronous key-value persistence contract.
///
/// Values are arbitrary JSON documents. Implementations must survive process
/// restarts unless they are explicitly in-memory.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Persist `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError>;

    /// Fetch the value stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing has been stored for the key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend is unavailable or the stored
    /// document cannot be decoded.
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Remove every stored key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend is unavailable.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Simple in-memory store for testing and sessions that should not outlive the process.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of stored keys.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        self.len().map(|len| len == 0)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.clone());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.clear();
        Ok(())
    }
}

/// Process-wide store handle behind a trait object for easy backend swapping.
///
/// Opened once at startup and handed to the engine; never explicitly closed.
#[derive(Clone)]
pub struct Storage {
    pub kv: Arc<dyn KeyValueStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        Self { kv }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn round_trips_values_by_key() {
        let store = InMemoryStore::new();
        store.save("questions", &json!([1, 2, 3])).await.unwrap();
        store.save("correctAnswersCount", &json!(4)).await.unwrap();

        assert_eq!(
            store.load("questions").await.unwrap(),
            Some(json!([1, 2, 3]))
        );
        assert_eq!(
            store.load("correctAnswersCount").await.unwrap(),
            Some(json!(4))
        );
        assert_eq!(store.load("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn later_save_replaces_earlier_value() {
        let store = InMemoryStore::new();
        store.save("k", &json!("first")).await.unwrap();
        store.save("k", &json!("second")).await.unwrap();
        assert_eq!(store.load("k").await.unwrap(), Some(json!("second")));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let storage = Storage::in_memory();
        storage.kv.save("a", &json!(1)).await.unwrap();
        storage.kv.save("b", &json!([])).await.unwrap();
        storage.kv.clear().await.unwrap();
        assert_eq!(storage.kv.load("a").await.unwrap(), None);
        assert_eq!(storage.kv.load("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = InMemoryStore::new();
        let other = store.clone();
        store.save("shared", &json!(true)).await.unwrap();
        assert_eq!(other.load("shared").await.unwrap(), Some(json!(true)));
        assert!(!other.is_empty().unwrap());
    }
}
