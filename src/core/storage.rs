//! Key-Value Storage
//!
//! Durable client-local string storage backing the token store and the CSRF
//! state manager.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::core::lock;
use crate::error::{AuthError, StorageError};

/// Storage interface (for dependency injection).
///
/// Operations never fail: storage is assumed to be available. Multi-key
/// operations are applied atomically with respect to other callers.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    fn set(&self, key: &str, value: &str);

    /// Remove a value, returning the previous one.
    fn remove(&self, key: &str) -> Option<String>;

    /// Read several values at once.
    fn get_entries(&self, keys: &[&str]) -> Vec<Option<String>>;

    /// Write several values at once.
    fn set_entries(&self, entries: &[(&str, &str)]);

    /// Remove several values at once.
    fn remove_entries(&self, keys: &[&str]);
}

/// In-memory storage implementation.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    /// Create new in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        lock(&self.entries).insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) -> Option<String> {
        lock(&self.entries).remove(key)
    }

    fn get_entries(&self, keys: &[&str]) -> Vec<Option<String>> {
        let entries = lock(&self.entries);
        keys.iter().map(|key| entries.get(*key).cloned()).collect()
    }

    fn set_entries(&self, new_entries: &[(&str, &str)]) {
        let mut entries = lock(&self.entries);
        for (key, value) in new_entries {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove_entries(&self, keys: &[&str]) {
        let mut entries = lock(&self.entries);
        for key in keys {
            entries.remove(*key);
        }
    }
}

/// JSON-file backed storage.
///
/// The file holds a single JSON object of string values. It is read once on
/// open and rewritten after every mutation while the lock is held, so the
/// file never contains a partially applied multi-key update.
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileKeyValueStore {
    /// Open the store, creating it empty when the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref().to_path_buf();

        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => HashMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                AuthError::Storage(StorageError::CorruptedData {
                    message: format!("{}: {}", path.display(), e),
                })
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(AuthError::Storage(StorageError::ReadFailed {
                    message: format!("{}: {}", path.display(), e),
                }))
            }
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened key-value store");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        let result = serde_json::to_string_pretty(entries)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                let tmp = self.path.with_extension("tmp");
                std::fs::write(&tmp, json)
                    .and_then(|_| std::fs::rename(&tmp, &self.path))
                    .map_err(|e| e.to_string())
            });

        if let Err(error) = result {
            warn!(path = %self.path.display(), %error, "Failed to persist key-value store");
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) -> Option<String> {
        let mut entries = lock(&self.entries);
        let previous = entries.remove(key);
        if previous.is_some() {
            self.persist(&entries);
        }
        previous
    }

    fn get_entries(&self, keys: &[&str]) -> Vec<Option<String>> {
        let entries = lock(&self.entries);
        keys.iter().map(|key| entries.get(*key).cloned()).collect()
    }

    fn set_entries(&self, new_entries: &[(&str, &str)]) {
        let mut entries = lock(&self.entries);
        for (key, value) in new_entries {
            entries.insert(key.to_string(), value.to_string());
        }
        self.persist(&entries);
    }

    fn remove_entries(&self, keys: &[&str]) {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        for key in keys {
            entries.remove(*key);
        }
        if entries.len() != before {
            self.persist(&entries);
        }
    }
}

/// Create in-memory storage.
pub fn create_in_memory_store() -> InMemoryKeyValueStore {
    InMemoryKeyValueStore::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_set_get_remove() {
        let store = InMemoryKeyValueStore::new();
        assert!(store.is_empty());

        store.set("state", "abc");
        assert_eq!(store.get("state").as_deref(), Some("abc"));

        assert_eq!(store.remove("state").as_deref(), Some("abc"));
        assert_eq!(store.remove("state"), None);
        assert!(store.get("state").is_none());
    }

    #[test]
    fn test_in_memory_entries() {
        let store = InMemoryKeyValueStore::new();
        store.set_entries(&[("id_token", "a"), ("refresh_token", "b")]);

        assert_eq!(
            store.get_entries(&["id_token", "refresh_token", "missing"]),
            vec![Some("a".to_string()), Some("b".to_string()), None]
        );

        store.remove_entries(&["id_token", "refresh_token"]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        {
            let store = FileKeyValueStore::open(&path).unwrap();
            store.set_entries(&[("id_token", "a"), ("refresh_token", "b")]);
            store.set("state", "c");
            store.remove("state");
        }

        let reopened = FileKeyValueStore::open(&path).unwrap();
        assert_eq!(reopened.get("id_token").as_deref(), Some("a"));
        assert_eq!(reopened.get("refresh_token").as_deref(), Some("b"));
        assert!(reopened.get("state").is_none());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.get("id_token").is_none());
    }

    #[test]
    fn test_file_store_rejects_corrupted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileKeyValueStore::open(&path);
        assert!(matches!(
            result,
            Err(AuthError::Storage(StorageError::CorruptedData { .. }))
        ));
    }
}
