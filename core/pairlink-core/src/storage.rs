//! Durable key-value storage behind the session store and config sink.
//!
//! The core writes under two fixed keys (session state and channel config).
//! Nothing else in the process touches those keys; call sites go through
//! [`crate::session::SessionStore`] and [`crate::config::StorageConfigSink`]
//! rather than hardcoding key names.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use fs_err as fs;
use tempfile::NamedTempFile;

/// Minimal durable key-value interface: `get`/`set`/`remove`, synchronous
/// from the caller's point of view.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove(&self, key: &str) -> Result<(), String>;
}

/// File-backed storage: one JSON file per key inside a base directory.
///
/// Writes go through a temp file + rename so a crash mid-write never leaves
/// a truncated entry behind.
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FileStorage {
            base_dir: base_dir.into(),
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.entry_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        fs::create_dir_all(&self.base_dir)
            .map_err(|err| format!("Failed to create storage directory: {}", err))?;

        let mut temp_file = NamedTempFile::new_in(&self.base_dir)
            .map_err(|err| format!("Temp file error: {}", err))?;
        temp_file
            .write_all(value.as_bytes())
            .map_err(|err| format!("Failed to write storage entry: {}", err))?;
        temp_file
            .flush()
            .map_err(|err| format!("Failed to flush storage entry: {}", err))?;
        temp_file
            .persist(self.entry_path(key))
            .map_err(|err| format!("Failed to commit storage entry: {}", err.error))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(format!("Failed to remove storage entry: {}", err)),
        }
    }
}

/// In-memory storage for tests and embedders that manage persistence
/// themselves.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Number of keys currently present. Test observability helper.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_storage_round_trip() {
        let temp = tempdir().unwrap();
        let storage = FileStorage::new(temp.path());

        storage.set("session", r#"{"a":1}"#).unwrap();
        assert_eq!(storage.get("session").as_deref(), Some(r#"{"a":1}"#));

        storage.remove("session").unwrap();
        assert!(storage.get("session").is_none());
    }

    #[test]
    fn test_file_storage_get_missing_key_returns_none() {
        let temp = tempdir().unwrap();
        let storage = FileStorage::new(temp.path());
        assert!(storage.get("absent").is_none());
    }

    #[test]
    fn test_file_storage_remove_missing_key_is_ok() {
        let temp = tempdir().unwrap();
        let storage = FileStorage::new(temp.path());
        assert!(storage.remove("absent").is_ok());
    }

    #[test]
    fn test_file_storage_set_overwrites() {
        let temp = tempdir().unwrap();
        let storage = FileStorage::new(temp.path());
        storage.set("key", "old").unwrap();
        storage.set("key", "new").unwrap();
        assert_eq!(storage.get("key").as_deref(), Some("new"));
    }

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        storage.set("key", "value").unwrap();
        assert_eq!(storage.get("key").as_deref(), Some("value"));
        storage.remove("key").unwrap();
        assert!(storage.is_empty());
    }
}
