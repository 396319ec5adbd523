//! Small key/value store backed by one JSON file per key.

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use weatherprob_core::CacheError;

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    /// `Ok(None)` when the key was never written; `Corrupt` when the file
    /// exists but does not parse as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| CacheError::Corrupt(format!("{}: {}", path.display(), e)))?;

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| CacheError::Corrupt(format!("{}: {}", path.display(), e)))
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| CacheError::WriteFailed(format!("create {}: {}", self.root.display(), e)))?;

        let json = serde_json::to_string_pretty(value)
            .map_err(|e| CacheError::WriteFailed(e.to_string()))?;

        let path = self.path_for(key);
        fs::write(&path, json)
            .map_err(|e| CacheError::WriteFailed(format!("{}: {}", path.display(), e)))?;

        tracing::debug!("Stored {} at {:?}", key, path);
        Ok(())
    }

    /// Deleting a missing key is not an error.
    pub fn remove(&self, key: &str) {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!("Removed {}", key),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {:?}: {}", path, e),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let value: Option<Vec<u32>> = store.get("absent").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_set_creates_root_and_get_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("nested"));
        store.set("numbers", &vec![1u32, 2, 3]).unwrap();

        assert!(store.contains("numbers"));
        let value: Option<Vec<u32>> = store.get("numbers").unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let result: Result<Option<Vec<u32>>, _> = store.get("broken");
        assert!(matches!(result, Err(CacheError::Corrupt(_))));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        store.set("k", &1u8).unwrap();
        store.remove("k");
        store.remove("k");
        assert!(!store.contains("k"));
    }
}
