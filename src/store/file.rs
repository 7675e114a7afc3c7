//! File-based store backend with atomic writes.
//!
//! Each namespace is one JSON document stored under
//! `dirs::data_dir()/<store_namespace>/<namespace>.json`.
//! Uses temp file + rename for atomic writes.

use crate::store::{Namespace, TrustStore};
use crate::TrustgateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// On-disk layout of one namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamespaceFile {
    /// When the document was last written.
    updated_at: DateTime<Utc>,

    /// Key-value entries.
    #[serde(default)]
    entries: Map<String, Value>,
}

/// File-based store backend.
pub struct FileStore {
    /// Directory for namespace files.
    store_dir: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a new file store with the given namespace.
    ///
    /// Files are stored under `dirs::data_dir()/<namespace>/`.
    pub fn new(namespace: &str) -> Result<Self, TrustgateError> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| TrustgateError::StoreIO("Could not find data directory".to_string()))?;

        Self::with_path(base_dir.join(namespace))
    }

    /// Create a file store at a specific directory.
    pub fn with_path(store_dir: PathBuf) -> Result<Self, TrustgateError> {
        fs::create_dir_all(&store_dir)
            .map_err(|e| TrustgateError::StoreIO(format!("Failed to create store dir: {}", e)))?;
        Ok(Self {
            store_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the namespace files.
    pub fn dir(&self) -> &Path {
        &self.store_dir
    }

    fn namespace_path(&self, ns: Namespace) -> PathBuf {
        self.store_dir.join(format!("{}.json", ns.as_str()))
    }

    fn load(&self, ns: Namespace) -> Result<Map<String, Value>, TrustgateError> {
        let path = self.namespace_path(ns);

        if !path.exists() {
            return Ok(Map::new());
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| TrustgateError::StoreIO(format!("Failed to read {}: {}", ns.as_str(), e)))?;

        let file: NamespaceFile = serde_json::from_str(&json).map_err(|e| {
            TrustgateError::StoreIO(format!("Failed to parse {}: {}", ns.as_str(), e))
        })?;
        Ok(file.entries)
    }

    fn save(&self, ns: Namespace, entries: Map<String, Value>) -> Result<(), TrustgateError> {
        let target_path = self.namespace_path(ns);
        let temp_path = self.store_dir.join(format!("{}.tmp", ns.as_str()));

        let file = NamespaceFile {
            updated_at: Utc::now(),
            entries,
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| TrustgateError::StoreIO(format!("Failed to serialize: {}", e)))?;

        fs::write(&temp_path, &json)
            .map_err(|e| TrustgateError::StoreIO(format!("Failed to write temp file: {}", e)))?;

        fs::rename(&temp_path, &target_path)
            .map_err(|e| TrustgateError::StoreIO(format!("Failed to rename store file: {}", e)))?;

        Ok(())
    }
}

impl TrustStore for FileStore {
    fn get(&self, ns: Namespace, key: &str) -> Result<Option<Value>, TrustgateError> {
        Ok(self.load(ns)?.remove(key))
    }

    fn set(&self, ns: Namespace, key: &str, value: Value) -> Result<(), TrustgateError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| TrustgateError::StoreIO("store lock poisoned".to_string()))?;

        let mut entries = self.load(ns)?;
        entries.insert(key.to_string(), value);
        self.save(ns, entries)
    }

    fn clear(&self, ns: Namespace) -> Result<(), TrustgateError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| TrustgateError::StoreIO("store lock poisoned".to_string()))?;

        let path = self.namespace_path(ns);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| TrustgateError::StoreIO(format!("Failed to delete: {}", e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();

        store.set_string(Namespace::License, "code", "ABCD").unwrap();
        store.set_bool(Namespace::License, "active", true).unwrap();

        assert_eq!(
            store.get_string(Namespace::License, "code").unwrap(),
            Some("ABCD".to_string())
        );
        assert_eq!(store.get_bool(Namespace::License, "active").unwrap(), Some(true));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();
            store.set_i64(Namespace::Device, "seed", 7).unwrap();
        }
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(store.get_i64(Namespace::Device, "seed").unwrap(), Some(7));
    }

    #[test]
    fn test_file_store_load_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(store.get(Namespace::Location, "missing").unwrap(), None);
    }

    #[test]
    fn test_file_store_clear_namespace() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();

        store.set_bool(Namespace::License, "active", true).unwrap();
        store.set_bool(Namespace::Locks, "clone_lock", true).unwrap();
        store.clear(Namespace::License).unwrap();

        assert_eq!(store.get_bool(Namespace::License, "active").unwrap(), None);
        assert_eq!(store.get_bool(Namespace::Locks, "clone_lock").unwrap(), Some(true));
        assert!(!temp_dir.path().join("license.json").exists());
    }

    #[test]
    fn test_file_store_no_temp_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        store.set_bool(Namespace::Locks, "time_lock", true).unwrap();

        assert!(temp_dir.path().join("locks.json").exists());
        assert!(!temp_dir.path().join("locks.tmp").exists());
    }

    #[test]
    fn test_file_store_document_layout() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        store.set_string(Namespace::Device, "install_id", "DEV-1").unwrap();

        let raw = fs::read_to_string(temp_dir.path().join("device.json")).unwrap();
        let doc: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["entries"]["install_id"], "DEV-1");
        assert!(doc["updated_at"].is_string());
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        fs::write(temp_dir.path().join("license.json"), "not json").unwrap();

        let result = store.get(Namespace::License, "active");
        assert!(matches!(result, Err(TrustgateError::StoreIO(_))));
    }
}
