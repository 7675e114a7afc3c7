//! In-process store backend.

use crate::store::{Namespace, TrustStore};
use crate::TrustgateError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Volatile store, for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<Namespace, HashMap<String, Value>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> TrustgateError {
    TrustgateError::StoreIO("memory store lock poisoned".to_string())
}

impl TrustStore for MemoryStore {
    fn get(&self, ns: Namespace, key: &str) -> Result<Option<Value>, TrustgateError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(&ns).and_then(|m| m.get(key)).cloned())
    }

    fn set(&self, ns: Namespace, key: &str, value: Value) -> Result<(), TrustgateError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.entry(ns).or_default().insert(key.to_string(), value);
        Ok(())
    }

    fn clear(&self, ns: Namespace) -> Result<(), TrustgateError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(&ns);
        Ok(())
    }
}
