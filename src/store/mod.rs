//! Namespaced key-value trust store.
//!
//! Every persisted fact lives under a [`Namespace`]. Writes are per key;
//! there is no cross-key transaction, so readers must tolerate partially
//! written records.

pub mod file;
pub mod memory;

use crate::TrustgateError;
use serde_json::Value;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Logical regions of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// License record and time anchor.
    License,
    /// Permanent tamper locks. Never wiped.
    Locks,
    /// Install id and cached fingerprint.
    Device,
    /// Last confirmed network time.
    TimeValidator,
    /// Auto-reply app selection (owned by collaborators).
    AppSelection,
    /// Location settings (owned by collaborators).
    Location,
}

impl Namespace {
    /// Namespaces cleared when a clone or tamper finding is handled.
    pub const WIPED_ON_TAMPER: [Namespace; 3] = [
        Namespace::License,
        Namespace::AppSelection,
        Namespace::Location,
    ];

    /// Stable on-disk name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::License => "license",
            Namespace::Locks => "locks",
            Namespace::Device => "device",
            Namespace::TimeValidator => "time_validator",
            Namespace::AppSelection => "app_selection",
            Namespace::Location => "location",
        }
    }
}

/// Persistent key-value store. Implementations serialize their own writes.
pub trait TrustStore: Send + Sync {
    /// Read a raw value.
    fn get(&self, ns: Namespace, key: &str) -> Result<Option<Value>, TrustgateError>;

    /// Write a raw value.
    fn set(&self, ns: Namespace, key: &str, value: Value) -> Result<(), TrustgateError>;

    /// Remove every key in a namespace.
    fn clear(&self, ns: Namespace) -> Result<(), TrustgateError>;

    /// Read a boolean; absent or mistyped values read as `None`.
    fn get_bool(&self, ns: Namespace, key: &str) -> Result<Option<bool>, TrustgateError> {
        Ok(self.get(ns, key)?.and_then(|v| v.as_bool()))
    }

    /// Read an integer; absent or mistyped values read as `None`.
    fn get_i64(&self, ns: Namespace, key: &str) -> Result<Option<i64>, TrustgateError> {
        Ok(self.get(ns, key)?.and_then(|v| v.as_i64()))
    }

    /// Read a string; absent or mistyped values read as `None`.
    fn get_string(&self, ns: Namespace, key: &str) -> Result<Option<String>, TrustgateError> {
        Ok(self
            .get(ns, key)?
            .and_then(|v| v.as_str().map(String::from)))
    }

    /// Write a boolean.
    fn set_bool(&self, ns: Namespace, key: &str, value: bool) -> Result<(), TrustgateError> {
        self.set(ns, key, Value::Bool(value))
    }

    /// Write an integer.
    fn set_i64(&self, ns: Namespace, key: &str, value: i64) -> Result<(), TrustgateError> {
        self.set(ns, key, Value::from(value))
    }

    /// Write a string.
    fn set_string(&self, ns: Namespace, key: &str, value: &str) -> Result<(), TrustgateError> {
        self.set(ns, key, Value::String(value.to_string()))
    }
}
