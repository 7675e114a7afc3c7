//! Persisted license record.
//!
//! The five fields are written one key at a time. Activation clears
//! `active` first and sets it last, so a crash part-way through leaves a
//! record that reads as inactive.

use crate::license::code::Expiry;
use crate::store::{Namespace, TrustStore};
use crate::time::{from_millis, to_millis};
use crate::TrustgateError;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const KEY_CODE: &str = "code";
const KEY_ACTIVE: &str = "active";
const KEY_EXPIRY: &str = "expiry";
const KEY_ACTIVATION_TIME: &str = "activation_time";
const KEY_IS_MASTER: &str = "is_master";

/// License facts as stored. Missing fields read as their inactive defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LicenseRecord {
    /// Normalized code that was activated.
    pub code: Option<String>,
    /// Whether the license is active.
    pub active: bool,
    /// Expiry; `None` if never written.
    pub expiry: Option<Expiry>,
    /// When the license was activated.
    pub activation_time: Option<DateTime<Utc>>,
    /// Whether the license came from a master code.
    pub is_master: bool,
}

impl LicenseRecord {
    /// Expiry with a missing value read as the epoch (already expired).
    pub fn effective_expiry(&self) -> Expiry {
        self.expiry.unwrap_or(Expiry::At(from_millis(0)))
    }
}

/// Reads and writes the license record.
#[derive(Clone)]
pub struct LicenseRecordStore {
    store: Arc<dyn TrustStore>,
}

impl LicenseRecordStore {
    /// Record store backed by `store`.
    pub fn new(store: Arc<dyn TrustStore>) -> Self {
        Self { store }
    }

    /// Load the record, tolerating partially written fields.
    pub fn load(&self) -> Result<LicenseRecord, TrustgateError> {
        let ns = Namespace::License;
        Ok(LicenseRecord {
            code: self.store.get_string(ns, KEY_CODE)?,
            active: self.store.get_bool(ns, KEY_ACTIVE)?.unwrap_or(false),
            expiry: self.store.get_i64(ns, KEY_EXPIRY)?.map(Expiry::from_millis),
            activation_time: self
                .store
                .get_i64(ns, KEY_ACTIVATION_TIME)?
                .map(from_millis),
            is_master: self.store.get_bool(ns, KEY_IS_MASTER)?.unwrap_or(false),
        })
    }

    /// Mark the license inactive before rewriting its fields.
    pub fn begin_activation(&self) -> Result<(), TrustgateError> {
        self.store.set_bool(Namespace::License, KEY_ACTIVE, false)
    }

    /// Write every field of an activated record; `active` goes last.
    pub fn commit_activation(
        &self,
        code: &str,
        expiry: Expiry,
        activation_time: DateTime<Utc>,
        is_master: bool,
    ) -> Result<LicenseRecord, TrustgateError> {
        let ns = Namespace::License;
        self.store.set_string(ns, KEY_CODE, code)?;
        self.store.set_i64(ns, KEY_EXPIRY, expiry.to_millis())?;
        self.store.set_bool(ns, KEY_IS_MASTER, is_master)?;
        self.store
            .set_i64(ns, KEY_ACTIVATION_TIME, to_millis(activation_time))?;
        self.store.set_bool(ns, KEY_ACTIVE, true)?;

        Ok(LicenseRecord {
            code: Some(code.to_string()),
            active: true,
            expiry: Some(expiry),
            activation_time: Some(activation_time),
            is_master,
        })
    }

    /// Mark the license inactive (observed expired).
    pub fn deactivate(&self) -> Result<(), TrustgateError> {
        self.store.set_bool(Namespace::License, KEY_ACTIVE, false)
    }
}
