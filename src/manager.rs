//! License Manager - the main public API for Trustgate.
//!
//! The `LicenseManager` ties the pieces together:
//! - License activation (standard and master codes)
//! - Lock-state derivation, validating or query-only
//! - The app-start checkpoint (detectors, then a validating check)

use crate::clock::{Clock, SystemClock};
use crate::config::TrustgateConfig;
use crate::detect::{RuntimeEnvironment, TrustGuard};
use crate::fingerprint::DeviceFingerprintProvider;
use crate::license::code::check_standard;
use crate::license::{
    derive_lock_state, Effect, Expiry, LicenseCode, LicenseRecord, LicenseRecordStore, LockState,
    MasterCode, SideEffects, TrustSnapshot,
};
use crate::locks::{LockKind, TamperLockState};
use crate::store::{FileStore, TrustStore};
use crate::time::{ClockReading, DriftThresholds, NetworkTimeValidator, TimeAnchorTracker};
use crate::TrustgateError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Main license manager for Trustgate.
///
/// Create one instance per application and reuse it for all license checks.
pub struct LicenseManager {
    config: TrustgateConfig,
    clock: Arc<dyn Clock>,
    store: Arc<dyn TrustStore>,
    fingerprints: DeviceFingerprintProvider,
    locks: TamperLockState,
    anchors: TimeAnchorTracker,
    records: LicenseRecordStore,
}

impl LicenseManager {
    /// Create a license manager backed by a [`FileStore`] under the user's
    /// data directory.
    ///
    /// Uses the system clock for time operations.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Configuration validation fails
    /// - Store directory creation fails
    pub fn new(config: TrustgateConfig) -> Result<Self, TrustgateError> {
        config.validate()?;
        let store = Arc::new(FileStore::new(config.store_namespace)?);
        Ok(Self::assemble(config, store, Arc::new(SystemClock)))
    }

    /// Create a license manager over an existing store.
    pub fn with_store(
        config: TrustgateConfig,
        store: Arc<dyn TrustStore>,
    ) -> Result<Self, TrustgateError> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Create a license manager with a custom store and clock.
    pub fn with_clock(
        config: TrustgateConfig,
        store: Arc<dyn TrustStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TrustgateError> {
        config.validate()?;
        Ok(Self::assemble(config, store, clock))
    }

    fn assemble(config: TrustgateConfig, store: Arc<dyn TrustStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            fingerprints: DeviceFingerprintProvider::new(store.clone()),
            locks: TamperLockState::new(store.clone()),
            anchors: TimeAnchorTracker::new(store.clone()),
            records: LicenseRecordStore::new(store.clone()),
            config,
            clock,
            store,
        }
    }

    /// Replace the fingerprint provider (fixed device attributes).
    #[must_use]
    pub fn with_fingerprints(mut self, fingerprints: DeviceFingerprintProvider) -> Self {
        self.fingerprints = fingerprints;
        self
    }

    /// Stable fingerprint of this install, `DEV-XXXX-XXXX-XXXX`.
    pub fn fingerprint(&self) -> Result<String, TrustgateError> {
        self.fingerprints.fingerprint()
    }

    /// Validate a user-entered code and, on success, activate it.
    ///
    /// Codes starting with `MASTER` are master codes; anything else is a
    /// device-bound standard code. Nothing is written when validation fails.
    ///
    /// # Errors
    /// - `InvalidFormat` - standard code length outside 18..=30
    /// - `DeviceMismatch` - standard code not issued for this device
    /// - `CloneLocked` / `CodeLocked` - install is permanently locked
    /// - `MasterFormatInvalid` - master code does not parse
    /// - `MasterExpired` - master code date has passed
    /// - `MasterSignatureInvalid` - master signature does not match
    pub fn validate_and_activate(&self, raw_code: &str) -> Result<LicenseRecord, TrustgateError> {
        match LicenseCode::parse(raw_code) {
            LicenseCode::Master(code) => self.activate_master(&code),
            LicenseCode::Standard(code) => self.activate_standard(&code),
        }
    }

    fn activate_master(&self, code: &str) -> Result<LicenseRecord, TrustgateError> {
        let master = MasterCode::parse(code)?;
        let now = self.clock.now_utc();
        master.verify(self.config.master_secret, now)?;

        self.records.begin_activation()?;
        let record = self
            .records
            .commit_activation(&master.code, master.expiry, now, true)?;
        info!(expiry = %master.date_field, "master license activated");
        Ok(record)
    }

    fn activate_standard(&self, code: &str) -> Result<LicenseRecord, TrustgateError> {
        let locks = self.locks.load()?;
        if locks.clone_lock() {
            return Err(TrustgateError::CloneLocked);
        }
        if locks.code() {
            return Err(TrustgateError::CodeLocked);
        }

        let fingerprint = self.fingerprint()?;
        check_standard(code, &fingerprint)?;

        let reading = ClockReading::from_clock(self.clock.as_ref());
        let term = chrono::Duration::from_std(self.config.license_term)
            .ok()
            .and_then(|term| reading.wall.checked_add_signed(term))
            .ok_or_else(|| {
                TrustgateError::ConfigError("license_term is out of range".to_string())
            })?;

        self.records.begin_activation()?;
        self.anchors.refresh(&reading)?;
        let record = self
            .records
            .commit_activation(code, Expiry::At(term), reading.wall, false)?;
        info!(expiry = %term, "license activated");
        Ok(record)
    }

    /// Every persisted fact the lock state depends on.
    pub fn snapshot(&self) -> Result<TrustSnapshot, TrustgateError> {
        Ok(TrustSnapshot {
            record: self.records.load()?,
            locks: self.locks.load()?,
            anchor: self.anchors.load()?,
        })
    }

    /// Current license record.
    pub fn record(&self) -> Result<LicenseRecord, TrustgateError> {
        self.records.load()
    }

    /// Whether an active master license is installed.
    pub fn is_master_license(&self) -> Result<bool, TrustgateError> {
        let record = self.records.load()?;
        Ok(record.is_master && record.active)
    }

    /// Derive the lock state, persisting its effect when `effects` asks to.
    pub fn evaluate(&self, effects: SideEffects) -> Result<LockState, TrustgateError> {
        let snapshot = self.snapshot()?;
        let reading = ClockReading::from_clock(self.clock.as_ref());
        let decision = derive_lock_state(
            &snapshot,
            &reading,
            &DriftThresholds::from_config(&self.config),
        );

        if let Some(signal) = decision.drift {
            warn!(%signal, "clock drift against time anchor");
        }

        if effects == SideEffects::PersistLocksAndAnchors {
            match decision.effect {
                Effect::None => {}
                Effect::EngageTimeLock => self.locks.engage(LockKind::Time)?,
                Effect::DeactivateLicense => {
                    info!("license expired, deactivating");
                    self.records.deactivate()?;
                }
                Effect::RefreshAnchor => self.anchors.refresh(&reading)?,
            }
        }

        debug!(state = %decision.state, ?effects, "license state derived");
        Ok(decision.state)
    }

    /// Validating check: engages the time lock on drift, deactivates an
    /// expired license and refreshes the time anchor.
    pub fn validate_license(&self) -> Result<LockState, TrustgateError> {
        self.evaluate(SideEffects::PersistLocksAndAnchors)
    }

    /// Query-only check for collaborators polling before gated work.
    pub fn check_license_status(&self) -> Result<LockState, TrustgateError> {
        self.evaluate(SideEffects::QueryOnly)
    }

    /// Whether gated work may proceed. Store errors count as not valid.
    pub fn is_license_valid(&self) -> bool {
        match self.check_license_status() {
            Ok(state) => state.is_valid(),
            Err(e) => {
                warn!(error = %e, "license status unavailable");
                false
            }
        }
    }

    /// App-start checkpoint.
    ///
    /// A master license skips the detectors. Otherwise the trust guard runs
    /// first, then a validating check.
    pub fn startup_checkpoint(&self, env: &RuntimeEnvironment) -> Result<LockState, TrustgateError> {
        if !self.is_master_license()? {
            if let Some(kind) = self.guard().run(env)? {
                warn!(lock = %kind, "startup checkpoint engaged lock");
            }
        }
        self.validate_license()
    }

    /// Detector gate for this configuration.
    pub fn guard(&self) -> TrustGuard {
        TrustGuard::from_config(&self.config, self.store.clone())
    }

    /// Network time validator sharing this manager's store and clock.
    ///
    /// Call [`NetworkTimeValidator::spawn_refresh`] on the result to check in
    /// the background.
    pub fn network_time_validator(&self) -> Result<Arc<NetworkTimeValidator>, TrustgateError> {
        NetworkTimeValidator::new(&self.config, self.store.clone(), self.clock.clone()).map(Arc::new)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &TrustgateConfig {
        &self.config
    }
}
