//! Runs the detector sets and records findings.

use crate::config::TrustgateConfig;
use crate::detect::clone::clone_detectors;
use crate::detect::tamper::tamper_detectors;
use crate::detect::{DetectorSet, RuntimeEnvironment};
use crate::locks::{LockKind, TamperLockState};
use crate::store::{Namespace, TrustStore};
use crate::TrustgateError;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Anti-clone / anti-tamper gate.
///
/// A finding engages the matching permanent lock first and then wipes the
/// license, app-selection and location namespaces.
pub struct TrustGuard {
    tamper: DetectorSet,
    clone: DetectorSet,
    locks: TamperLockState,
    store: Arc<dyn TrustStore>,
    bypass: bool,
}

impl TrustGuard {
    /// Guard with the default detectors for `config`.
    pub fn from_config(config: &TrustgateConfig, store: Arc<dyn TrustStore>) -> Self {
        let tamper = tamper_detectors(
            config.app_id,
            config.critical_units,
            config.signature_components,
            config.expected_code_signature,
        );
        let clone = clone_detectors(config.app_id, config.clone_keywords);
        Self::with_detectors(tamper, clone, store).bypass(config.debug_bypass)
    }

    /// Guard with explicit detector sets.
    pub fn with_detectors(
        tamper: DetectorSet,
        clone: DetectorSet,
        store: Arc<dyn TrustStore>,
    ) -> Self {
        Self {
            tamper,
            clone,
            locks: TamperLockState::new(store.clone()),
            store,
            bypass: false,
        }
    }

    /// Skip every detector.
    #[must_use]
    pub fn bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }

    /// Run tamper detectors, then clone detectors.
    ///
    /// Returns the lock engaged by this run, if any. Developer builds
    /// (`env.debuggable`) and bypassed guards never report a finding.
    pub fn run(&self, env: &RuntimeEnvironment) -> Result<Option<LockKind>, TrustgateError> {
        if self.bypass || env.debuggable {
            debug!("trust guard bypassed");
            return Ok(None);
        }

        if let Some(detector) = self.tamper.first_finding(env) {
            error!(detector, "code tampering detected");
            self.handle(LockKind::Code)?;
            return Ok(Some(LockKind::Code));
        }

        if let Some(detector) = self.clone.first_finding(env) {
            error!(detector, "clone environment detected");
            self.handle(LockKind::Clone)?;
            return Ok(Some(LockKind::Clone));
        }

        Ok(None)
    }

    /// Engage `kind`, then wipe user data.
    ///
    /// The lock is re-read after the wipe and engaged again if it did not
    /// survive.
    pub fn handle(&self, kind: LockKind) -> Result<(), TrustgateError> {
        self.locks.engage(kind)?;

        for ns in Namespace::WIPED_ON_TAMPER {
            self.store.clear(ns)?;
        }
        warn!(lock = %kind, "license and user data wiped");

        if !self.locks.load()?.is_set(kind) {
            warn!(lock = %kind, "lock lost during wipe, engaging again");
            self.locks.engage(kind)?;
        }
        Ok(())
    }
}
