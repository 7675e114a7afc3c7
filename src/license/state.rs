//! Lock-state derivation.
//!
//! [`derive_lock_state`] is a pure function of a [`TrustSnapshot`] and a
//! clock reading. It never writes; it returns the [`Effect`] a validating
//! caller should persist, and the caller decides via [`SideEffects`].

use crate::license::record::LicenseRecord;
use crate::locks::TamperLocks;
use crate::time::anchor::{detect_drift, ClockReading, DriftSignal, DriftThresholds, TimeAnchor};
use std::fmt;

/// Derived license state. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockState {
    /// License usable.
    Valid,
    /// No (complete) active license.
    NoLicense,
    /// License validity window has elapsed.
    Expired,
    /// Clock manipulation detected.
    TimeTamper,
    /// Cloned environment recorded.
    CloneTamper,
    /// Code tampering recorded.
    CodeTamper,
}

impl LockState {
    /// Whether gated work may proceed.
    pub fn is_valid(&self) -> bool {
        matches!(self, LockState::Valid)
    }

    /// Whether the state is terminal for this install.
    pub fn is_tamper(&self) -> bool {
        matches!(
            self,
            LockState::TimeTamper | LockState::CloneTamper | LockState::CodeTamper
        )
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LockState::Valid => "valid",
            LockState::NoLicense => "no license",
            LockState::Expired => "expired",
            LockState::TimeTamper => "time tamper",
            LockState::CloneTamper => "clone tamper",
            LockState::CodeTamper => "code tamper",
        };
        f.write_str(s)
    }
}

/// Whether an evaluation persists its effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffects {
    /// Engage time locks, deactivate expired licenses, refresh the anchor.
    PersistLocksAndAnchors,
    /// Report only.
    QueryOnly,
}

/// Persistence a validating caller applies after a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing to write.
    None,
    /// Permanently engage the time lock.
    EngageTimeLock,
    /// Mark the license inactive.
    DeactivateLicense,
    /// Store the current reading as the new anchor.
    RefreshAnchor,
}

/// Immutable view of every persisted fact the decision depends on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrustSnapshot {
    /// License record.
    pub record: LicenseRecord,
    /// Lock flags.
    pub locks: TamperLocks,
    /// Time anchor, if one was recorded.
    pub anchor: Option<TimeAnchor>,
}

/// Result of [`derive_lock_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockDecision {
    /// Derived state.
    pub state: LockState,
    /// What a validating caller should persist.
    pub effect: Effect,
    /// Drift rule that fired, if any.
    pub drift: Option<DriftSignal>,
}

impl LockDecision {
    fn new(state: LockState, effect: Effect) -> Self {
        Self {
            state,
            effect,
            drift: None,
        }
    }
}

/// Derive the lock state. First match wins:
///
/// 1. master license: valid until its expiry, nothing else applies
/// 2. clone lock
/// 3. code lock
/// 4. no active license, or a standard license without a time anchor
/// 5. time lock, or clock drift against the anchor
/// 6. expired
/// 7. valid
pub fn derive_lock_state(
    snapshot: &TrustSnapshot,
    now: &ClockReading,
    thresholds: &DriftThresholds,
) -> LockDecision {
    let record = &snapshot.record;

    if record.is_master && record.active {
        let state = if record.effective_expiry().is_elapsed(now.wall) {
            LockState::Expired
        } else {
            LockState::Valid
        };
        return LockDecision::new(state, Effect::None);
    }

    if snapshot.locks.clone_lock() {
        return LockDecision::new(LockState::CloneTamper, Effect::None);
    }

    if snapshot.locks.code() {
        return LockDecision::new(LockState::CodeTamper, Effect::None);
    }

    let Some(anchor) = snapshot.anchor.as_ref().filter(|_| record.active) else {
        return LockDecision::new(LockState::NoLicense, Effect::None);
    };

    if snapshot.locks.time() {
        return LockDecision::new(LockState::TimeTamper, Effect::None);
    }

    if let Some(signal) = detect_drift(anchor, now, thresholds) {
        return LockDecision {
            state: LockState::TimeTamper,
            effect: Effect::EngageTimeLock,
            drift: Some(signal),
        };
    }

    if record.effective_expiry().is_elapsed(now.wall) {
        return LockDecision::new(LockState::Expired, Effect::DeactivateLicense);
    }

    LockDecision::new(LockState::Valid, Effect::RefreshAnchor)
}
