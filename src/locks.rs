//! Permanent tamper locks.
//!
//! Locks are one-way: the API can engage a lock but offers no way to clear
//! one. They live in [`Namespace::Locks`], which tamper wipes never touch.

use crate::store::{Namespace, TrustStore};
use crate::TrustgateError;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Kind of permanent lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKind {
    /// Wall or monotonic clock manipulation.
    Time,
    /// Cloned or sandboxed environment.
    Clone,
    /// Modified application code.
    Code,
}

impl LockKind {
    fn key(&self) -> &'static str {
        match self {
            LockKind::Time => "time_lock",
            LockKind::Clone => "clone_lock",
            LockKind::Code => "code_lock",
        }
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Time => write!(f, "time"),
            LockKind::Clone => write!(f, "clone"),
            LockKind::Code => write!(f, "code"),
        }
    }
}

/// Snapshot of the three lock flags.
///
/// Fields are private; the only mutation is [`TamperLocks::with`], which can
/// only turn a flag on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TamperLocks {
    time: bool,
    clone: bool,
    code: bool,
}

impl TamperLocks {
    /// No lock engaged.
    pub const NONE: TamperLocks = TamperLocks {
        time: false,
        clone: false,
        code: false,
    };

    /// Copy with `kind` engaged.
    #[must_use]
    pub fn with(mut self, kind: LockKind) -> Self {
        match kind {
            LockKind::Time => self.time = true,
            LockKind::Clone => self.clone = true,
            LockKind::Code => self.code = true,
        }
        self
    }

    /// Whether `kind` is engaged.
    pub fn is_set(&self, kind: LockKind) -> bool {
        match kind {
            LockKind::Time => self.time,
            LockKind::Clone => self.clone,
            LockKind::Code => self.code,
        }
    }

    /// Time lock flag.
    pub fn time(&self) -> bool {
        self.time
    }

    /// Clone lock flag.
    pub fn clone_lock(&self) -> bool {
        self.clone
    }

    /// Code lock flag.
    pub fn code(&self) -> bool {
        self.code
    }

    /// Whether any lock is engaged.
    pub fn any(&self) -> bool {
        self.time || self.clone || self.code
    }
}

/// Persistent lock state.
#[derive(Clone)]
pub struct TamperLockState {
    store: Arc<dyn TrustStore>,
}

impl TamperLockState {
    /// Lock state backed by `store`.
    pub fn new(store: Arc<dyn TrustStore>) -> Self {
        Self { store }
    }

    /// Read all flags. Missing flags read as not engaged.
    pub fn load(&self) -> Result<TamperLocks, TrustgateError> {
        let mut locks = TamperLocks::NONE;
        for kind in [LockKind::Time, LockKind::Clone, LockKind::Code] {
            if self
                .store
                .get_bool(Namespace::Locks, kind.key())?
                .unwrap_or(false)
            {
                locks = locks.with(kind);
            }
        }
        Ok(locks)
    }

    /// Permanently engage `kind`.
    pub fn engage(&self, kind: LockKind) -> Result<(), TrustgateError> {
        warn!(lock = %kind, "engaging permanent lock");
        self.store.set_bool(Namespace::Locks, kind.key(), true)
    }
}
