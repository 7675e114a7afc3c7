//! # Trustgate
//!
//! **Device-bound license activation and trust-state checks for Rust.**
//!
//! Trustgate activates license codes bound to a single install, tracks
//! expiry, and answers one question for the rest of the application: may
//! gated work proceed right now?
//!
//! ## Features
//!
//! - **Device-bound codes**: a standard code carries an 8-character prefix
//!   derived from this install's fingerprint
//! - **Master codes**: signed support codes that bypass device binding and
//!   every lock
//! - **Clock tamper detection**: wall clock checked against a persisted
//!   (wall, monotonic) anchor, plus a fail-open network time check
//! - **Permanent locks**: clone, code and time locks can be engaged but never
//!   cleared through the API
//!
//! ## Quickstart
//!
//! ```no_run
//! use trustgate::{LicenseManager, LockState, TrustgateConfig};
//!
//! fn main() -> Result<(), trustgate::TrustgateError> {
//!     let config = TrustgateConfig::new(
//!         "com.example.otoservice",
//!         "your-master-secret",
//!         "otoservice",
//!     );
//!
//!     let manager = LicenseManager::new(config)?;
//!     println!("Device: {}", manager.fingerprint()?);
//!
//!     manager.validate_and_activate("ABCD1234-ISSUED-CODE")?;
//!
//!     if manager.check_license_status()? == LockState::Valid {
//!         println!("License valid!");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Threat Model
//!
//! Trustgate detects:
//! - **Code sharing**: standard codes only activate on the device they were
//!   issued for
//! - **Clock rollback**: moving the wall clock back (or far forward) against
//!   the monotonic clock locks the install
//! - **Cloning apps**: renamed packages, clone-app paths and secondary
//!   profiles engage a clone lock and wipe license data
//!
//! Trustgate does **not** prevent binary patching. Client-side licensing can
//! always be bypassed by a determined attacker with access to the binary.
//!
//! See [`TrustgateConfig`] for configuration.

#![deny(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Crypto layer
pub mod crypto;

// Persistence
pub mod store;

// Device identity and locks
pub mod fingerprint;
pub mod locks;

// Time tamper detection
pub mod time;

// Codes, records and state derivation
pub mod license;

// Clone and tamper detectors
pub mod detect;

// Manager (main public API)
pub mod manager;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::TrustgateConfig;
pub use detect::{RuntimeEnvironment, TrustGuard};
pub use errors::TrustgateError;
pub use license::{Expiry, LicenseRecord, LockState, SideEffects};
pub use locks::{LockKind, TamperLocks};
pub use manager::LicenseManager;
pub use store::{FileStore, MemoryStore, Namespace, TrustStore};
pub use time::{NetworkTimeValidator, TimeVerdict};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
