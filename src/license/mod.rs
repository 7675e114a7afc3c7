//! License codes, persisted records and lock-state derivation.

pub mod code;
pub mod record;
pub mod state;

pub use code::{normalize, Expiry, LicenseCode, MasterCode};
pub use record::{LicenseRecord, LicenseRecordStore};
pub use state::{derive_lock_state, Effect, LockDecision, LockState, SideEffects, TrustSnapshot};
