//! Trustgate error types.

use thiserror::Error;

/// Errors that can occur during license activation and trust-state checks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrustgateError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Trust store I/O error.
    #[error("Trust store I/O error: {0}")]
    StoreIO(String),

    /// License code is malformed (length or structure).
    #[error("License code has an invalid format")]
    InvalidFormat,

    /// Standard code is not bound to this device.
    #[error("License code is not valid for this device")]
    DeviceMismatch,

    /// Master code does not follow `MASTER-<date>-<sig>-...`.
    #[error("Master license format is invalid")]
    MasterFormatInvalid,

    /// Master code signature does not match the issuer signature.
    #[error("Master license signature is invalid")]
    MasterSignatureInvalid,

    /// Master code validity window has elapsed.
    #[error("Master license has expired")]
    MasterExpired,

    /// A clone lock is recorded for this install.
    #[error("This application cannot run in a cloned, copied or unsupported environment")]
    CloneLocked,

    /// A code-tamper lock is recorded for this install.
    #[error("Application code tampering was detected; this installation can no longer be used")]
    CodeLocked,
}

impl TrustgateError {
    /// Whether the user may retry with a different code.
    ///
    /// Lock errors are terminal for the install: only a reinstall or full
    /// data wipe recovers.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TrustgateError::InvalidFormat
                | TrustgateError::DeviceMismatch
                | TrustgateError::MasterFormatInvalid
                | TrustgateError::MasterSignatureInvalid
                | TrustgateError::MasterExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_errors_are_recoverable() {
        assert!(TrustgateError::InvalidFormat.is_recoverable());
        assert!(TrustgateError::DeviceMismatch.is_recoverable());
        assert!(TrustgateError::MasterSignatureInvalid.is_recoverable());
    }

    #[test]
    fn test_lock_errors_are_terminal() {
        assert!(!TrustgateError::CloneLocked.is_recoverable());
        assert!(!TrustgateError::CodeLocked.is_recoverable());
        assert!(!TrustgateError::StoreIO("disk".to_string()).is_recoverable());
    }
}
