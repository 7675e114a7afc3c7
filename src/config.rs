//! Trustgate configuration.

use std::time::Duration;

/// Default tolerance for backward clock movement (60 seconds).
pub const DEFAULT_BACKWARD_THRESHOLD: Duration = Duration::from_secs(60);

/// Default maximum forward jump between two observations (7 days).
pub const DEFAULT_MAX_FORWARD_JUMP: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default tolerance between local and network time (5 minutes).
pub const DEFAULT_NETWORK_TOLERANCE: Duration = Duration::from_secs(5 * 60);

/// Default per-attempt connect/read timeout for time servers.
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(3);

/// Default lifetime of a standard license.
pub const DEFAULT_LICENSE_TERM: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Endpoints queried, in order, for a `Date` header.
pub const DEFAULT_TIME_SERVERS: &[&str] = &[
    "https://www.google.com",
    "https://www.cloudflare.com",
    "https://www.microsoft.com",
];

/// Keywords that mark cloning or sandboxing environments.
pub const DEFAULT_CLONE_KEYWORDS: &[&str] = &[
    "clone", "dual", "parallel", "multi", "virtual", "sandbox", "island", "shelter", "profile",
    "copy", "replica", "999", ":p", "_64",
];

/// Configuration for Trustgate.
///
/// Security values are expected to be compile-time constants of the
/// embedding application.
#[derive(Debug, Clone)]
pub struct TrustgateConfig {
    /// Expected application identity (e.g. "com.example.otoservice").
    /// SECURITY: hard-code this, never read it from the environment.
    pub app_id: &'static str,

    /// Shared secret for master code signatures.
    /// SECURITY: hard-code this, never read it from the environment.
    pub master_secret: &'static str,

    /// Expected runtime code signature. Empty disables the signature check.
    pub expected_code_signature: &'static str,

    /// Components joined with `_` to recompute the code signature at runtime.
    pub signature_components: &'static [&'static str],

    /// Code units that must be registered in the running build.
    pub critical_units: &'static [&'static str],

    /// Clone keywords, matched case-insensitively.
    pub clone_keywords: &'static [&'static str],

    /// Store namespace (directory name under the data dir).
    pub store_namespace: &'static str,

    /// Time servers queried in order.
    pub time_servers: &'static [&'static str],

    /// Tolerated backward movement of either clock.
    pub backward_threshold: Duration,

    /// Maximum tolerated forward jump between observations.
    pub max_forward_jump: Duration,

    /// Tolerated difference between local and network time.
    pub network_tolerance: Duration,

    /// Per-attempt network timeout.
    pub network_timeout: Duration,

    /// Lifetime of a freshly activated standard license.
    pub license_term: Duration,

    /// Skip clone/tamper detectors (developer builds only).
    pub debug_bypass: bool,
}

impl TrustgateConfig {
    /// Configuration with default thresholds and endpoints for the given
    /// application identity and master secret.
    pub fn new(
        app_id: &'static str,
        master_secret: &'static str,
        store_namespace: &'static str,
    ) -> Self {
        Self {
            app_id,
            master_secret,
            expected_code_signature: "",
            signature_components: &[],
            critical_units: &[],
            clone_keywords: DEFAULT_CLONE_KEYWORDS,
            store_namespace,
            time_servers: DEFAULT_TIME_SERVERS,
            backward_threshold: DEFAULT_BACKWARD_THRESHOLD,
            max_forward_jump: DEFAULT_MAX_FORWARD_JUMP,
            network_tolerance: DEFAULT_NETWORK_TOLERANCE,
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
            license_term: DEFAULT_LICENSE_TERM,
            debug_bypass: false,
        }
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), crate::TrustgateError> {
        if self.app_id.is_empty() {
            return Err(crate::TrustgateError::ConfigError(
                "app_id cannot be empty".to_string(),
            ));
        }
        if self.master_secret.is_empty() {
            return Err(crate::TrustgateError::ConfigError(
                "master_secret cannot be empty".to_string(),
            ));
        }
        if self.store_namespace.is_empty() {
            return Err(crate::TrustgateError::ConfigError(
                "store_namespace cannot be empty".to_string(),
            ));
        }
        if self.backward_threshold >= self.max_forward_jump {
            return Err(crate::TrustgateError::ConfigError(format!(
                "backward_threshold ({:?}) must be below max_forward_jump ({:?})",
                self.backward_threshold, self.max_forward_jump
            )));
        }
        if self.signature_components.is_empty() != self.expected_code_signature.is_empty() {
            return Err(crate::TrustgateError::ConfigError(
                "signature_components and expected_code_signature must be set together"
                    .to_string(),
            ));
        }
        if self.network_timeout.is_zero() {
            return Err(crate::TrustgateError::ConfigError(
                "network_timeout cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}
