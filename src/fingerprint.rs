//! Device fingerprinting for license binding.
//!
//! The fingerprint is computed once per install from a random install id and
//! static device attributes, then cached in the store forever. Later changes
//! to the attributes do not move it.

use crate::crypto::digest::md5_hex;
use crate::store::{Namespace, TrustStore};
use crate::TrustgateError;
use std::env;
use std::sync::Arc;
use tracing::debug;

/// Prefix shared by install ids and fingerprints.
pub const FINGERPRINT_TAG: &str = "DEV-";

const KEY_INSTALL_ID: &str = "install_id";
const KEY_FINGERPRINT: &str = "fingerprint";
const UNKNOWN: &str = "unknown";

/// Static device attributes mixed into the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAttributes {
    /// Vendor or OS family.
    pub vendor: String,
    /// Model or CPU architecture.
    pub model: String,
    /// Platform identifier (machine id, hostname).
    pub platform_id: String,
}

impl DeviceAttributes {
    /// Collect attributes of the current device, substituting `unknown` for
    /// anything unavailable.
    pub fn collect() -> Self {
        Self {
            vendor: non_empty(env::consts::OS.to_string()),
            model: non_empty(env::consts::ARCH.to_string()),
            platform_id: machine_id()
                .or_else(hostname_string)
                .unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

fn non_empty(value: String) -> String {
    if value.trim().is_empty() {
        UNKNOWN.to_string()
    } else {
        value
    }
}

fn hostname_string() -> Option<String> {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
}

fn machine_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Format the first 12 hex chars of `MD5(input)` as `DEV-XXXX-XXXX-XXXX`.
pub fn format_fingerprint(input: &str) -> String {
    let hash = md5_hex(input);
    let hex12 = &hash[..12];
    format!(
        "{}{}-{}-{}",
        FINGERPRINT_TAG,
        &hex12[0..4],
        &hex12[4..8],
        &hex12[8..12]
    )
    .to_ascii_uppercase()
}

/// Derives and permanently caches this install's fingerprint.
pub struct DeviceFingerprintProvider {
    store: Arc<dyn TrustStore>,
    attributes: DeviceAttributes,
}

impl DeviceFingerprintProvider {
    /// Provider over the current device's attributes.
    pub fn new(store: Arc<dyn TrustStore>) -> Self {
        Self::with_attributes(store, DeviceAttributes::collect())
    }

    /// Provider with explicit attributes.
    pub fn with_attributes(store: Arc<dyn TrustStore>, attributes: DeviceAttributes) -> Self {
        Self { store, attributes }
    }

    /// Stable fingerprint of this install.
    ///
    /// The only error path is store I/O; missing platform data never fails.
    pub fn fingerprint(&self) -> Result<String, TrustgateError> {
        if let Some(stored) = self.store.get_string(Namespace::Device, KEY_FINGERPRINT)? {
            if stored.starts_with(FINGERPRINT_TAG) {
                return Ok(stored);
            }
        }

        let install_id = self.install_id()?;
        let combined = format!(
            "{}-{}-{}-{}",
            self.attributes.vendor, self.attributes.model, self.attributes.platform_id, install_id
        );
        let fingerprint = format_fingerprint(&combined);

        self.store
            .set_string(Namespace::Device, KEY_FINGERPRINT, &fingerprint)?;
        debug!(%fingerprint, "device fingerprint created");

        Ok(fingerprint)
    }

    /// Random per-install id, created on first use.
    pub fn install_id(&self) -> Result<String, TrustgateError> {
        if let Some(id) = self.store.get_string(Namespace::Device, KEY_INSTALL_ID)? {
            return Ok(id);
        }

        let uuid = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("{}{}", FINGERPRINT_TAG, &uuid[..12]);
        self.store.set_string(Namespace::Device, KEY_INSTALL_ID, &id)?;
        Ok(id)
    }
}
