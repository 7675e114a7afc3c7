//! MD5 and SHA-256 hex digests.
//!
//! MD5 is used for stable uniqueness only (fingerprints, device prefixes),
//! never for secrecy.

use md5::Md5;
use sha2::{Digest, Sha256};

/// Lowercase hex MD5 of `input`.
pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Uppercase hex SHA-256 of `input`.
pub fn sha256_hex_upper(input: &str) -> String {
    hex::encode_upper(Sha256::digest(input.as_bytes()))
}

/// First 8 uppercase hex characters of `MD5(fingerprint)`.
///
/// Standard license codes must start with this prefix.
pub fn device_prefix(fingerprint: &str) -> String {
    md5_hex(fingerprint)[..8].to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_empty() {
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_md5_known_vector() {
        assert_eq!(md5_hex("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex_upper("abc"),
            "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD"
        );
    }

    #[test]
    fn test_device_prefix_is_upper_md5_prefix() {
        assert_eq!(device_prefix("abc"), "90015098");
        assert_eq!(device_prefix("DEV-1234-5678-9ABC").len(), 8);
    }
}
