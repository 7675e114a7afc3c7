//! License code grammar.
//!
//! Standard: `<8-hex device prefix><10-22 issuer chars>`, 18-30 chars after
//! normalization. The prefix is the first 8 uppercase hex chars of
//! `MD5(fingerprint)`.
//!
//! Master: `MASTER-<YYYYMMDD|UNLIMITED>-<SIG8>[-...]`, where `SIG8` is the
//! first 8 uppercase hex chars of `SHA256("MASTER-" + date + "-" + secret)`.

use crate::crypto::digest::{device_prefix, sha256_hex_upper};
use crate::time::{from_millis, to_millis};
use crate::TrustgateError;
use chrono::{DateTime, NaiveDate, Utc};

/// Leading token of master codes.
pub const MASTER_PREFIX: &str = "MASTER";

/// Date field of a master code that never expires.
pub const UNLIMITED: &str = "UNLIMITED";

/// Minimum normalized length of a standard code.
pub const STANDARD_MIN_LEN: usize = 18;

/// Maximum normalized length of a standard code.
pub const STANDARD_MAX_LEN: usize = 30;

/// Length of the device prefix and of master signatures.
pub const PREFIX_LEN: usize = 8;

/// Trim, strip all whitespace and uppercase.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// When a license stops being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Valid up to and including this instant.
    At(DateTime<Utc>),
    /// Never expires.
    Unlimited,
}

impl Expiry {
    /// Whether `now` is past the expiry.
    pub fn is_elapsed(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiry::At(at) => now > *at,
            Expiry::Unlimited => false,
        }
    }

    /// Persisted form; `Unlimited` is `i64::MAX`.
    pub fn to_millis(&self) -> i64 {
        match self {
            Expiry::At(at) => to_millis(*at),
            Expiry::Unlimited => i64::MAX,
        }
    }

    /// Inverse of [`to_millis`](Self::to_millis).
    pub fn from_millis(millis: i64) -> Self {
        if millis == i64::MAX {
            Expiry::Unlimited
        } else {
            Expiry::At(from_millis(millis))
        }
    }
}

/// A normalized code, classified by grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseCode {
    /// Starts with `MASTER`.
    Master(String),
    /// Anything else.
    Standard(String),
}

impl LicenseCode {
    /// Normalize and classify a raw user-entered code.
    pub fn parse(raw: &str) -> Self {
        let code = normalize(raw);
        if code.starts_with(MASTER_PREFIX) {
            LicenseCode::Master(code)
        } else {
            LicenseCode::Standard(code)
        }
    }

    /// The normalized text.
    pub fn as_str(&self) -> &str {
        match self {
            LicenseCode::Master(code) | LicenseCode::Standard(code) => code,
        }
    }
}

/// Check a normalized standard code against this device's fingerprint.
///
/// # Errors
/// * `InvalidFormat` - length outside 18..=30
/// * `DeviceMismatch` - prefix is not bound to `fingerprint`
pub fn check_standard(code: &str, fingerprint: &str) -> Result<(), TrustgateError> {
    let len = code.chars().count();
    if !(STANDARD_MIN_LEN..=STANDARD_MAX_LEN).contains(&len) {
        return Err(TrustgateError::InvalidFormat);
    }

    let expected = device_prefix(fingerprint);
    if code.get(..PREFIX_LEN) != Some(expected.as_str()) {
        return Err(TrustgateError::DeviceMismatch);
    }

    Ok(())
}

/// Issuer signature for a master date field.
pub fn master_signature(date_field: &str, secret: &str) -> String {
    let digest = sha256_hex_upper(&format!("{}-{}-{}", MASTER_PREFIX, date_field, secret));
    digest[..PREFIX_LEN].to_string()
}

/// A structurally valid master code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterCode {
    /// Full normalized code.
    pub code: String,
    /// `YYYYMMDD` or `UNLIMITED`.
    pub date_field: String,
    /// Parsed expiry.
    pub expiry: Expiry,
    /// Claimed signature.
    pub signature: String,
}

impl MasterCode {
    /// Parse a normalized master code. Fields after the third are ignored.
    ///
    /// # Errors
    /// * `MasterFormatInvalid` - fewer than 4 fields, bad prefix or bad date
    pub fn parse(code: &str) -> Result<Self, TrustgateError> {
        let parts: Vec<&str> = code.split('-').collect();
        if parts.len() < 4 || parts[0] != MASTER_PREFIX {
            return Err(TrustgateError::MasterFormatInvalid);
        }

        let date_field = parts[1];
        let expiry = if date_field == UNLIMITED {
            Expiry::Unlimited
        } else {
            Expiry::At(parse_date8(date_field).ok_or(TrustgateError::MasterFormatInvalid)?)
        };

        Ok(Self {
            code: code.to_string(),
            date_field: date_field.to_string(),
            expiry,
            signature: parts[2].to_string(),
        })
    }

    /// Check expiry, then the signature.
    ///
    /// # Errors
    /// * `MasterExpired` - `now` is past the expiry
    /// * `MasterSignatureInvalid` - signature does not match
    pub fn verify(&self, secret: &str, now: DateTime<Utc>) -> Result<(), TrustgateError> {
        if self.expiry.is_elapsed(now) {
            return Err(TrustgateError::MasterExpired);
        }
        if self.signature != master_signature(&self.date_field, secret) {
            return Err(TrustgateError::MasterSignatureInvalid);
        }
        Ok(())
    }
}

/// `YYYYMMDD` to midnight UTC of that day.
fn parse_date8(field: &str) -> Option<DateTime<Utc>> {
    if field.len() != 8 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(field, "%Y%m%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "test-master-secret";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn signed(date_field: &str) -> String {
        format!("MASTER-{}-{}-X", date_field, master_signature(date_field, SECRET))
    }

    #[test]
    fn test_normalize_strips_whitespace_and_uppercases() {
        assert_eq!(normalize("  ab cd\nef\t12 \r\n"), "ABCDEF12");
    }

    #[test]
    fn test_classify() {
        assert!(matches!(LicenseCode::parse(" master-x"), LicenseCode::Master(_)));
        assert!(matches!(LicenseCode::parse("abcd1234"), LicenseCode::Standard(_)));
        assert_eq!(LicenseCode::parse("ab cd").as_str(), "ABCD");
    }

    #[test]
    fn test_master_signature_shape() {
        let sig = master_signature("20991231", SECRET);
        assert_eq!(sig.len(), 8);
        assert_eq!(sig, sig.to_ascii_uppercase());
        assert_eq!(
            sig,
            sha256_hex_upper(&format!("MASTER-20991231-{}", SECRET))[..8]
        );
    }

    #[test]
    fn test_master_valid() {
        let code = MasterCode::parse(&signed("20991231")).unwrap();
        assert_eq!(
            code.expiry,
            Expiry::At(Utc.with_ymd_and_hms(2099, 12, 31, 0, 0, 0).unwrap())
        );
        assert!(code.verify(SECRET, now()).is_ok());
    }

    #[test]
    fn test_master_unlimited() {
        let code = MasterCode::parse(&signed("UNLIMITED")).unwrap();
        assert_eq!(code.expiry, Expiry::Unlimited);
        assert!(code.verify(SECRET, DateTime::<Utc>::MAX_UTC).is_ok());
    }

    #[test]
    fn test_master_trailing_fields_ignored() {
        let code = format!("{}-MORE-FIELDS", signed("20991231"));
        assert!(MasterCode::parse(&code).unwrap().verify(SECRET, now()).is_ok());
    }

    #[test]
    fn test_master_too_few_fields() {
        let code = format!("MASTER-20991231-{}", master_signature("20991231", SECRET));
        assert_eq!(
            MasterCode::parse(&code),
            Err(TrustgateError::MasterFormatInvalid)
        );
    }

    #[test]
    fn test_master_bad_prefix_field() {
        assert_eq!(
            MasterCode::parse("MASTERX-20991231-ABCDEF12-X"),
            Err(TrustgateError::MasterFormatInvalid)
        );
    }

    #[test]
    fn test_master_bad_date() {
        assert_eq!(
            MasterCode::parse("MASTER-20991399-ABCDEF12-X"),
            Err(TrustgateError::MasterFormatInvalid)
        );
        assert_eq!(
            MasterCode::parse("MASTER-2099123-ABCDEF12-X"),
            Err(TrustgateError::MasterFormatInvalid)
        );
    }

    #[test]
    fn test_master_forged_signature() {
        let code = MasterCode::parse("MASTER-20991231-00000000-X").unwrap();
        assert_eq!(
            code.verify(SECRET, now()),
            Err(TrustgateError::MasterSignatureInvalid)
        );
    }

    #[test]
    fn test_master_altered_date_breaks_signature() {
        let sig = master_signature("20991231", SECRET);
        let code = MasterCode::parse(&format!("MASTER-20991230-{}-X", sig)).unwrap();
        assert_eq!(
            code.verify(SECRET, now()),
            Err(TrustgateError::MasterSignatureInvalid)
        );
    }

    #[test]
    fn test_master_expired() {
        let code = MasterCode::parse(&signed("20240101")).unwrap();
        assert_eq!(code.verify(SECRET, now()), Err(TrustgateError::MasterExpired));
    }

    #[test]
    fn test_standard_accepts_bound_code() {
        let fp = "DEV-1234-ABCD-5678";
        let code = format!("{}ISSUER0001", device_prefix(fp));
        assert_eq!(code.len(), 18);
        assert!(check_standard(&code, fp).is_ok());
    }

    #[test]
    fn test_standard_length_bounds() {
        let fp = "DEV-1234-ABCD-5678";
        let prefix = device_prefix(fp);
        let short = format!("{}{}", prefix, "X".repeat(9));
        let long = format!("{}{}", prefix, "X".repeat(23));
        let max = format!("{}{}", prefix, "X".repeat(22));
        assert_eq!(check_standard(&short, fp), Err(TrustgateError::InvalidFormat));
        assert_eq!(check_standard(&long, fp), Err(TrustgateError::InvalidFormat));
        assert!(check_standard(&max, fp).is_ok());
    }

    #[test]
    fn test_standard_wrong_device() {
        let code = format!("{}ISSUER0001", device_prefix("DEV-0000-0000-0000"));
        assert_eq!(
            check_standard(&code, "DEV-1234-ABCD-5678"),
            Err(TrustgateError::DeviceMismatch)
        );
    }

    #[test]
    fn test_expiry_persisted_form() {
        assert_eq!(Expiry::Unlimited.to_millis(), i64::MAX);
        assert_eq!(Expiry::from_millis(i64::MAX), Expiry::Unlimited);
        let at = Expiry::At(now());
        assert_eq!(Expiry::from_millis(at.to_millis()), at);
    }

    #[test]
    fn test_expiry_boundary() {
        let at = Expiry::At(now());
        assert!(!at.is_elapsed(now()));
        assert!(at.is_elapsed(now() + chrono::Duration::milliseconds(1)));
        assert!(!Expiry::Unlimited.is_elapsed(DateTime::<Utc>::MAX_UTC));
    }
}
