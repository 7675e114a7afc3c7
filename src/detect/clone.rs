//! Clone and sandbox heuristics.

use crate::detect::{contains_keyword, Detector, DetectorSet, RuntimeEnvironment};

/// Application identity differs from the expected one.
pub struct IdentityMismatch {
    /// Expected identity.
    pub expected: &'static str,
}

impl Detector for IdentityMismatch {
    fn name(&self) -> &'static str {
        "identity-mismatch"
    }

    fn detect(&self, env: &RuntimeEnvironment) -> bool {
        env.app_id != self.expected
    }
}

/// Architecture names that contain clone keywords (`_64`). Removed before
/// matching so target-triple and multiarch paths stay quiet.
pub const ARCH_TOKENS: &[&str] = &["x86_64"];

/// `text` lowercased with [`ARCH_TOKENS`] removed.
fn without_arch_tokens(text: &str) -> String {
    ARCH_TOKENS
        .iter()
        .fold(text.to_lowercase(), |acc, token| acc.replace(token, ""))
}

/// Clone keyword in the label, data directory or native library path.
pub struct CloneKeywords {
    /// Keywords, matched case-insensitively.
    pub keywords: &'static [&'static str],
}

impl Detector for CloneKeywords {
    fn name(&self) -> &'static str {
        "clone-keywords"
    }

    fn detect(&self, env: &RuntimeEnvironment) -> bool {
        [&env.display_label, &env.data_dir, &env.native_lib_dir]
            .iter()
            .any(|text| contains_keyword(&without_arch_tokens(text), self.keywords))
    }
}

/// Data directory under `/data/user/<n>/` with `n` above the usual range
/// for primary and work profiles.
pub struct ForeignUserDataDir;

/// Highest user id treated as a regular profile.
pub const MAX_REGULAR_USER_ID: u64 = 10;

impl Detector for ForeignUserDataDir {
    fn name(&self) -> &'static str {
        "foreign-user-data-dir"
    }

    fn detect(&self, env: &RuntimeEnvironment) -> bool {
        data_dir_user_id(&env.data_dir).is_some_and(|id| id > MAX_REGULAR_USER_ID)
    }
}

/// User id from a `/data/user/<n>/...` path.
pub fn data_dir_user_id(data_dir: &str) -> Option<u64> {
    const MARKER: &str = "/data/user/";
    let start = data_dir.find(MARKER)? + MARKER.len();
    let rest = &data_dir[start..];
    let end = rest.find('/')?;
    rest[..end].parse().ok()
}

/// Running in a non-primary OS user profile.
pub struct SecondaryProfile;

impl Detector for SecondaryProfile {
    fn name(&self) -> &'static str {
        "secondary-profile"
    }

    fn detect(&self, env: &RuntimeEnvironment) -> bool {
        env.profile_serial.is_some_and(|serial| serial != 0)
    }
}

/// Process name differs from the application identity and carries a clone
/// keyword.
pub struct ProcessIdentity {
    /// Keywords, matched case-insensitively.
    pub keywords: &'static [&'static str],
}

impl Detector for ProcessIdentity {
    fn name(&self) -> &'static str {
        "process-identity"
    }

    fn detect(&self, env: &RuntimeEnvironment) -> bool {
        match env.process_name.as_deref() {
            Some(name) if !name.is_empty() && name != env.app_id => {
                contains_keyword(&without_arch_tokens(name), self.keywords)
            }
            _ => false,
        }
    }
}

/// Default clone heuristics, in evaluation order.
pub fn clone_detectors(
    expected_app_id: &'static str,
    keywords: &'static [&'static str],
) -> DetectorSet {
    DetectorSet::new()
        .with(IdentityMismatch {
            expected: expected_app_id,
        })
        .with(CloneKeywords { keywords })
        .with(ForeignUserDataDir)
        .with(SecondaryProfile)
        .with(ProcessIdentity { keywords })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CLONE_KEYWORDS;

    const APP: &str = "com.example.otoservice";

    fn genuine() -> RuntimeEnvironment {
        RuntimeEnvironment {
            app_id: APP.to_string(),
            display_label: "OtoService".to_string(),
            data_dir: "/data/user/0/com.example.otoservice".to_string(),
            native_lib_dir: "/data/app/com.example.otoservice-1/lib/arm".to_string(),
            process_name: Some(APP.to_string()),
            profile_serial: Some(0),
            debuggable: false,
            registered_units: vec![],
        }
    }

    fn detectors() -> DetectorSet {
        clone_detectors(APP, DEFAULT_CLONE_KEYWORDS)
    }

    #[test]
    fn test_genuine_environment_passes() {
        assert_eq!(detectors().first_finding(&genuine()), None);
    }

    #[test]
    fn test_renamed_package() {
        let mut env = genuine();
        env.app_id = "com.example.otoservice.x".to_string();
        env.process_name = Some(env.app_id.clone());
        assert_eq!(detectors().first_finding(&env), Some("identity-mismatch"));
    }

    #[test]
    fn test_keyword_in_label() {
        let mut env = genuine();
        env.display_label = "OtoService (Dual)".to_string();
        assert_eq!(detectors().first_finding(&env), Some("clone-keywords"));
    }

    #[test]
    fn test_keyword_in_data_dir() {
        let mut env = genuine();
        env.data_dir = "/data/data/com.lbe.parallel/files/com.example.otoservice".to_string();
        assert_eq!(detectors().first_finding(&env), Some("clone-keywords"));
    }

    #[test]
    fn test_target_triple_exe_dir_passes() {
        let mut env = genuine();
        env.native_lib_dir = "/home/alice/proj/target/x86_64-unknown-linux-gnu/release".to_string();
        assert_eq!(detectors().first_finding(&env), None);

        env.native_lib_dir = "/usr/lib/x86_64-linux-gnu".to_string();
        assert_eq!(detectors().first_finding(&env), None);
    }

    #[test]
    fn test_keyword_beside_arch_token_still_found() {
        let mut env = genuine();
        env.native_lib_dir = "/opt/X86_64/app_64/lib".to_string();
        assert_eq!(detectors().first_finding(&env), Some("clone-keywords"));
    }

    #[test]
    fn test_high_user_id() {
        let mut env = genuine();
        env.data_dir = "/data/user/42/com.example.otoservice".to_string();
        assert_eq!(detectors().first_finding(&env), Some("foreign-user-data-dir"));
    }

    #[test]
    fn test_data_dir_user_id_parsing() {
        assert_eq!(data_dir_user_id("/data/user/0/x"), Some(0));
        assert_eq!(data_dir_user_id("/data/user/11/x"), Some(11));
        assert_eq!(data_dir_user_id("/data/data/x"), None);
        assert_eq!(data_dir_user_id("/data/user/abc/x"), None);
    }

    #[test]
    fn test_secondary_profile() {
        let mut env = genuine();
        env.profile_serial = Some(10);
        assert_eq!(detectors().first_finding(&env), Some("secondary-profile"));
    }

    #[test]
    fn test_unknown_profile_passes() {
        let mut env = genuine();
        env.profile_serial = None;
        assert!(!SecondaryProfile.detect(&env));
    }

    #[test]
    fn test_process_name_with_keyword() {
        let mut env = genuine();
        env.process_name = Some("com.example.otoservice:sandboxed".to_string());
        assert_eq!(detectors().first_finding(&env), Some("process-identity"));
    }

    #[test]
    fn test_process_name_differs_without_keyword() {
        let mut env = genuine();
        env.process_name = Some("com.example.otoservice:remote".to_string());
        let detector = ProcessIdentity {
            keywords: DEFAULT_CLONE_KEYWORDS,
        };
        assert!(!detector.detect(&env));
    }
}
