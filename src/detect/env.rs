//! Snapshot of the runtime facts the detectors inspect.

use std::path::Path;

/// Facts about the running application, supplied by the platform layer or
/// collected best-effort by [`RuntimeEnvironment::current`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnvironment {
    /// Actual application identity.
    pub app_id: String,
    /// User-visible label.
    pub display_label: String,
    /// Private data directory.
    pub data_dir: String,
    /// Directory holding native libraries (or the executable).
    pub native_lib_dir: String,
    /// OS process name, if readable.
    pub process_name: Option<String>,
    /// Serial of the OS user profile; non-zero means secondary profile.
    pub profile_serial: Option<u64>,
    /// Debug/developer build.
    pub debuggable: bool,
    /// Code units present in this build.
    pub registered_units: Vec<String>,
}

impl RuntimeEnvironment {
    /// Collect what the current process can observe about itself.
    ///
    /// `data_dir` is the store directory. Units listed in `units` are
    /// registered as present.
    pub fn current(data_dir: &Path, units: &[&str]) -> Self {
        let exe = std::env::current_exe().ok();
        let exe_name = exe
            .as_deref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let exe_dir = exe
            .as_deref()
            .and_then(|p| p.parent())
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        Self {
            app_id: exe_name.clone(),
            display_label: exe_name,
            data_dir: data_dir.display().to_string(),
            native_lib_dir: exe_dir,
            process_name: process_name(),
            profile_serial: None,
            debuggable: cfg!(debug_assertions),
            registered_units: units.iter().map(|u| u.to_string()).collect(),
        }
    }
}

fn process_name() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/self/comm")
            .ok()
            .and_then(|s| trim_comm(&s))
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Strip the trailing newline and NUL padding of a `comm` value.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn trim_comm(raw: &str) -> Option<String> {
    let name = raw.trim_end_matches(|c| c == '\n' || c == '\0');
    (!name.is_empty()).then(|| name.to_string())
}
