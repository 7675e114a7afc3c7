//! Code integrity heuristics.

use crate::detect::{Detector, DetectorSet, RuntimeEnvironment};

/// A critical code unit is not registered in this build.
pub struct MissingCriticalUnits {
    /// Units that must be present.
    pub units: &'static [&'static str],
}

impl Detector for MissingCriticalUnits {
    fn name(&self) -> &'static str {
        "missing-critical-units"
    }

    fn detect(&self, env: &RuntimeEnvironment) -> bool {
        self.units
            .iter()
            .any(|unit| !env.registered_units.iter().any(|r| r == unit))
    }
}

/// Runtime-recomputed signature differs from the expected constant.
pub struct SignatureMismatch {
    /// Components joined with `_`.
    pub components: &'static [&'static str],
    /// Expected joined value.
    pub expected: &'static str,
}

impl SignatureMismatch {
    /// Recompute the signature.
    pub fn runtime_signature(&self) -> String {
        self.components.join("_")
    }
}

impl Detector for SignatureMismatch {
    fn name(&self) -> &'static str {
        "signature-mismatch"
    }

    fn detect(&self, _env: &RuntimeEnvironment) -> bool {
        self.runtime_signature() != self.expected
    }
}

/// Application identity differs from the constant compiled into the build.
pub struct PackageTampered {
    /// Expected identity.
    pub expected: &'static str,
}

impl Detector for PackageTampered {
    fn name(&self) -> &'static str {
        "package-tampered"
    }

    fn detect(&self, env: &RuntimeEnvironment) -> bool {
        env.app_id != self.expected
    }
}

/// Default integrity heuristics, in evaluation order.
///
/// The signature check is skipped when no expected signature is configured.
pub fn tamper_detectors(
    expected_app_id: &'static str,
    critical_units: &'static [&'static str],
    signature_components: &'static [&'static str],
    expected_signature: &'static str,
) -> DetectorSet {
    let mut set = DetectorSet::new().with(MissingCriticalUnits {
        units: critical_units,
    });
    if !expected_signature.is_empty() {
        set = set.with(SignatureMismatch {
            components: signature_components,
            expected: expected_signature,
        });
    }
    set.with(PackageTampered {
        expected: expected_app_id,
    })
}
