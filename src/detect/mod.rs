//! Anti-clone and anti-tamper heuristics.
//!
//! Each heuristic is a [`Detector`]; a [`DetectorSet`] ORs them in order.
//! Any single finding is enough, there is no voting.

pub mod clone;
pub mod env;
pub mod guard;
pub mod tamper;

pub use env::RuntimeEnvironment;
pub use guard::TrustGuard;

/// One independent heuristic.
pub trait Detector: Send + Sync {
    /// Short stable name, used in logs.
    fn name(&self) -> &'static str;

    /// `true` if the heuristic found evidence of cloning or tampering.
    fn detect(&self, env: &RuntimeEnvironment) -> bool;
}

/// Ordered list of detectors composed with logical OR.
#[derive(Default)]
pub struct DetectorSet {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorSet {
    /// Empty set; never reports a finding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a detector.
    #[must_use]
    pub fn with(mut self, detector: impl Detector + 'static) -> Self {
        self.detectors.push(Box::new(detector));
        self
    }

    /// Name of the first detector that fires, if any.
    pub fn first_finding(&self, env: &RuntimeEnvironment) -> Option<&'static str> {
        self.detectors
            .iter()
            .find(|d| d.detect(env))
            .map(|d| d.name())
    }

    /// Detector names in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Number of detectors.
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

/// Case-insensitive match of any keyword in `text`.
pub fn contains_keyword(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .any(|k| !k.is_empty() && lower.contains(&k.to_lowercase()))
}
