//! Fixed utilization threshold.

use crate::core::overload::OverloadDetector;

/// Considers a host overloaded when its utilization exceeds a fixed threshold.
///
/// Also serves as the fallback of statistical detectors.
#[derive(Clone, Debug)]
pub struct StaticThresholdDetector {
    threshold: f64,
}

impl StaticThresholdDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl OverloadDetector for StaticThresholdDetector {
    fn is_overloaded(&self, _history: &[f64], utilization: f64) -> bool {
        utilization > self.threshold
    }
}
