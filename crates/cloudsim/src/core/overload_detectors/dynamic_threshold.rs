//! Threshold adapted to utilization variability.

use crate::core::error::CloudError;
use crate::core::overload::{OverloadDetector, UtilizationEstimator};
use crate::core::overload_detectors::static_threshold::StaticThresholdDetector;

/// Computes the threshold as `1 - safety * measure`, clamped to `[0, 1]`,
/// where the measure comes from the utilization estimator.
///
/// With higher variability of the past utilization the threshold gets lower. If the history is too short
/// for the estimator, the fallback detector decides.
pub struct DynamicThresholdDetector {
    estimator: Box<dyn UtilizationEstimator>,
    safety: f64,
    fallback: StaticThresholdDetector,
}

impl DynamicThresholdDetector {
    pub fn new(estimator: Box<dyn UtilizationEstimator>, safety: f64, fallback: StaticThresholdDetector) -> Self {
        Self {
            estimator,
            safety,
            fallback,
        }
    }

    pub fn threshold(&self, history: &[f64]) -> Result<f64, CloudError> {
        let measure = self.estimator.measure(history)?;
        Ok((1. - self.safety * measure).clamp(0., 1.))
    }
}

impl OverloadDetector for DynamicThresholdDetector {
    fn is_overloaded(&self, history: &[f64], utilization: f64) -> bool {
        match self.threshold(history) {
            Ok(threshold) => utilization > threshold,
            Err(_) => self.fallback.is_overloaded(history, utilization),
        }
    }
}
