//! Host overload detection.

use crate::core::config::{parse_config_value, parse_option, parse_options};
use crate::core::error::CloudError;
use crate::core::overload_detectors::dynamic_threshold::DynamicThresholdDetector;
use crate::core::overload_detectors::iqr::InterQuartileRange;
use crate::core::overload_detectors::local_regression::LocalRegressionDetector;
use crate::core::overload_detectors::mad::MedianAbsoluteDeviation;
use crate::core::overload_detectors::static_threshold::StaticThresholdDetector;

/// Statistical measure of host utilization variability.
pub trait UtilizationEstimator {
    /// Computes the measure over utilization history (fractions of host capacity, oldest first).
    ///
    /// Fails with [`CloudError::InsufficientHistory`] if the history is shorter than the configured minimum.
    fn measure(&self, history: &[f64]) -> Result<f64, CloudError>;
}

/// Decides whether a host is overloaded.
///
/// Implementations never fail: when their statistics cannot be computed they fall back to a simpler rule.
pub trait OverloadDetector {
    /// `history` holds past utilization values of the host (oldest first),
    /// `utilization` is the current or planned one.
    fn is_overloaded(&self, history: &[f64], utilization: f64) -> bool;
}

pub(crate) fn check_history(history: &[f64], required: usize) -> Result<(), CloudError> {
    if history.len() < required {
        return Err(CloudError::InsufficientHistory {
            available: history.len(),
            required,
        });
    }
    Ok(())
}

pub(crate) fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n == 0 {
        return 0.;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.
    }
}

pub fn overload_detector_resolver(config_str: &str) -> Result<Box<dyn OverloadDetector>, CloudError> {
    let (detector_name, options) = parse_config_value(config_str);
    let options = parse_options(&options.unwrap_or_default());
    let fallback = StaticThresholdDetector::new(parse_option(&options, "fallback", 0.7)?);
    match detector_name.as_str() {
        "StaticThreshold" => Ok(Box::new(StaticThresholdDetector::new(parse_option(
            &options,
            "threshold",
            0.9,
        )?))),
        "Mad" => Ok(Box::new(DynamicThresholdDetector::new(
            Box::new(MedianAbsoluteDeviation::new(parse_option(&options, "min_history", 12)?)),
            parse_option(&options, "safety", 2.5)?,
            fallback,
        ))),
        "Iqr" => Ok(Box::new(DynamicThresholdDetector::new(
            Box::new(InterQuartileRange::new(parse_option(&options, "min_history", 12)?)),
            parse_option(&options, "safety", 1.5)?,
            fallback,
        ))),
        "LocalRegression" => Ok(Box::new(LocalRegressionDetector::new(
            parse_option(&options, "safety", 1.2)?,
            parse_option(&options, "horizon", 1.)?,
            parse_option(&options, "min_history", 10)?,
            fallback,
        ))),
        _ => Err(CloudError::Config(format!("unknown overload detector: {}", config_str))),
    }
}
