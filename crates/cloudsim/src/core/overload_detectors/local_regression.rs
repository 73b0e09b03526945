//! Local regression over recent utilization.

use crate::core::error::CloudError;
use crate::core::overload::{check_history, OverloadDetector};
use crate::core::overload_detectors::static_threshold::StaticThresholdDetector;

/// Predicts future utilization with tricube-weighted least squares over the last `min_history` samples.
///
/// The host is overloaded when `safety * predicted >= 1`, where the prediction is made `horizon` scheduling
/// intervals ahead of the newest sample. If the history is too short, the fallback detector decides.
pub struct LocalRegressionDetector {
    safety: f64,
    horizon: f64,
    min_history: usize,
    fallback: StaticThresholdDetector,
}

impl LocalRegressionDetector {
    pub fn new(safety: f64, horizon: f64, min_history: usize, fallback: StaticThresholdDetector) -> Self {
        Self {
            safety,
            horizon,
            min_history: min_history.max(2),
            fallback,
        }
    }

    /// Returns intercept and slope of the weighted regression line, x is the sample index.
    fn fit(window: &[f64]) -> (f64, f64) {
        let n = window.len() as f64;
        let mut sum_w = 0.;
        let mut sum_wx = 0.;
        let mut sum_wy = 0.;
        let weights: Vec<f64> = (0..window.len())
            .map(|i| {
                let distance = (n - 1. - i as f64) / n;
                (1. - distance.powi(3)).powi(3)
            })
            .collect();
        for (i, (&w, &y)) in weights.iter().zip(window).enumerate() {
            sum_w += w;
            sum_wx += w * i as f64;
            sum_wy += w * y;
        }
        let mean_x = sum_wx / sum_w;
        let mean_y = sum_wy / sum_w;
        let mut sxx = 0.;
        let mut sxy = 0.;
        for (i, (&w, &y)) in weights.iter().zip(window).enumerate() {
            let dx = i as f64 - mean_x;
            sxx += w * dx * dx;
            sxy += w * dx * (y - mean_y);
        }
        let slope = if sxx > 0. { sxy / sxx } else { 0. };
        (mean_y - slope * mean_x, slope)
    }

    pub fn predict(&self, history: &[f64]) -> Result<f64, CloudError> {
        check_history(history, self.min_history)?;
        let window = &history[history.len() - self.min_history..];
        let (intercept, slope) = Self::fit(window);
        Ok(intercept + slope * ((window.len() - 1) as f64 + self.horizon))
    }
}

impl OverloadDetector for LocalRegressionDetector {
    fn is_overloaded(&self, history: &[f64], utilization: f64) -> bool {
        match self.predict(history) {
            Ok(predicted) => {
                // planned load changes shift the prediction
                let shift = history.last().map_or(0., |last| utilization - last);
                self.safety * (predicted + shift) >= 1.
            }
            Err(_) => self.fallback.is_overloaded(history, utilization),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn detector() -> LocalRegressionDetector {
        LocalRegressionDetector::new(1.2, 1., 10, StaticThresholdDetector::new(0.7))
    }

    #[test]
    fn test_linear_trend_is_extrapolated() {
        let history: Vec<f64> = (1..=10).map(|i| i as f64 * 0.05).collect();
        assert_relative_eq!(detector().predict(&history).unwrap(), 0.55, epsilon = 1e-9);
        // 1.2 * 0.55 < 1
        assert!(!detector().is_overloaded(&history, 0.5));

        let growing: Vec<f64> = (1..=10).map(|i| i as f64 * 0.09).collect();
        assert!(detector().is_overloaded(&growing, 0.9));
    }

    #[test]
    fn test_only_recent_samples_are_used() {
        let mut history = vec![1.; 20];
        history.extend(vec![0.3; 10]);
        assert_relative_eq!(detector().predict(&history).unwrap(), 0.3, epsilon = 1e-9);
        assert!(!detector().is_overloaded(&history, 0.3));
        // planned utilization raises the prediction
        assert!(detector().is_overloaded(&history, 0.9));
    }

    #[test]
    fn test_short_history_uses_fallback() {
        assert!(detector().predict(&[0.9; 5]).is_err());
        assert!(detector().is_overloaded(&[0.9; 5], 0.75));
        assert!(!detector().is_overloaded(&[], 0.6));
    }
}
