//! Median absolute deviation.

use crate::core::error::CloudError;
use crate::core::overload::{check_history, median, UtilizationEstimator};

/// Median of absolute deviations from the median of the history.
pub struct MedianAbsoluteDeviation {
    min_history: usize,
}

impl MedianAbsoluteDeviation {
    pub fn new(min_history: usize) -> Self {
        Self { min_history }
    }
}

impl UtilizationEstimator for MedianAbsoluteDeviation {
    fn measure(&self, history: &[f64]) -> Result<f64, CloudError> {
        check_history(history, self.min_history.max(1))?;
        let m = median(history);
        let deviations: Vec<f64> = history.iter().map(|x| (x - m).abs()).collect();
        Ok(median(&deviations))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_mad() {
        let mad = MedianAbsoluteDeviation::new(3);
        // median 0.3, deviations 0.2 0.1 0 0.1 0.6
        assert_relative_eq!(mad.measure(&[0.1, 0.2, 0.3, 0.4, 0.9]).unwrap(), 0.1, epsilon = 1e-9);
        assert!(mad.measure(&[0.1, 0.2]).is_err());
    }
}
