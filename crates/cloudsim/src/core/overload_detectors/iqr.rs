//! Inter-quartile range.

use crate::core::error::CloudError;
use crate::core::overload::{check_history, UtilizationEstimator};

/// Difference between the third and the first quartiles of the history.
///
/// Quartile positions are `round(0.25 * (n + 1))` and `round(0.75 * (n + 1))` in the sorted history (1-based).
pub struct InterQuartileRange {
    min_history: usize,
}

impl InterQuartileRange {
    pub fn new(min_history: usize) -> Self {
        Self { min_history }
    }
}

fn quartile_index(q: f64, n: usize) -> usize {
    let position = (q * (n + 1) as f64 + 0.5).floor() as usize;
    position.clamp(1, n) - 1
}

impl UtilizationEstimator for InterQuartileRange {
    fn measure(&self, history: &[f64]) -> Result<f64, CloudError> {
        check_history(history, self.min_history.max(1))?;
        let mut sorted = history.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        Ok(sorted[quartile_index(0.75, n)] - sorted[quartile_index(0.25, n)])
    }
}
