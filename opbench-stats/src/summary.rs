//! Summary Statistics
//!
//! Distribution summary of one metric over all retained samples. Mean and
//! standard deviation follow the same population semantics as
//! [`Dispersion`](crate::Dispersion).

use crate::dispersion::Dispersion;
use crate::percentiles::{percentile_of_sorted, sorted_copy};

/// Summary of a sample distribution
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryStatistics {
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
    /// 50th percentile
    pub median: f64,
    /// 99th percentile
    pub p99: f64,
    /// Number of samples summarised
    pub sample_count: usize,
}

/// Summarise `samples`. An empty slice yields an all-zero summary.
pub fn compute_summary(samples: &[f64]) -> SummaryStatistics {
    let Some(Dispersion { mean, std_dev }) = Dispersion::from_samples(samples) else {
        return SummaryStatistics::default();
    };
    let sorted = sorted_copy(samples);

    SummaryStatistics {
        mean,
        std_dev,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        median: percentile_of_sorted(&sorted, 50.0),
        p99: percentile_of_sorted(&sorted, 99.0),
        sample_count: samples.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_summary() {
        let summary = compute_summary(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(summary.mean, 3.0);
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 5.0);
        assert_eq!(summary.sample_count, 5);
        assert!((summary.std_dev - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_outliers_are_kept() {
        let summary = compute_summary(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]);
        assert_eq!(summary.max, 100.0);
        assert!(summary.mean > 15.0);
    }

    #[test]
    fn test_flat_samples_have_zero_spread() {
        let flat = compute_summary(&[100.0; 5]);
        assert_eq!(flat.std_dev, 0.0);
        assert_eq!(flat.p99, 100.0);
    }

    #[test]
    fn test_empty_samples() {
        let summary = compute_summary(&[]);
        assert_eq!(summary.sample_count, 0);
        assert_eq!(summary.mean, 0.0);
    }
}
