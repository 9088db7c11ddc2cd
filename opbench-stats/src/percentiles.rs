//! Percentile Computation
//!
//! Percentiles are taken over every retained sample. Clock jitter produces
//! both negative and very large differentials; they stay in the data.

/// Percentiles reported alongside the mean/std-dev pair
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Percentiles {
    /// 50th percentile (median)
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 99th percentile
    pub p99: f64,
    /// 99.9th percentile
    pub p999: f64,
}

/// Percentile of an already sorted slice.
///
/// Uses linear interpolation between nearest ranks. `percentile` is in
/// `0.0..=100.0`.
pub(crate) fn percentile_of_sorted(sorted: &[f64], percentile: f64) -> f64 {
    match sorted.len() {
        0 => return 0.0,
        1 => return sorted[0],
        _ => {}
    }

    let n = sorted.len();
    let rank = (percentile / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = (lower_idx + 1).min(n - 1);
    let fraction = rank - lower_idx as f64;

    sorted[lower_idx] + fraction * (sorted[upper_idx] - sorted[lower_idx])
}

/// Compute all standard percentiles with a single sort
pub fn compute_percentiles(samples: &[f64]) -> Percentiles {
    let sorted = sorted_copy(samples);
    Percentiles {
        p50: percentile_of_sorted(&sorted, 50.0),
        p90: percentile_of_sorted(&sorted, 90.0),
        p99: percentile_of_sorted(&sorted, 99.0),
        p999: percentile_of_sorted(&sorted, 99.9),
    }
}

pub(crate) fn sorted_copy(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compute_percentile(samples: &[f64], percentile: f64) -> f64 {
        percentile_of_sorted(&sorted_copy(samples), percentile)
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(compute_percentile(&[5.0, 1.0, 3.0], 50.0), 3.0);
        assert_eq!(compute_percentile(&[4.0, 1.0, 3.0, 2.0], 50.0), 2.5);
    }

    #[test]
    fn test_negative_differentials_sort_first() {
        let samples = [12.0, -7.0, 3.0, -1.0, 0.0];
        assert_eq!(compute_percentile(&samples, 0.0), -7.0);
        assert_eq!(compute_percentile(&samples, 100.0), 12.0);
    }

    #[test]
    fn test_extreme_percentiles() {
        let samples: Vec<f64> = (1..=1000).map(|x| x as f64).collect();
        let p = compute_percentiles(&samples);

        assert!(p.p99 > 985.0 && p.p99 < 995.0);
        assert!(p.p999 > 998.0 && p.p999 <= 1000.0);
        assert!((p.p50 - 500.5).abs() < 1e-9);
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(compute_percentile(&[42.0], 99.0), 42.0);
        assert_eq!(compute_percentile(&[], 50.0), 0.0);
        assert_eq!(compute_percentiles(&[]), Percentiles::default());
    }
}
