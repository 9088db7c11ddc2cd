//! Mean and Population Standard Deviation
//!
//! Two-pass reduction: the mean is computed first, then the squared
//! deviations from it are accumulated. The variance denominator is the number
//! of samples actually collected (population variance), never `N - 1`.

/// Central tendency and spread of one metric
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dispersion {
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

impl Dispersion {
    /// Two-pass mean and population standard deviation of `samples`.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let std_dev = population_std_dev(samples.iter().copied(), mean);

        Some(Self { mean, std_dev })
    }
}

/// Second pass of the two-pass algorithm.
///
/// `mean` must come from the same values; the result is
/// `sqrt(Σ(x − mean)² / N)`, or `0.0` when `values` is empty.
pub fn population_std_dev<I>(values: I, mean: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum_sq, count) = values.into_iter().fold((0.0_f64, 0_usize), |(acc, n), x| {
        let deviation = x - mean;
        (acc + deviation * deviation, n + 1)
    });

    if count == 0 {
        0.0
    } else {
        (sum_sq / count as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Naive single-pass reference: E[x²] − E[x]², computed in f64 on
    /// well-conditioned data only.
    fn reference_variance(samples: &[f64]) -> f64 {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let mean_sq = samples.iter().map(|x| x * x).sum::<f64>() / n;
        mean_sq - mean * mean
    }

    #[test]
    fn test_textbook_population_std_dev() {
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let d = Dispersion::from_samples(&samples).unwrap();

        assert_eq!(d.mean, 5.0);
        assert_eq!(d.std_dev, 2.0);
    }

    #[test]
    fn test_denominator_is_n() {
        // Sample variance (N - 1) would be 2.0 here; population variance is 1.0.
        let samples = [1.0, 3.0];
        let d = Dispersion::from_samples(&samples).unwrap();
        assert_eq!(d.std_dev, 1.0);
    }

    #[test]
    fn test_single_sample_has_zero_spread() {
        let d = Dispersion::from_samples(&[42.0]).unwrap();
        assert_eq!(d.mean, 42.0);
        assert_eq!(d.std_dev, 0.0);
    }

    #[test]
    fn test_empty_samples() {
        assert!(Dispersion::from_samples(&[]).is_none());
        assert_eq!(population_std_dev(std::iter::empty(), 1.0), 0.0);
    }

    #[test]
    fn test_matches_reference_on_synthetic_sets() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for len in [1_usize, 2, 20, 1_000, 50_000] {
            let samples: Vec<f64> = (0..len).map(|_| rng.gen_range(-500.0..500.0)).collect();
            let d = Dispersion::from_samples(&samples).unwrap();
            let expected = reference_variance(&samples);

            let variance = d.std_dev * d.std_dev;
            let tolerance = 1e-9 * expected.abs().max(1.0);
            assert!(
                (variance - expected).abs() < tolerance,
                "len={len}: {variance} vs {expected}"
            );
        }
    }

    #[test]
    fn test_large_offset_stays_accurate() {
        // Single-pass E[x²] − E[x]² loses all precision here.
        let samples: Vec<f64> = (0..10_000)
            .map(|i| 1.0e9 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let d = Dispersion::from_samples(&samples).unwrap();

        assert!((d.mean - 1.0e9).abs() < 1e-6);
        assert!((d.std_dev - 1.0).abs() < 1e-9);
    }
}
