//! Aggregation
//!
//! First pass: exact integer totals accumulated while sampling.
//! Second pass: squared deviations from the mean over the retained samples.
//! Both divide by the number of samples actually collected.

use crate::sample::DifferentialSample;
use opbench_stats::{Dispersion, population_std_dev};

/// Cumulative sums of the differential samples collected so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningTotals {
    runtime_nanos: i128,
    gas_used: i128,
    count: usize,
    errored: bool,
}

impl RunningTotals {
    /// Fold one sample in
    #[inline]
    pub fn add(&mut self, sample: &DifferentialSample) {
        self.runtime_nanos += i128::from(sample.runtime_nanos);
        self.gas_used += i128::from(sample.gas_used);
        self.count += 1;
        self.errored |= sample.errored();
    }

    /// Number of samples folded in
    pub fn count(&self) -> usize {
        self.count
    }

    /// Sum of runtime differentials (ns)
    pub fn runtime_nanos(&self) -> i128 {
        self.runtime_nanos
    }

    /// Sum of gas differentials
    pub fn gas_used(&self) -> i128 {
        self.gas_used
    }

    /// Whether any folded sample had a nonzero completion code
    pub fn errored(&self) -> bool {
        self.errored
    }

    fn means(&self) -> Option<(f64, f64)> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some((self.runtime_nanos as f64 / n, self.gas_used as f64 / n))
    }
}

/// Final result for one benchmarked code unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateStats {
    /// Runtime differential in nanoseconds
    pub runtime: Dispersion,
    /// Gas differential
    pub gas: Dispersion,
    /// True if any sample's completion code was nonzero
    pub any_errored: bool,
    /// Number of samples the statistics were computed over
    pub sample_count: usize,
}

impl AggregateStats {
    /// Reduce `samples` whose first-pass sums are `totals`.
    ///
    /// Returns `None` if nothing was collected or if `totals` does not
    /// describe `samples`.
    pub fn from_totals(totals: &RunningTotals, samples: &[DifferentialSample]) -> Option<Self> {
        if totals.count() != samples.len() {
            return None;
        }
        let (runtime_mean, gas_mean) = totals.means()?;

        let runtime_std_dev = population_std_dev(
            samples.iter().map(|s| s.runtime_nanos as f64),
            runtime_mean,
        );
        let gas_std_dev = population_std_dev(samples.iter().map(|s| s.gas_used as f64), gas_mean);

        Some(Self {
            runtime: Dispersion {
                mean: runtime_mean,
                std_dev: runtime_std_dev,
            },
            gas: Dispersion {
                mean: gas_mean,
                std_dev: gas_std_dev,
            },
            any_errored: samples.iter().any(DifferentialSample::errored),
            sample_count: samples.len(),
        })
    }

    /// Reduce `samples` from scratch
    #[cfg(test)]
    pub fn from_samples(samples: &[DifferentialSample]) -> Option<Self> {
        let mut totals = RunningTotals::default();
        for sample in samples {
            totals.add(sample);
        }
        Self::from_totals(&totals, samples)
    }
}
