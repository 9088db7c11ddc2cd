//! Differential Sampler - The Paired Sampling Loop
//!
//! Each iteration runs the baseline once and the measured code once, each on
//! a fresh copy of the stack snapshot, and records the difference. Calls are
//! strictly sequential: concurrent runs would put scheduler noise into the
//! very latency being measured.
//!
//! Sampling stops when the target count is reached, or when the wall-clock
//! budget is exhausted and the sample floor has been met.

use crate::aggregate::{AggregateStats, RunningTotals};
use crate::error::{BenchError, ConfigError};
use crate::measure::Timer;
use crate::oracle::{ExecutionOracle, OracleFault, RunLimits};
use crate::sample::{DifferentialSample, SampleResult, StackSnapshot};
use std::time::{Duration, Instant};

/// Default upper bound on collected samples
pub const DEFAULT_TARGET_SAMPLES: usize = 100_000;

/// Default wall-clock budget for one benchmark
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(2);

/// Default floor before the time budget may end sampling
pub const DEFAULT_MIN_SAMPLES: usize = 20;

/// Largest up-front reservation for the retained sequence
const MAX_PREALLOCATED_SAMPLES: usize = 1 << 20;

/// When to stop sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoppingPolicy {
    /// Upper bound on collected samples
    pub target_samples: usize,
    /// Wall-clock budget measured from the start of sampling
    pub time_budget: Duration,
    /// Samples required before the time budget may stop the loop
    pub min_samples: usize,
}

impl Default for StoppingPolicy {
    fn default() -> Self {
        Self {
            target_samples: DEFAULT_TARGET_SAMPLES,
            time_budget: DEFAULT_TIME_BUDGET,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }
}

/// Why sampling ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `target_samples` were collected
    TargetReached,
    /// The time budget ran out after the floor was met
    TimeBudgetExhausted,
}

impl StopReason {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::TargetReached => "target-reached",
            StopReason::TimeBudgetExhausted => "time-budget-exhausted",
        }
    }
}

impl StoppingPolicy {
    /// Reject configurations the loop could not honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_samples == 0 {
            return Err(ConfigError::ZeroTargetSamples);
        }
        if self.min_samples > self.target_samples {
            return Err(ConfigError::FloorAboveTarget {
                min: self.min_samples,
                target: self.target_samples,
            });
        }
        Ok(())
    }

    /// Decision taken after each completed iteration
    #[inline]
    pub fn should_stop(&self, collected: usize, elapsed: Duration) -> Option<StopReason> {
        if collected >= self.target_samples {
            Some(StopReason::TargetReached)
        } else if elapsed > self.time_budget && collected >= self.min_samples {
            Some(StopReason::TimeBudgetExhausted)
        } else {
            None
        }
    }
}

/// Samples retained by one run of the loop
#[derive(Debug, Clone)]
pub struct SampleSet {
    samples: Vec<DifferentialSample>,
    totals: RunningTotals,
    elapsed: Duration,
    stop_reason: StopReason,
}

impl SampleSet {
    /// Every retained differential sample, in collection order
    pub fn samples(&self) -> &[DifferentialSample] {
        &self.samples
    }

    /// First-pass totals
    pub fn totals(&self) -> &RunningTotals {
        &self.totals
    }

    /// Number of samples collected
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a set produced by the sampler
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Wall-clock time spent sampling
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Why sampling ended
    pub fn stop_reason(&self) -> StopReason {
        self.stop_reason
    }

    /// Second pass: mean, population std-dev and error flag
    pub fn aggregate(&self) -> Option<AggregateStats> {
        AggregateStats::from_totals(&self.totals, &self.samples)
    }
}

/// Paired baseline/measured sampler over one oracle
pub struct DifferentialSampler<'a, O: ExecutionOracle> {
    oracle: &'a mut O,
    baseline: &'a O::Code,
    measured: &'a O::Code,
    snapshot: &'a StackSnapshot<O::Stack>,
    limits: RunLimits,
}

impl<'a, O: ExecutionOracle> DifferentialSampler<'a, O> {
    /// Sampler comparing `measured` against `baseline`, both starting from
    /// `snapshot`
    pub fn new(
        oracle: &'a mut O,
        baseline: &'a O::Code,
        measured: &'a O::Code,
        snapshot: &'a StackSnapshot<O::Stack>,
        limits: RunLimits,
    ) -> Self {
        Self {
            oracle,
            baseline,
            measured,
            snapshot,
            limits,
        }
    }

    /// Time exactly one oracle call; the stack copy is made before the timer
    /// starts.
    #[inline]
    fn time_once(&mut self, code: &O::Code) -> Result<SampleResult, OracleFault> {
        let stack = self.snapshot.fresh();

        let timer = Timer::start();
        let completion = std::hint::black_box(self.oracle.execute(code, stack, self.limits));
        let runtime_nanos = timer.stop();

        Ok(SampleResult::new(runtime_nanos, completion?))
    }

    /// One iteration: baseline first, then measured
    #[inline]
    pub fn sample_once(&mut self) -> Result<DifferentialSample, OracleFault> {
        let baseline = self.baseline;
        let measured = self.measured;

        let baseline_result = self.time_once(baseline)?;
        let measured_result = self.time_once(measured)?;

        Ok(DifferentialSample::between(
            &baseline_result,
            &measured_result,
        ))
    }

    /// Sample until `policy` says stop
    pub fn run(self, policy: &StoppingPolicy) -> Result<SampleSet, BenchError> {
        self.run_with_observer(policy, |_| {})
    }

    /// Sample until `policy` says stop, reporting the running count to
    /// `observer` after every iteration.
    ///
    /// An oracle fault ends sampling at once; no partial set is returned.
    pub fn run_with_observer<F>(
        mut self,
        policy: &StoppingPolicy,
        mut observer: F,
    ) -> Result<SampleSet, BenchError>
    where
        F: FnMut(usize),
    {
        policy.validate()?;

        let mut samples =
            Vec::with_capacity(policy.target_samples.min(MAX_PREALLOCATED_SAMPLES));
        let mut totals = RunningTotals::default();

        tracing::debug!(
            target_samples = policy.target_samples,
            min_samples = policy.min_samples,
            time_budget_ms = policy.time_budget.as_millis() as u64,
            "sampling started"
        );

        let start = Instant::now();
        let stop_reason = loop {
            let sample = self.sample_once()?;
            totals.add(&sample);
            samples.push(sample);
            observer(samples.len());

            if let Some(reason) = policy.should_stop(samples.len(), start.elapsed()) {
                break reason;
            }
        };
        let elapsed = start.elapsed();

        tracing::debug!(
            samples = samples.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            reason = stop_reason.as_str(),
            errored = totals.errored(),
            "sampling finished"
        );

        Ok(SampleSet {
            samples,
            totals,
            elapsed,
            stop_reason,
        })
    }
}
