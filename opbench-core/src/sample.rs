//! Samples and Stack Snapshots

use crate::oracle::Completion;
use std::sync::Arc;

/// Outcome of one timed oracle invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleResult {
    /// Wall-clock time of the call; never negative
    pub runtime_nanos: u64,
    /// Gas consumed by the run
    pub gas_used: i64,
    /// 0 on success, otherwise the VM-defined halt/exception code
    pub completion_code: i32,
}

impl SampleResult {
    /// Combine a timer reading with the oracle's completion
    #[inline]
    pub fn new(runtime_nanos: u64, completion: Completion) -> Self {
        Self {
            runtime_nanos,
            gas_used: completion.gas_used,
            completion_code: completion.exit_code,
        }
    }
}

/// Measured run minus baseline run for one iteration
///
/// The runtime difference is signed: jitter can make the baseline slower than
/// the measured code, and such samples are kept unclamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifferentialSample {
    /// `runtime(measured) − runtime(baseline)` in nanoseconds
    pub runtime_nanos: i64,
    /// `gas(measured) − gas(baseline)`
    pub gas_used: i64,
    /// Completion code of the measured run only
    pub completion_code: i32,
}

impl DifferentialSample {
    /// Cancel the baseline's fixed overhead out of `measured`
    #[inline]
    pub fn between(baseline: &SampleResult, measured: &SampleResult) -> Self {
        let runtime = i128::from(measured.runtime_nanos) - i128::from(baseline.runtime_nanos);
        Self {
            runtime_nanos: runtime.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64,
            gas_used: measured.gas_used.saturating_sub(baseline.gas_used),
            completion_code: measured.completion_code,
        }
    }

    /// Whether the measured run ended with a nonzero completion code
    #[inline]
    pub fn errored(&self) -> bool {
        self.completion_code != 0
    }
}

/// Read-only stack state every sample starts from
///
/// Cloning the snapshot shares it; [`StackSnapshot::fresh`] hands out an
/// independent copy for one run, so no run can observe another's mutations.
#[derive(Debug)]
pub struct StackSnapshot<S> {
    stack: Arc<S>,
}

impl<S> StackSnapshot<S> {
    /// Freeze `stack`
    pub fn new(stack: S) -> Self {
        Self {
            stack: Arc::new(stack),
        }
    }
}

impl<S: Clone> StackSnapshot<S> {
    /// A fresh logical copy for one run
    #[inline]
    pub fn fresh(&self) -> S {
        S::clone(&self.stack)
    }
}

impl<S> Clone for StackSnapshot<S> {
    fn clone(&self) -> Self {
        Self {
            stack: Arc::clone(&self.stack),
        }
    }
}
