#![warn(missing_docs)]
//! opbench Core - Differential Sampler
//!
//! This crate measures the marginal cost of a code unit on an execution
//! oracle:
//! - [`ExecutionOracle`] / [`CodeResolver`] contracts the VM plugs into
//! - [`DifferentialSample`]: measured run minus baseline run, one per iteration
//! - [`DifferentialSampler`]: the paired, strictly sequential sampling loop
//! - [`StoppingPolicy`]: target count, wall-clock budget and sample floor
//! - [`AggregateStats`]: two-pass mean / population std-dev plus error flag
//! - [`Harness`]: decode, setup, sample, aggregate

mod aggregate;
mod error;
mod harness;
mod measure;
mod oracle;
mod sample;
mod sampler;

pub use aggregate::{AggregateStats, RunningTotals};
pub use error::{BenchError, CodeRole, ConfigError};
pub use harness::{Harness, HarnessConfig, TimingRun};
pub use measure::{Timer, pin_to_cpu};
pub use oracle::{
    CodeResolver, Completion, DEFAULT_GLOBAL_VERSION, ExecutionOracle, OracleFault, RunLimits,
};
pub use sample::{DifferentialSample, SampleResult, StackSnapshot};
pub use sampler::{
    DEFAULT_MIN_SAMPLES, DEFAULT_TARGET_SAMPLES, DEFAULT_TIME_BUDGET, DifferentialSampler,
    SampleSet, StopReason, StoppingPolicy,
};
pub use opbench_stats::Dispersion;
