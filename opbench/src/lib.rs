#![warn(missing_docs)]
//! # opbench
//!
//! Differential statistical benchmarking of TVM code: how long an opcode or
//! opcode sequence takes to execute compared with the gas it is charged.
//!
//! - **Differential sampling**: every sample runs a baseline and the measured
//!   code on fresh copies of the same prepared stack and records the
//!   difference in wall-clock time and gas
//! - **Adaptive stopping**: a sample target, a wall-clock budget and a sample
//!   floor bound the loop
//! - **Exact aggregation**: integer totals, two-pass population std-dev and a
//!   sticky error flag
//! - **Reference VM**: a TVM codepage-0 subset with hex and bag-of-cells
//!   code decoding
//!
//! ## Quick Start
//!
//! ```ignore
//! use opbench::{Harness, HarnessConfig, TvmOracle, TvmResolver};
//!
//! let mut harness = Harness::new(TvmResolver, TvmOracle, HarnessConfig::default());
//! let run = harness.time_instruction("80FF801C", "A90E")?;
//! println!("gas {:.9} ± {:.9}", run.stats.gas.mean, run.stats.gas.std_dev);
//! ```
//!
//! The `opcode-timing` binary wraps the same pipeline:
//!
//! ```text
//! $ opcode-timing 80FF801C A90E
//! OPCODE,runtime mean,runtime stddev,gas mean,gas stddev,error
//! A90E,...,...,26.000000000,0.000000000,0
//! ```

// Re-export core types
pub use opbench_core::{
    AggregateStats, BenchError, CodeResolver, CodeRole, Completion, ConfigError,
    DifferentialSample, DifferentialSampler, ExecutionOracle, Harness, HarnessConfig,
    OracleFault, RunLimits, SampleSet, StackSnapshot, StopReason, StoppingPolicy, TimingRun,
};

// Re-export the reference VM
pub use opbench_vm::{CodeUnit, DecodeError, Stack, StackEntry, TvmOracle, TvmResolver};

// Re-export report types
pub use opbench_report::{
    CSV_HEADER, OutputFormat, Report, TimeUnit, TimingRecord, generate_csv_report,
    generate_json_report,
};

// Re-export stats
pub use opbench_stats::{Dispersion, SummaryStatistics, compute_summary};

/// Run the opcode-timing CLI.
///
/// Call this from a binary's `main()`:
/// ```ignore
/// fn main() -> std::process::ExitCode {
///     opbench::run()
/// }
/// ```
pub use opbench_cli::run;
