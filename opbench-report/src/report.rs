//! Report Data Structures

use crate::TimeUnit;
use crate::json::ReportSchema;
use chrono::{DateTime, Utc};
use opbench_core::{AggregateStats, Dispersion, HarnessConfig, TimingRun};
use opbench_stats::{compute_percentiles, compute_summary};
use serde::{Deserialize, Serialize};

/// Current JSON schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Complete report for one invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Environment and configuration
    pub meta: ReportMeta,
    /// One record per timed code unit
    pub results: Vec<TimingRecord>,
    /// Totals over `results`
    pub summary: ReportSummary,
}

impl Report {
    /// Assemble a report and its summary
    pub fn new(meta: ReportMeta, results: Vec<TimingRecord>, total_duration_ms: f64) -> Self {
        let summary = ReportSummary {
            total_results: results.len(),
            total_samples: results.iter().map(|r| r.samples).sum(),
            errored: results.iter().filter(|r| r.errored).count(),
            total_duration_ms,
        };
        Self {
            meta,
            results,
            summary,
        }
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// Schema name and version
    pub schema: ReportSchema,
    /// Tool version
    pub version: String,
    /// When the report was generated
    pub timestamp: DateTime<Utc>,
    /// Host the run executed on
    pub system: SystemInfo,
    /// Sampler and VM settings of the run
    pub config: ReportConfig,
}

/// Sampler and VM configuration captured in report metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Samples requested per code unit
    pub target_samples: usize,
    /// Wall-clock budget per code unit
    pub time_budget_ns: u64,
    /// Floor honored past the time budget
    pub min_samples: usize,
    /// Gas limit for every run
    pub gas_limit: i64,
    /// VM global version
    pub global_version: u32,
    /// Baseline code token
    pub baseline: String,
    /// CPU the sampling thread was pinned to
    pub pin_cpu: Option<usize>,
    /// Unit of the CSV runtime columns
    pub time_unit: TimeUnit,
}

impl ReportConfig {
    /// Capture the harness configuration
    pub fn from_harness(config: &HarnessConfig, time_unit: TimeUnit) -> Self {
        Self {
            target_samples: config.policy.target_samples,
            time_budget_ns: u64::try_from(config.policy.time_budget.as_nanos()).unwrap_or(u64::MAX),
            min_samples: config.policy.min_samples,
            gas_limit: config.limits.gas_limit,
            global_version: config.limits.global_version,
            baseline: config.baseline.clone(),
            pin_cpu: config.pin_cpu,
            time_unit,
        }
    }
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system
    pub os: String,
    /// CPU architecture
    pub arch: String,
    /// CPU model name, `Unknown` when unavailable
    pub cpu: String,
    /// Logical CPUs available to the process
    pub cpu_cores: u32,
    /// Total memory, 0 when unavailable
    pub memory_gb: f64,
}

/// Mean and population standard deviation of one differential metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

impl From<Dispersion> for MetricSummary {
    fn from(d: Dispersion) -> Self {
        Self {
            mean: d.mean,
            std_dev: d.std_dev,
        }
    }
}

/// Shape of the runtime differential distribution (nanoseconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeDistribution {
    /// Smallest differential
    pub min_ns: f64,
    /// 50th percentile
    pub median_ns: f64,
    /// 90th percentile
    pub p90_ns: f64,
    /// 99th percentile
    pub p99_ns: f64,
    /// 99.9th percentile
    pub p999_ns: f64,
    /// Largest differential
    pub max_ns: f64,
}

impl RuntimeDistribution {
    /// Summarise runtime differentials; `None` for an empty slice
    pub fn from_runtimes(runtimes: &[f64]) -> Option<Self> {
        if runtimes.is_empty() {
            return None;
        }
        let summary = compute_summary(runtimes);
        let percentiles = compute_percentiles(runtimes);
        Some(Self {
            min_ns: summary.min,
            median_ns: summary.median,
            p90_ns: percentiles.p90,
            p99_ns: summary.p99,
            p999_ns: percentiles.p999,
            max_ns: summary.max,
        })
    }
}

/// Result of timing one code unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    /// Setup token as given on the command line
    pub setup: String,
    /// Measured token as given on the command line
    pub code: String,
    /// Samples collected
    pub samples: usize,
    /// Why sampling stopped, empty when unknown
    pub stop_reason: String,
    /// Wall-clock time spent sampling
    pub elapsed_ns: u64,
    /// Runtime differential in nanoseconds
    pub runtime_ns: MetricSummary,
    /// Gas differential
    pub gas: MetricSummary,
    /// Any sample's measured run ended with a nonzero exit code
    pub errored: bool,
    /// Percentiles of the runtime differential, absent without raw samples
    pub runtime_distribution: Option<RuntimeDistribution>,
}

impl TimingRecord {
    /// Record built from aggregate statistics alone
    pub fn from_stats(setup: &str, code: &str, stats: &AggregateStats) -> Self {
        Self {
            setup: setup.to_string(),
            code: code.to_string(),
            samples: stats.sample_count,
            stop_reason: String::new(),
            elapsed_ns: 0,
            runtime_ns: stats.runtime.into(),
            gas: stats.gas.into(),
            errored: stats.any_errored,
            runtime_distribution: None,
        }
    }

    /// Record built from a finished run, including its runtime distribution
    pub fn from_run(setup: &str, code: &str, run: &TimingRun) -> Self {
        let runtimes: Vec<f64> = run
            .samples
            .samples()
            .iter()
            .map(|s| s.runtime_nanos as f64)
            .collect();

        Self {
            stop_reason: run.samples.stop_reason().as_str().to_string(),
            elapsed_ns: u64::try_from(run.samples.elapsed().as_nanos()).unwrap_or(u64::MAX),
            runtime_distribution: RuntimeDistribution::from_runtimes(&runtimes),
            ..Self::from_stats(setup, code, &run.stats)
        }
    }
}

/// Report summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of timed code units
    pub total_results: usize,
    /// Samples across all code units
    pub total_samples: usize,
    /// Code units with at least one failing run
    pub errored: usize,
    /// Wall-clock duration of the invocation
    pub total_duration_ms: f64,
}
