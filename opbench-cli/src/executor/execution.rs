//! Timing Execution
//!
//! ```text
//! HarnessConfig + (setup, measured) tokens
//!        │
//!        ▼
//! Harness<TvmResolver, TvmOracle>   decode → setup → sample × N
//!        │
//!        ▼
//!   TimingRun (stats, samples, stop reason)
//! ```
//!
//! The sampling loop runs on the calling thread. Progress goes to a spinner
//! on stderr, which indicatif hides when stderr is not a terminal.

use indicatif::{ProgressBar, ProgressStyle};
use opbench_core::{BenchError, Harness, HarnessConfig, TimingRun};
use opbench_vm::{TvmOracle, TvmResolver};

/// Samples between spinner updates
pub const PROGRESS_STRIDE: usize = 1024;

/// Time `measured` on the stack left by `setup` with the reference VM
pub fn run_timing(
    config: &HarnessConfig,
    setup: &str,
    measured: &str,
) -> Result<TimingRun, BenchError> {
    let mut harness = Harness::new(TvmResolver, TvmOracle, config.clone());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} samples {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(measured.to_string());

    tracing::debug!(setup, measured, baseline = %config.baseline, "timing code unit");

    let result = harness.time_instruction_with_observer(setup, measured, |count| {
        if count % PROGRESS_STRIDE == 0 {
            pb.set_position(count as u64);
            pb.tick();
        }
    });
    pb.finish_and_clear();

    if let Ok(run) = &result {
        tracing::debug!(
            samples = run.stats.sample_count,
            stop_reason = run.samples.stop_reason().as_str(),
            errored = run.stats.any_errored,
            "timing finished"
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbench_core::{ConfigError, StoppingPolicy};
    use std::time::Duration;

    fn small_config(target: usize) -> HarnessConfig {
        HarnessConfig {
            policy: StoppingPolicy {
                target_samples: target,
                time_budget: Duration::from_secs(30),
                min_samples: 1,
            },
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn test_run_divmodc() {
        let run = run_timing(&small_config(200), "80FF801C", "A90E").unwrap();
        assert_eq!(run.stats.sample_count, 200);
        assert_eq!(run.stats.gas.mean, 26.0);
        assert_eq!(run.stats.gas.std_dev, 0.0);
        assert!(!run.stats.any_errored);
    }

    #[test]
    fn test_failing_code_sets_error_flag() {
        // ADD on an empty stack underflows
        let run = run_timing(&small_config(50), "", "A0").unwrap();
        assert!(run.stats.any_errored);
        assert_eq!(run.stats.sample_count, 50);
    }

    #[test]
    fn test_decode_error_before_sampling() {
        let err = run_timing(&small_config(10), "", "XYZ").unwrap_err();
        assert!(matches!(err, BenchError::Decode { .. }));
    }

    #[test]
    fn test_setup_failure() {
        let err = run_timing(&small_config(10), "A0", "A90E").unwrap_err();
        assert!(matches!(err, BenchError::SetupFailed { exit_code: 2 }));
    }

    #[test]
    fn test_zero_target_rejected() {
        let err = run_timing(&small_config(0), "", "A90E").unwrap_err();
        assert!(matches!(
            err,
            BenchError::Config(ConfigError::ZeroTargetSamples)
        ));
    }
}
