//! Harness - Decode, Setup, Sample, Aggregate
//!
//! ```text
//! tokens ──resolve──▶ code units
//!                        │
//! setup code ──prepare──▶ StackSnapshot
//!                        │
//!        DifferentialSampler (baseline, measured) × N
//!                        │
//!                        ▼
//!                 AggregateStats
//! ```
//!
//! Configuration and decode errors are returned before the first sample is
//! taken.

use crate::aggregate::AggregateStats;
use crate::error::{BenchError, CodeRole, ConfigError};
use crate::measure::pin_to_cpu;
use crate::oracle::{CodeResolver, ExecutionOracle, RunLimits};
use crate::sample::StackSnapshot;
use crate::sampler::{DifferentialSampler, SampleSet, StoppingPolicy};

/// Everything that shapes one timing run
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    /// Stopping policy
    pub policy: StoppingPolicy,
    /// Gas budget and version for every execution
    pub limits: RunLimits,
    /// Token whose cost is subtracted from the measured code
    pub baseline: String,
    /// Pin the sampling thread to this core
    pub pin_cpu: Option<usize>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            policy: StoppingPolicy::default(),
            limits: RunLimits::default(),
            baseline: String::new(),
            pin_cpu: None,
        }
    }
}

/// Result of timing one code unit
#[derive(Debug, Clone)]
pub struct TimingRun {
    /// Reduced statistics
    pub stats: AggregateStats,
    /// Retained samples and loop metadata
    pub samples: SampleSet,
}

/// Ties a resolver and an oracle together
pub struct Harness<R, O> {
    resolver: R,
    oracle: O,
    config: HarnessConfig,
}

impl<R, O> Harness<R, O>
where
    R: CodeResolver<Code = O::Code>,
    O: ExecutionOracle,
{
    /// Create a harness
    pub fn new(resolver: R, oracle: O, config: HarnessConfig) -> Self {
        Self {
            resolver,
            oracle,
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Check the configuration without running anything
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.policy.validate()?;

        let limits = self.config.limits;
        if limits.gas_limit <= 0 {
            return Err(ConfigError::NonPositiveGasLimit(limits.gas_limit));
        }
        if !self.oracle.supports_version(limits.global_version) {
            return Err(ConfigError::UnsupportedVersion(limits.global_version));
        }
        Ok(())
    }

    /// Decode one token
    pub fn resolve(&self, role: CodeRole, token: &str) -> Result<O::Code, BenchError> {
        self.resolver
            .resolve(token)
            .map_err(|source| BenchError::Decode {
                role,
                token: token.to_string(),
                source: Box::new(source),
            })
    }

    /// Run `setup` once from an empty stack and freeze the result
    pub fn prepare_stack(&mut self, setup: &O::Code) -> Result<StackSnapshot<O::Stack>, BenchError> {
        let (completion, stack) = self.oracle.prepare(setup, self.config.limits)?;
        if !completion.is_success() {
            return Err(BenchError::SetupFailed {
                exit_code: completion.exit_code,
            });
        }

        tracing::debug!(gas_used = completion.gas_used, "setup stack prepared");
        Ok(StackSnapshot::new(stack))
    }

    /// Time `measured` against the configured baseline on the stack left by
    /// `setup`
    pub fn time_instruction(&mut self, setup: &str, measured: &str) -> Result<TimingRun, BenchError> {
        self.time_instruction_with_observer(setup, measured, |_| {})
    }

    /// Like [`Harness::time_instruction`], reporting the running sample count
    /// to `observer`
    pub fn time_instruction_with_observer<F>(
        &mut self,
        setup: &str,
        measured: &str,
        observer: F,
    ) -> Result<TimingRun, BenchError>
    where
        F: FnMut(usize),
    {
        self.validate()?;

        let setup_code = self.resolve(CodeRole::Setup, setup)?;
        let measured_code = self.resolve(CodeRole::Measured, measured)?;
        let baseline_code = self.resolve(CodeRole::Baseline, &self.config.baseline)?;

        let snapshot = self.prepare_stack(&setup_code)?;

        if let Some(cpu) = self.config.pin_cpu {
            match pin_to_cpu(cpu) {
                Ok(()) => tracing::debug!(cpu, "sampling thread pinned"),
                Err(e) => tracing::warn!(cpu, error = %e, "failed to pin sampling thread"),
            }
        }

        let policy = self.config.policy;
        let limits = self.config.limits;
        let samples = DifferentialSampler::new(
            &mut self.oracle,
            &baseline_code,
            &measured_code,
            &snapshot,
            limits,
        )
        .run_with_observer(&policy, observer)?;

        let stats = samples
            .aggregate()
            .ok_or(BenchError::Config(ConfigError::ZeroTargetSamples))?;

        Ok(TimingRun { stats, samples })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{Completion, OracleFault};
    use std::time::Duration;

    /// Tokens are decimal gas costs; "" is the empty program.
    struct DecimalResolver;

    #[derive(Debug, thiserror::Error)]
    #[error("not a number")]
    struct NotANumber;

    impl CodeResolver for DecimalResolver {
        type Code = i64;
        type Error = NotANumber;

        fn resolve(&self, token: &str) -> Result<i64, NotANumber> {
            if token.is_empty() {
                return Ok(0);
            }
            token.parse().map_err(|_| NotANumber)
        }
    }

    /// Setup code pushes its own value; a negative value makes setup fail.
    #[derive(Default)]
    struct CostOracle {
        executions: usize,
    }

    impl ExecutionOracle for CostOracle {
        type Code = i64;
        type Stack = Vec<i64>;

        fn prepare(
            &mut self,
            code: &i64,
            _limits: RunLimits,
        ) -> Result<(Completion, Vec<i64>), OracleFault> {
            let exit_code = if *code < 0 { 9 } else { 0 };
            Ok((
                Completion {
                    exit_code,
                    gas_used: 0,
                },
                vec![*code],
            ))
        }

        fn execute(
            &mut self,
            code: &i64,
            stack: Vec<i64>,
            _limits: RunLimits,
        ) -> Result<Completion, OracleFault> {
            self.executions += 1;
            Ok(Completion {
                exit_code: 0,
                gas_used: 5 + code + stack[0],
            })
        }

        fn supports_version(&self, global_version: u32) -> bool {
            global_version <= 4
        }
    }

    fn quick_config() -> HarnessConfig {
        HarnessConfig {
            policy: StoppingPolicy {
                target_samples: 50,
                time_budget: Duration::from_secs(60),
                min_samples: 20,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_time_instruction_cancels_baseline() {
        let mut harness = Harness::new(DecimalResolver, CostOracle::default(), quick_config());
        let run = harness.time_instruction("7", "26").unwrap();

        assert_eq!(run.stats.gas.mean, 26.0);
        assert_eq!(run.stats.gas.std_dev, 0.0);
        assert_eq!(run.stats.sample_count, 50);
        assert!(!run.stats.any_errored);
    }

    #[test]
    fn test_custom_baseline() {
        let config = HarnessConfig {
            baseline: "10".to_string(),
            ..quick_config()
        };
        let mut harness = Harness::new(DecimalResolver, CostOracle::default(), config);
        let run = harness.time_instruction("", "26").unwrap();
        assert_eq!(run.stats.gas.mean, 16.0);
    }

    #[test]
    fn test_decode_error_before_sampling() {
        let mut harness = Harness::new(DecimalResolver, CostOracle::default(), quick_config());
        let err = harness.time_instruction("", "zz").unwrap_err();

        match err {
            BenchError::Decode { role, token, .. } => {
                assert_eq!(role, CodeRole::Measured);
                assert_eq!(token, "zz");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(harness.oracle.executions, 0);
    }

    #[test]
    fn test_setup_failure() {
        let mut harness = Harness::new(DecimalResolver, CostOracle::default(), quick_config());
        let err = harness.time_instruction("-1", "1").unwrap_err();
        assert!(matches!(err, BenchError::SetupFailed { exit_code: 9 }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_config_errors() {
        let mut config = quick_config();
        config.policy.target_samples = 0;
        let mut harness = Harness::new(DecimalResolver, CostOracle::default(), config);
        assert!(matches!(
            harness.time_instruction("", "1"),
            Err(BenchError::Config(ConfigError::ZeroTargetSamples))
        ));

        let mut config = quick_config();
        config.limits.global_version = 9;
        let harness = Harness::new(DecimalResolver, CostOracle::default(), config);
        assert_eq!(harness.validate(), Err(ConfigError::UnsupportedVersion(9)));

        let mut config = quick_config();
        config.limits.gas_limit = 0;
        let harness = Harness::new(DecimalResolver, CostOracle::default(), config);
        assert_eq!(harness.validate(), Err(ConfigError::NonPositiveGasLimit(0)));
    }
}
