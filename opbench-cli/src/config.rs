//! Configuration loading from opbench.toml
//!
//! Sampler, VM and output defaults can be set in an `opbench.toml` file. The
//! file is discovered by walking up from the current directory unless a path
//! is given with `--config`. Command-line flags override file values.

use anyhow::Context;
use opbench_core::{
    DEFAULT_GLOBAL_VERSION, DEFAULT_MIN_SAMPLES, DEFAULT_TARGET_SAMPLES, RunLimits, StoppingPolicy,
};
use opbench_report::{OutputFormat, TimeUnit};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name searched for during discovery
pub const CONFIG_FILE_NAME: &str = "opbench.toml";

/// Duration suffixes and their length in nanoseconds
const DURATION_UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("us", 1e3),
    ("µs", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60e9),
    ("min", 60e9),
];

/// opbench configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OpbenchConfig {
    /// Sampler configuration
    #[serde(default)]
    pub sampler: SamplerConfig,
    /// Execution limits
    #[serde(default)]
    pub vm: VmConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Stopping policy and sampling thread placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Upper bound on collected samples
    #[serde(default = "default_target_samples")]
    pub target_samples: usize,
    /// Wall-clock budget for sampling (e.g., "2s", "500ms")
    #[serde(default = "default_time_budget")]
    pub time_budget: String,
    /// Samples required before the time budget may stop the loop
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Pin the sampling thread to this CPU
    #[serde(default)]
    pub pin_cpu: Option<usize>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            target_samples: default_target_samples(),
            time_budget: default_time_budget(),
            min_samples: default_min_samples(),
            pin_cpu: None,
        }
    }
}

fn default_target_samples() -> usize {
    DEFAULT_TARGET_SAMPLES
}
fn default_time_budget() -> String {
    "2s".to_string()
}
fn default_min_samples() -> usize {
    DEFAULT_MIN_SAMPLES
}

/// Limits passed to every execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmConfig {
    /// Gas budget per run
    #[serde(default = "default_gas_limit")]
    pub gas_limit: i64,
    /// Global version selecting instruction semantics
    #[serde(default = "default_global_version")]
    pub global_version: u32,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            gas_limit: default_gas_limit(),
            global_version: default_global_version(),
        }
    }
}

fn default_gas_limit() -> i64 {
    i64::MAX
}
fn default_global_version() -> u32 {
    DEFAULT_GLOBAL_VERSION
}

/// Output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Report format: "csv" or "json"
    #[serde(default)]
    pub format: OutputFormat,
    /// Runtime unit for CSV output: "ns" or "ms"
    #[serde(default)]
    pub time_unit: TimeUnit,
}

impl OpbenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Find `opbench.toml` by walking up from `start`
    pub fn find_from(start: &Path) -> Option<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                return Some(config_path);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Discover and load configuration starting from the current directory.
    ///
    /// A discovered file that fails to parse is an error.
    pub fn discover() -> anyhow::Result<Option<Self>> {
        let Ok(cwd) = std::env::current_dir() else {
            return Ok(None);
        };
        match Self::find_from(&cwd) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using discovered config");
                Self::load(path).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Stopping policy described by the `[sampler]` table
    pub fn policy(&self) -> anyhow::Result<StoppingPolicy> {
        Ok(StoppingPolicy {
            target_samples: self.sampler.target_samples,
            time_budget: Self::parse_duration(&self.sampler.time_budget)
                .context("invalid sampler.time_budget")?,
            min_samples: self.sampler.min_samples,
        })
    }

    /// Execution limits described by the `[vm]` table
    pub fn limits(&self) -> RunLimits {
        RunLimits {
            gas_limit: self.vm.gas_limit,
            global_version: self.vm.global_version,
        }
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        format!(
            r#"# opbench configuration

[sampler]
# Upper bound on collected samples
target_samples = {DEFAULT_TARGET_SAMPLES}
# Wall-clock budget for sampling
time_budget = "2s"
# Samples required before the time budget may stop sampling
min_samples = {DEFAULT_MIN_SAMPLES}
# Pin the sampling thread to a CPU (uncomment to enable)
# pin_cpu = 0

[vm]
# Gas budget per execution
gas_limit = {gas_limit}
# Global version (0..=4)
global_version = {DEFAULT_GLOBAL_VERSION}

[output]
# Report format: csv or json
format = "csv"
# Runtime unit in CSV output: ns or ms
time_unit = "ns"
"#,
            gas_limit = i64::MAX,
        )
    }

    /// Parse a duration such as `2s`, `500ms` or `1.5m`; a bare number is seconds
    pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
        let s = s.trim();
        let (number, unit) = s.split_at(s.find(char::is_alphabetic).unwrap_or(s.len()));
        let unit = if unit.is_empty() { "s" } else { unit };

        let nanos_per_unit = DURATION_UNITS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(unit))
            .map(|&(_, nanos)| nanos)
            .with_context(|| format!("unknown unit `{unit}` in duration `{s}`"))?;
        let value: f64 = number
            .trim()
            .parse()
            .with_context(|| format!("invalid duration `{s}`"))?;

        let nanos = value * nanos_per_unit;
        anyhow::ensure!(
            nanos.is_finite() && (0.0..=u64::MAX as f64).contains(&nanos),
            "duration `{s}` out of range"
        );
        Ok(Duration::from_nanos(nanos.round() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OpbenchConfig::default();
        assert_eq!(config.sampler.target_samples, 100_000);
        assert_eq!(config.sampler.time_budget, "2s");
        assert_eq!(config.sampler.min_samples, 20);
        assert_eq!(config.vm.gas_limit, i64::MAX);
        assert_eq!(config.vm.global_version, 4);
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert_eq!(config.output.time_unit, TimeUnit::Nanoseconds);

        assert_eq!(config.policy().unwrap(), StoppingPolicy::default());
        assert_eq!(config.limits(), RunLimits::default());
    }

    #[test]
    fn test_parse_duration() {
        let parse = |s| OpbenchConfig::parse_duration(s).unwrap();
        assert_eq!(parse("2s"), Duration::from_secs(2));
        assert_eq!(parse("500ms"), Duration::from_millis(500));
        assert_eq!(parse("100us"), Duration::from_micros(100));
        assert_eq!(parse("1000ns"), Duration::from_nanos(1000));
        assert_eq!(parse("2m"), Duration::from_secs(120));
        assert_eq!(parse("1.5s"), Duration::from_millis(1500));
        assert_eq!(parse("3"), Duration::from_secs(3));
        assert_eq!(parse("0s"), Duration::ZERO);

        assert!(OpbenchConfig::parse_duration("").is_err());
        assert!(OpbenchConfig::parse_duration("fast").is_err());
        assert!(OpbenchConfig::parse_duration("5h").is_err());
        assert!(OpbenchConfig::parse_duration("-1s").is_err());
        assert!(OpbenchConfig::parse_duration("1e30m").is_err());
    }

    #[test]
    fn test_parse_duration_units_ignore_case() {
        let parse = |s| OpbenchConfig::parse_duration(s).unwrap();
        assert_eq!(parse("250MS"), Duration::from_millis(250));
        assert_eq!(parse(" 1 min "), Duration::from_secs(60));
        assert_eq!(parse("7µs"), Duration::from_micros(7));
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [sampler]
            target_samples = 500
            time_budget = "250ms"

            [output]
            format = "json"
            time_unit = "ms"
        "#;

        let config: OpbenchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sampler.target_samples, 500);
        assert_eq!(
            config.policy().unwrap().time_budget,
            Duration::from_millis(250)
        );
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.time_unit, TimeUnit::Milliseconds);
        // Defaults should still apply
        assert_eq!(config.sampler.min_samples, 20);
        assert_eq!(config.vm, VmConfig::default());
    }

    #[test]
    fn test_default_toml_round_trips() {
        let config: OpbenchConfig = toml::from_str(&OpbenchConfig::default_toml()).unwrap();
        assert_eq!(config, OpbenchConfig::default());
    }

    #[test]
    fn test_load_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[vm]\ngas_limit = 1000\nglobal_version = 3\n",
        )
        .unwrap();

        let found = OpbenchConfig::find_from(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE_NAME));

        let config = OpbenchConfig::load(&found).unwrap();
        assert_eq!(config.limits().gas_limit, 1000);
        assert_eq!(config.limits().global_version, 3);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[sampler]\ntarget_samples = \"many\"\n").unwrap();

        let err = OpbenchConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config file"));
        assert!(OpbenchConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
