//! Error Types

use crate::oracle::OracleFault;
use std::fmt;
use thiserror::Error;

/// Sampler or harness configuration rejected before any work starts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Target sample count of zero
    #[error("target sample count must be at least 1")]
    ZeroTargetSamples,

    /// Minimum sample floor larger than the target
    #[error("minimum sample floor {min} exceeds target sample count {target}")]
    FloorAboveTarget {
        /// Requested floor
        min: usize,
        /// Requested target
        target: usize,
    },

    /// Gas limit of zero or less
    #[error("gas limit must be positive, got {0}")]
    NonPositiveGasLimit(i64),

    /// Global version the oracle does not implement
    #[error("global version {0} is not supported by the execution oracle")]
    UnsupportedVersion(u32),
}

/// Which token a decode error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRole {
    /// Code that prepares the stack
    Setup,
    /// Code being benchmarked
    Measured,
    /// Code whose cost is subtracted
    Baseline,
}

impl fmt::Display for CodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CodeRole::Setup => "setup",
            CodeRole::Measured => "measured",
            CodeRole::Baseline => "baseline",
        })
    }
}

/// Errors returned by the harness
///
/// Everything except [`BenchError::Fault`] is raised before sampling starts.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Configuration rejected
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A code token could not be decoded
    #[error("failed to decode {role} code `{token}`: {source}")]
    Decode {
        /// Which token failed
        role: CodeRole,
        /// The token as given
        token: String,
        /// Resolver error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Setup code did not finish with exit code 0
    #[error("setup code terminated with exit code {exit_code}")]
    SetupFailed {
        /// Exit code of the setup run
        exit_code: i32,
    },

    /// The oracle failed during sampling
    #[error(transparent)]
    Fault(#[from] OracleFault),
}

impl BenchError {
    /// Whether the execution substrate is in an undefined state
    pub fn is_fatal(&self) -> bool {
        matches!(self, BenchError::Fault(_))
    }
}
