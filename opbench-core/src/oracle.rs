//! Oracle Contracts
//!
//! The sampler never knows how code is decoded or executed. It talks to a
//! [`CodeResolver`] once per token and to an [`ExecutionOracle`] once per
//! timed run.
//!
//! A run ends in one of two ways, kept apart at the type level:
//! - `Ok(Completion)`: the VM ran to completion or to a VM-defined halt.
//!   A nonzero exit code is benchmark data.
//! - `Err(OracleFault)`: the execution substrate itself is inconsistent.
//!   Nothing measured after this point can be trusted.

use std::any::Any;
use thiserror::Error;

/// Global version passed to the VM when none is configured
pub const DEFAULT_GLOBAL_VERSION: u32 = 4;

/// Gas budget and VM version attached to every execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    /// Maximum gas the run may consume
    pub gas_limit: i64,
    /// VM behaviour version tag
    pub global_version: u32,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            gas_limit: i64::MAX,
            global_version: DEFAULT_GLOBAL_VERSION,
        }
    }
}

/// Normal outcome of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// 0 on success, otherwise the VM-defined halt/exception code
    pub exit_code: i32,
    /// Gas consumed by the run
    pub gas_used: i64,
}

impl Completion {
    /// Whether the VM reported success
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Unrecoverable fault inside the execution oracle
#[derive(Debug, Clone, Error)]
#[error("execution oracle fault: {message}")]
pub struct OracleFault {
    message: String,
}

impl OracleFault {
    /// Fault with a diagnostic message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Fault built from a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::new(message)
    }

    /// Diagnostic message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Maps an input token to an executable code unit
pub trait CodeResolver {
    /// Decoded code unit
    type Code;
    /// Decode failure
    type Error: std::error::Error + Send + Sync + 'static;

    /// Decode `token`
    fn resolve(&self, token: &str) -> Result<Self::Code, Self::Error>;
}

/// Executes code units against a stack
pub trait ExecutionOracle {
    /// Code unit accepted by the oracle
    type Code;
    /// Stack state; cloning it must yield an independent logical copy
    type Stack: Clone;

    /// Run `code` from an empty stack and return the stack it leaves behind.
    ///
    /// Used once per benchmark to build the snapshot every sample starts from.
    fn prepare(
        &mut self,
        code: &Self::Code,
        limits: RunLimits,
    ) -> Result<(Completion, Self::Stack), OracleFault>;

    /// Run `code` on `stack` to completion or VM-defined halt.
    fn execute(
        &mut self,
        code: &Self::Code,
        stack: Self::Stack,
        limits: RunLimits,
    ) -> Result<Completion, OracleFault>;

    /// Whether the oracle understands `global_version`
    fn supports_version(&self, global_version: u32) -> bool {
        let _ = global_version;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_from_panic_payloads() {
        let fault = OracleFault::from_panic(Box::new("stack corrupted"));
        assert_eq!(fault.message(), "stack corrupted");

        let fault = OracleFault::from_panic(Box::new(String::from("bad cell")));
        assert_eq!(fault.message(), "bad cell");

        let fault = OracleFault::from_panic(Box::new(17_u32));
        assert_eq!(fault.message(), "unknown panic");
    }

    #[test]
    fn test_default_limits() {
        let limits = RunLimits::default();
        assert_eq!(limits.gas_limit, i64::MAX);
        assert_eq!(limits.global_version, 4);
    }
}
