//! Execution Oracle
//!
//! Each call builds a fresh [`VmState`], so no state leaks between runs. A
//! panic inside the VM is caught at this boundary and surfaces as an
//! [`OracleFault`].

use crate::resolver::CodeUnit;
use crate::stack::Stack;
use crate::vm::{MAX_SUPPORTED_VERSION, VmState};
use opbench_core::{Completion, ExecutionOracle, OracleFault, RunLimits};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// [`ExecutionOracle`] backed by the reference VM
#[derive(Debug, Default, Clone, Copy)]
pub struct TvmOracle;

impl ExecutionOracle for TvmOracle {
    type Code = CodeUnit;
    type Stack = Stack;

    fn prepare(
        &mut self,
        code: &CodeUnit,
        limits: RunLimits,
    ) -> Result<(Completion, Stack), OracleFault> {
        catch_unwind(AssertUnwindSafe(|| {
            let mut vm = VmState::new(code.root().clone(), Stack::new(), limits);
            let completion = vm.run();
            (completion, vm.into_stack())
        }))
        .map_err(OracleFault::from_panic)
    }

    #[inline]
    fn execute(
        &mut self,
        code: &CodeUnit,
        stack: Stack,
        limits: RunLimits,
    ) -> Result<Completion, OracleFault> {
        catch_unwind(AssertUnwindSafe(|| {
            VmState::new(code.root().clone(), stack, limits).run()
        }))
        .map_err(OracleFault::from_panic)
    }

    fn supports_version(&self, global_version: u32) -> bool {
        global_version <= MAX_SUPPORTED_VERSION
    }
}
