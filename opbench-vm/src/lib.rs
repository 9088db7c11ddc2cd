#![warn(missing_docs)]
//! opbench VM - Reference Resolver and Oracle
//!
//! A small stack machine in the style of TVM codepage 0, enough to exercise
//! the differential sampler end to end:
//! - Cells, builders and slices ([`Cell`], [`CellBuilder`], [`CellSlice`])
//! - Hex bitstring literals and `boc:` bag-of-cells tokens ([`TvmResolver`])
//! - Gas metering, exceptions and a documented instruction subset
//!   ([`VmState`], [`Instruction`])
//! - [`TvmOracle`], the [`ExecutionOracle`](opbench_core::ExecutionOracle)
//!   implementation the CLI runs against
//!
//! Integers are 128-bit signed; results that do not fit raise an integer
//! overflow exception.

mod arith;
mod boc;
mod cell;
mod exception;
mod gas;
mod instruction;
mod oracle;
mod resolver;
mod stack;
mod vm;

pub use boc::{BOC_GENERIC_MAGIC, BocError, deserialize_boc, deserialize_single_root};
pub use cell::{Cell, CellBuilder, CellError, CellSlice, MAX_DATA_BITS, MAX_REFS};
pub use exception::VmException;
pub use gas::{
    CELL_CREATE_GAS, CELL_LOAD_GAS, EXCEPTION_GAS, GAS_PER_BIT, GAS_PER_INSTRUCTION, GAS_PER_REF,
    GasMeter, IMPLICIT_RET_GAS,
};
pub use instruction::{Decoded, DivOutput, Instruction, Rounding};
pub use oracle::TvmOracle;
pub use resolver::{BOC_PREFIX, CodeUnit, DecodeError, TvmResolver, parse_hex_bitstring};
pub use stack::{Stack, StackEntry};
pub use vm::{MAX_SUPPORTED_VERSION, VmState};
