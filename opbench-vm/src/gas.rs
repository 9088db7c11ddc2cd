//! Gas Metering
//!
//! Every instruction costs a base price plus one unit per encoded bit and
//! five per encoded reference. Cell creation, cell loads and raised
//! exceptions carry surcharges.

use crate::exception::VmException;

/// Base price of every decoded instruction
pub const GAS_PER_INSTRUCTION: i64 = 10;
/// Price of each bit of instruction encoding
pub const GAS_PER_BIT: i64 = 1;
/// Price of each reference consumed by an instruction encoding
pub const GAS_PER_REF: i64 = 5;
/// Price of the return executed when the code slice runs out
pub const IMPLICIT_RET_GAS: i64 = 5;
/// Surcharge when an exception is raised
pub const EXCEPTION_GAS: i64 = 50;
/// Surcharge for finalizing a builder into a cell
pub const CELL_CREATE_GAS: i64 = 500;
/// Surcharge for opening a cell as a slice
pub const CELL_LOAD_GAS: i64 = 100;

/// Consumption against a fixed limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasMeter {
    limit: i64,
    consumed: i64,
}

impl GasMeter {
    /// Meter with nothing consumed
    pub fn new(limit: i64) -> Self {
        Self { limit, consumed: 0 }
    }

    /// Charge `amount`, failing once consumption exceeds the limit
    #[inline]
    pub fn consume(&mut self, amount: i64) -> Result<(), VmException> {
        self.consumed = self.consumed.saturating_add(amount);
        if self.consumed > self.limit {
            Err(VmException::OutOfGas)
        } else {
            Ok(())
        }
    }

    /// Charge for an instruction encoded in `bits` bits and `refs` references
    #[inline]
    pub fn charge_instruction(&mut self, bits: usize, refs: usize) -> Result<(), VmException> {
        let cost = GAS_PER_INSTRUCTION + GAS_PER_BIT * bits as i64 + GAS_PER_REF * refs as i64;
        self.consume(cost)
    }

    /// Gas consumed, capped at the limit
    pub fn used(&self) -> i64 {
        self.consumed.min(self.limit)
    }

    /// Gas limit
    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Gas still available
    pub fn remaining(&self) -> i64 {
        (self.limit - self.consumed).max(0)
    }
}
