//! Execution Loop
//!
//! Decode, charge, execute until the code slice is exhausted (implicit
//! return) or an exception is raised. Raising an exception costs
//! [`EXCEPTION_GAS`] unless the exception is itself running out of gas.

use crate::arith::{checked, div_rem, shift_amount, shl, shr};
use crate::cell::{Cell, CellBuilder, CellSlice};
use crate::exception::VmException;
use crate::gas::{CELL_CREATE_GAS, CELL_LOAD_GAS, EXCEPTION_GAS, GasMeter, IMPLICIT_RET_GAS};
use crate::instruction::{DivOutput, Instruction};
use crate::stack::{Stack, StackEntry};
use opbench_core::{Completion, RunLimits};
use std::sync::Arc;

/// Highest global version whose semantics this VM implements
pub const MAX_SUPPORTED_VERSION: u32 = 4;

/// One program execution
#[derive(Debug, Clone)]
pub struct VmState {
    code: CellSlice,
    stack: Stack,
    gas: GasMeter,
    steps: u64,
}

impl VmState {
    /// Prepare to run `code` on `stack`
    pub fn new(code: Arc<Cell>, stack: Stack, limits: RunLimits) -> Self {
        Self {
            code: CellSlice::new(code),
            stack,
            gas: GasMeter::new(limits.gas_limit),
            steps: 0,
        }
    }

    /// Consume the state, keeping the stack the program left behind
    pub fn into_stack(self) -> Stack {
        self.stack
    }

    /// Run to completion
    pub fn run(&mut self) -> Completion {
        let exit_code = match self.run_until_return() {
            Ok(()) => 0,
            Err(exception) => self.raise(exception),
        };
        Completion {
            exit_code,
            gas_used: self.gas.used(),
        }
    }

    fn run_until_return(&mut self) -> Result<(), VmException> {
        while self.code.remaining_bits() > 0 {
            self.step()?;
        }
        self.gas.consume(IMPLICIT_RET_GAS)
    }

    fn raise(&mut self, exception: VmException) -> i32 {
        tracing::trace!(%exception, steps = self.steps, "vm exception");
        if exception != VmException::OutOfGas && self.gas.consume(EXCEPTION_GAS).is_err() {
            return VmException::OutOfGas.exit_code();
        }
        exception.exit_code()
    }

    /// Decode and execute one instruction
    pub fn step(&mut self) -> Result<(), VmException> {
        let decoded = Instruction::decode(&mut self.code)?;
        self.gas.charge_instruction(decoded.bits, decoded.refs)?;
        self.steps += 1;
        tracing::trace!(
            instruction = %decoded.instruction,
            step = self.steps,
            gas = self.gas.used(),
            "vm step"
        );
        self.execute(decoded.instruction)
    }

    fn binary(&mut self, op: impl FnOnce(i128, i128) -> Option<i128>) -> Result<(), VmException> {
        let y = self.stack.pop_int()?;
        let x = self.stack.pop_int()?;
        self.stack.push_int(checked(op(x, y))?);
        Ok(())
    }

    fn unary(&mut self, op: impl FnOnce(i128) -> Option<i128>) -> Result<(), VmException> {
        let x = self.stack.pop_int()?;
        self.stack.push_int(checked(op(x))?);
        Ok(())
    }

    fn compare(&mut self, pred: impl FnOnce(i128, i128) -> bool) -> Result<(), VmException> {
        let y = self.stack.pop_int()?;
        let x = self.stack.pop_int()?;
        self.stack.push_bool(pred(x, y));
        Ok(())
    }

    fn execute(&mut self, instruction: Instruction) -> Result<(), VmException> {
        match instruction {
            Instruction::Nop => Ok(()),
            Instruction::XchgTop(i) => self.stack.exchange(0, usize::from(i)),
            Instruction::Xchg(i, j) => self.stack.exchange(usize::from(i), usize::from(j)),
            Instruction::Push(i) => self.stack.push_copy(usize::from(i)),
            Instruction::Pop(i) => self.stack.pop_into(usize::from(i)),
            Instruction::PushInt(value) => {
                self.stack.push_int(value);
                Ok(())
            }
            Instruction::PushRef(cell) => {
                self.stack.push(StackEntry::Cell(cell));
                Ok(())
            }

            Instruction::Add => self.binary(i128::checked_add),
            Instruction::Sub => self.binary(i128::checked_sub),
            Instruction::SubR => self.binary(|x, y| y.checked_sub(x)),
            Instruction::Negate => self.unary(i128::checked_neg),
            Instruction::Inc => self.unary(|x| x.checked_add(1)),
            Instruction::Dec => self.unary(|x| x.checked_sub(1)),
            Instruction::AddConst(c) => self.unary(|x| x.checked_add(i128::from(c))),
            Instruction::MulConst(c) => self.unary(|x| x.checked_mul(i128::from(c))),
            Instruction::Mul => self.binary(i128::checked_mul),
            Instruction::Div { output, rounding } => {
                let y = self.stack.pop_int()?;
                let x = self.stack.pop_int()?;
                let (q, r) = div_rem(x, y, rounding)?;
                match output {
                    DivOutput::Quotient => self.stack.push_int(q),
                    DivOutput::Remainder => self.stack.push_int(r),
                    DivOutput::Both => {
                        self.stack.push_int(q);
                        self.stack.push_int(r);
                    }
                }
                Ok(())
            }

            Instruction::LShiftConst(n) => {
                let x = self.stack.pop_int()?;
                self.stack.push_int(shl(x, u32::from(n))?);
                Ok(())
            }
            Instruction::RShiftConst(n) => self.unary(|x| Some(shr(x, u32::from(n)))),
            Instruction::LShift => {
                let n = shift_amount(self.stack.pop_int()?)?;
                let x = self.stack.pop_int()?;
                self.stack.push_int(shl(x, n)?);
                Ok(())
            }
            Instruction::RShift => {
                let n = shift_amount(self.stack.pop_int()?)?;
                let x = self.stack.pop_int()?;
                self.stack.push_int(shr(x, n));
                Ok(())
            }
            Instruction::Pow2 => {
                let n = shift_amount(self.stack.pop_int()?)?;
                self.stack.push_int(shl(1, n)?);
                Ok(())
            }

            Instruction::And => self.binary(|x, y| Some(x & y)),
            Instruction::Or => self.binary(|x, y| Some(x | y)),
            Instruction::Xor => self.binary(|x, y| Some(x ^ y)),
            Instruction::Not => self.unary(|x| Some(!x)),

            Instruction::Min => self.binary(|x, y| Some(x.min(y))),
            Instruction::Max => self.binary(|x, y| Some(x.max(y))),
            Instruction::MinMax => {
                let y = self.stack.pop_int()?;
                let x = self.stack.pop_int()?;
                self.stack.push_int(x.min(y));
                self.stack.push_int(x.max(y));
                Ok(())
            }
            Instruction::Abs => self.unary(i128::checked_abs),

            Instruction::Sgn => self.unary(|x| Some(x.signum())),
            Instruction::Less => self.compare(|x, y| x < y),
            Instruction::Equal => self.compare(|x, y| x == y),
            Instruction::Leq => self.compare(|x, y| x <= y),
            Instruction::Greater => self.compare(|x, y| x > y),
            Instruction::Neq => self.compare(|x, y| x != y),
            Instruction::Geq => self.compare(|x, y| x >= y),
            Instruction::Cmp => self.binary(|x, y| Some(x.cmp(&y) as i128)),

            Instruction::NewC => {
                self.stack.push(StackEntry::Builder(CellBuilder::new()));
                Ok(())
            }
            Instruction::EndC => {
                let builder = self.stack.pop_builder()?;
                self.gas.consume(CELL_CREATE_GAS)?;
                self.stack.push(StackEntry::Cell(Arc::new(builder.build())));
                Ok(())
            }
            Instruction::Stu(bits) => {
                let mut builder = self.stack.pop_builder()?;
                let x = self.stack.pop_int()?;
                let value = u128::try_from(x).map_err(|_| VmException::RangeCheck)?;
                builder.store_uint(value, usize::from(bits))?;
                self.stack.push(StackEntry::Builder(builder));
                Ok(())
            }
            Instruction::Ctos => {
                let cell = self.stack.pop_cell()?;
                self.gas.consume(CELL_LOAD_GAS)?;
                self.stack.push(StackEntry::Slice(CellSlice::new(cell)));
                Ok(())
            }
            Instruction::Ends => {
                let slice = self.stack.pop_slice()?;
                if slice.remaining_bits() != 0 || slice.remaining_refs() != 0 {
                    return Err(VmException::CellUnderflow);
                }
                Ok(())
            }
            Instruction::Ldu(bits) => {
                let mut slice = self.stack.pop_slice()?;
                let value = load_unsigned(&mut slice, usize::from(bits))?;
                self.stack.push_int(value);
                self.stack.push(StackEntry::Slice(slice));
                Ok(())
            }

            Instruction::Throw(n) => Err(VmException::User(n)),
        }
    }
}

/// Read a `bits`-wide unsigned integer; values above `i128::MAX` overflow
fn load_unsigned(slice: &mut CellSlice, bits: usize) -> Result<i128, VmException> {
    if slice.remaining_bits() < bits {
        return Err(VmException::CellUnderflow);
    }
    let mut high = bits.saturating_sub(127);
    while high > 0 {
        let chunk = high.min(128);
        if slice.fetch_uint(chunk) != Some(0) {
            return Err(VmException::IntOverflow);
        }
        high -= chunk;
    }
    let low = slice
        .fetch_uint(bits.min(127))
        .ok_or(VmException::CellUnderflow)?;
    i128::try_from(low).map_err(|_| VmException::IntOverflow)
}
