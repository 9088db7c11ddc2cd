//! VM Exceptions

use crate::cell::CellError;
use thiserror::Error;

/// Condition that terminates execution with a nonzero exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VmException {
    /// Exit code 2
    #[error("stack underflow")]
    StackUnderflow,

    /// Exit code 4
    #[error("integer overflow")]
    IntOverflow,

    /// Exit code 5
    #[error("range check error")]
    RangeCheck,

    /// Exit code 6
    #[error("invalid opcode")]
    InvalidOpcode,

    /// Exit code 7
    #[error("type check error")]
    TypeCheck,

    /// Exit code 8
    #[error("cell overflow")]
    CellOverflow,

    /// Exit code 9
    #[error("cell underflow")]
    CellUnderflow,

    /// Exit code -14
    #[error("out of gas")]
    OutOfGas,

    /// `THROW n`
    #[error("user exception {0}")]
    User(u16),
}

impl VmException {
    /// Exit code reported in the completion record
    pub fn exit_code(self) -> i32 {
        match self {
            VmException::StackUnderflow => 2,
            VmException::IntOverflow => 4,
            VmException::RangeCheck => 5,
            VmException::InvalidOpcode => 6,
            VmException::TypeCheck => 7,
            VmException::CellOverflow => 8,
            VmException::CellUnderflow => 9,
            VmException::OutOfGas => -14,
            VmException::User(code) => i32::from(code),
        }
    }
}

impl From<CellError> for VmException {
    fn from(err: CellError) -> Self {
        match err {
            CellError::Overflow => VmException::CellOverflow,
            CellError::Underflow => VmException::CellUnderflow,
            CellError::ValueOutOfRange(_) => VmException::RangeCheck,
        }
    }
}
