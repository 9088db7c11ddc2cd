//! Instruction Decoding
//!
//! Supported encodings (hex, first byte then arguments):
//!
//! | Encoding | Instruction |
//! |----------|-------------|
//! | `00` | NOP |
//! | `0i` | XCHG s0,s(i) (`01` = SWAP) |
//! | `10ij` | XCHG s(i),s(j), 1 <= i < j |
//! | `2i` / `3i` | PUSH s(i) / POP s(i) |
//! | `7i` | PUSHINT -5..=10 |
//! | `80xx` / `81xxxx` | PUSHINT 8-bit / 16-bit |
//! | `88` | PUSHREF (consumes one reference) |
//! | `A0`..`A8` | ADD SUB SUBR NEGATE INC DEC ADDCONST MULCONST MUL |
//! | `A9xx` | division family |
//! | `AAcc` `ABcc` `AC` `AD` `AE` | LSHIFT#, RSHIFT#, LSHIFT, RSHIFT, POW2 |
//! | `B0`..`B3` | AND OR XOR NOT |
//! | `B608`..`B60B` | MIN MAX MINMAX ABS |
//! | `B8`..`BF` | SGN LESS EQUAL LEQ GREATER NEQ GEQ CMP |
//! | `C8` `C9` `CBcc` | NEWC ENDC STU |
//! | `D0` `D1` `D3cc` | CTOS ENDS LDU |
//! | `F2nn` | THROW 0..=63 |

use crate::cell::{Cell, CellSlice};
use crate::exception::VmException;
use std::fmt;
use std::sync::Arc;

/// Rounding mode of a division
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward negative infinity
    Floor,
    /// Nearest, ties toward positive infinity
    Nearest,
    /// Toward positive infinity
    Ceil,
}

/// Results pushed by a division
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivOutput {
    /// Quotient only
    Quotient,
    /// Remainder only
    Remainder,
    /// Quotient, then remainder on top
    Both,
}

/// Decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `NOP`
    Nop,
    /// `XCHG s0,s(i)`
    XchgTop(u8),
    /// `XCHG s(i),s(j)`
    Xchg(u8, u8),
    /// `PUSH s(i)`
    Push(u8),
    /// `POP s(i)`
    Pop(u8),
    /// `PUSHINT`
    PushInt(i128),
    /// `PUSHREF`, carrying the consumed reference
    PushRef(Arc<Cell>),
    /// `ADD`
    Add,
    /// `SUB`
    Sub,
    /// `SUBR`
    SubR,
    /// `NEGATE`
    Negate,
    /// `INC`
    Inc,
    /// `DEC`
    Dec,
    /// `ADDCONST cc`
    AddConst(i8),
    /// `MULCONST cc`
    MulConst(i8),
    /// `MUL`
    Mul,
    /// Division family (`DIV`, `MODR`, `DIVMODC`, ...)
    Div {
        /// Values pushed
        output: DivOutput,
        /// Rounding of the quotient
        rounding: Rounding,
    },
    /// `LSHIFT cc+1`
    LShiftConst(u16),
    /// `RSHIFT cc+1`
    RShiftConst(u16),
    /// `LSHIFT`
    LShift,
    /// `RSHIFT`
    RShift,
    /// `POW2`
    Pow2,
    /// `AND`
    And,
    /// `OR`
    Or,
    /// `XOR`
    Xor,
    /// `NOT`
    Not,
    /// `MIN`
    Min,
    /// `MAX`
    Max,
    /// `MINMAX`
    MinMax,
    /// `ABS`
    Abs,
    /// `SGN`
    Sgn,
    /// `LESS`
    Less,
    /// `EQUAL`
    Equal,
    /// `LEQ`
    Leq,
    /// `GREATER`
    Greater,
    /// `NEQ`
    Neq,
    /// `GEQ`
    Geq,
    /// `CMP`
    Cmp,
    /// `NEWC`
    NewC,
    /// `ENDC`
    EndC,
    /// `STU cc+1`
    Stu(u16),
    /// `CTOS`
    Ctos,
    /// `ENDS`
    Ends,
    /// `LDU cc+1`
    Ldu(u16),
    /// `THROW n`
    Throw(u16),
}

/// An instruction together with the size of its encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The instruction
    pub instruction: Instruction,
    /// Encoding length in bits
    pub bits: usize,
    /// References consumed from the code cell
    pub refs: usize,
}

#[inline]
fn arg(code: &mut CellSlice) -> Result<u8, VmException> {
    code.fetch_u8().ok_or(VmException::InvalidOpcode)
}

impl Instruction {
    /// Decode the next instruction from `code`, advancing past it.
    ///
    /// Unknown or truncated encodings raise [`VmException::InvalidOpcode`].
    pub fn decode(code: &mut CellSlice) -> Result<Decoded, VmException> {
        let start = code.position();
        let start_refs = code.remaining_refs();
        let opcode = arg(code)?;

        let instruction = match opcode {
            0x00 => Instruction::Nop,
            0x01..=0x0F => Instruction::XchgTop(opcode),
            0x10 => {
                let ij = arg(code)?;
                let (i, j) = (ij >> 4, ij & 0x0F);
                if i == 0 || i >= j {
                    return Err(VmException::InvalidOpcode);
                }
                Instruction::Xchg(i, j)
            }
            0x20..=0x2F => Instruction::Push(opcode & 0x0F),
            0x30..=0x3F => Instruction::Pop(opcode & 0x0F),
            0x70..=0x7F => {
                let x = i128::from(opcode & 0x0F);
                Instruction::PushInt(if x > 10 { x - 16 } else { x })
            }
            0x80 => Instruction::PushInt(i128::from(arg(code)? as i8)),
            0x81 => {
                let hi = arg(code)?;
                let lo = arg(code)?;
                Instruction::PushInt(i128::from(i16::from_be_bytes([hi, lo])))
            }
            0x88 => Instruction::PushRef(code.fetch_ref().ok_or(VmException::InvalidOpcode)?),
            0xA0 => Instruction::Add,
            0xA1 => Instruction::Sub,
            0xA2 => Instruction::SubR,
            0xA3 => Instruction::Negate,
            0xA4 => Instruction::Inc,
            0xA5 => Instruction::Dec,
            0xA6 => Instruction::AddConst(arg(code)? as i8),
            0xA7 => Instruction::MulConst(arg(code)? as i8),
            0xA8 => Instruction::Mul,
            0xA9 => decode_division(arg(code)?)?,
            0xAA => Instruction::LShiftConst(u16::from(arg(code)?) + 1),
            0xAB => Instruction::RShiftConst(u16::from(arg(code)?) + 1),
            0xAC => Instruction::LShift,
            0xAD => Instruction::RShift,
            0xAE => Instruction::Pow2,
            0xB0 => Instruction::And,
            0xB1 => Instruction::Or,
            0xB2 => Instruction::Xor,
            0xB3 => Instruction::Not,
            0xB6 => match arg(code)? {
                0x08 => Instruction::Min,
                0x09 => Instruction::Max,
                0x0A => Instruction::MinMax,
                0x0B => Instruction::Abs,
                _ => return Err(VmException::InvalidOpcode),
            },
            0xB8 => Instruction::Sgn,
            0xB9 => Instruction::Less,
            0xBA => Instruction::Equal,
            0xBB => Instruction::Leq,
            0xBC => Instruction::Greater,
            0xBD => Instruction::Neq,
            0xBE => Instruction::Geq,
            0xBF => Instruction::Cmp,
            0xC8 => Instruction::NewC,
            0xC9 => Instruction::EndC,
            0xCB => Instruction::Stu(u16::from(arg(code)?) + 1),
            0xD0 => Instruction::Ctos,
            0xD1 => Instruction::Ends,
            0xD3 => Instruction::Ldu(u16::from(arg(code)?) + 1),
            0xF2 => {
                let n = arg(code)?;
                if n >> 6 != 0 {
                    return Err(VmException::InvalidOpcode);
                }
                Instruction::Throw(u16::from(n))
            }
            _ => return Err(VmException::InvalidOpcode),
        };

        Ok(Decoded {
            instruction,
            bits: code.position() - start,
            refs: start_refs - code.remaining_refs(),
        })
    }
}

/// Second byte of `A9`: `m s s c d d f f`
fn decode_division(b: u8) -> Result<Instruction, VmException> {
    let (m, s, c) = (b >> 7, (b >> 5) & 0b11, (b >> 4) & 1);
    if m != 0 || s != 0 || c != 0 {
        return Err(VmException::InvalidOpcode);
    }
    let output = match (b >> 2) & 0b11 {
        1 => DivOutput::Quotient,
        2 => DivOutput::Remainder,
        3 => DivOutput::Both,
        _ => return Err(VmException::InvalidOpcode),
    };
    let rounding = match b & 0b11 {
        0 => Rounding::Floor,
        1 => Rounding::Nearest,
        2 => Rounding::Ceil,
        _ => return Err(VmException::InvalidOpcode),
    };
    Ok(Instruction::Div { output, rounding })
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Nop => f.write_str("NOP"),
            Instruction::XchgTop(1) => f.write_str("SWAP"),
            Instruction::XchgTop(i) => write!(f, "XCHG s0,s{i}"),
            Instruction::Xchg(i, j) => write!(f, "XCHG s{i},s{j}"),
            Instruction::Push(0) => f.write_str("DUP"),
            Instruction::Push(1) => f.write_str("OVER"),
            Instruction::Push(i) => write!(f, "PUSH s{i}"),
            Instruction::Pop(0) => f.write_str("DROP"),
            Instruction::Pop(1) => f.write_str("NIP"),
            Instruction::Pop(i) => write!(f, "POP s{i}"),
            Instruction::PushInt(v) => write!(f, "PUSHINT {v}"),
            Instruction::PushRef(_) => f.write_str("PUSHREF"),
            Instruction::Add => f.write_str("ADD"),
            Instruction::Sub => f.write_str("SUB"),
            Instruction::SubR => f.write_str("SUBR"),
            Instruction::Negate => f.write_str("NEGATE"),
            Instruction::Inc => f.write_str("INC"),
            Instruction::Dec => f.write_str("DEC"),
            Instruction::AddConst(c) => write!(f, "ADDCONST {c}"),
            Instruction::MulConst(c) => write!(f, "MULCONST {c}"),
            Instruction::Mul => f.write_str("MUL"),
            Instruction::Div { output, rounding } => {
                let name = match output {
                    DivOutput::Quotient => "DIV",
                    DivOutput::Remainder => "MOD",
                    DivOutput::Both => "DIVMOD",
                };
                let suffix = match rounding {
                    Rounding::Floor => "",
                    Rounding::Nearest => "R",
                    Rounding::Ceil => "C",
                };
                write!(f, "{name}{suffix}")
            }
            Instruction::LShiftConst(n) => write!(f, "LSHIFT {n}"),
            Instruction::RShiftConst(n) => write!(f, "RSHIFT {n}"),
            Instruction::LShift => f.write_str("LSHIFT"),
            Instruction::RShift => f.write_str("RSHIFT"),
            Instruction::Pow2 => f.write_str("POW2"),
            Instruction::And => f.write_str("AND"),
            Instruction::Or => f.write_str("OR"),
            Instruction::Xor => f.write_str("XOR"),
            Instruction::Not => f.write_str("NOT"),
            Instruction::Min => f.write_str("MIN"),
            Instruction::Max => f.write_str("MAX"),
            Instruction::MinMax => f.write_str("MINMAX"),
            Instruction::Abs => f.write_str("ABS"),
            Instruction::Sgn => f.write_str("SGN"),
            Instruction::Less => f.write_str("LESS"),
            Instruction::Equal => f.write_str("EQUAL"),
            Instruction::Leq => f.write_str("LEQ"),
            Instruction::Greater => f.write_str("GREATER"),
            Instruction::Neq => f.write_str("NEQ"),
            Instruction::Geq => f.write_str("GEQ"),
            Instruction::Cmp => f.write_str("CMP"),
            Instruction::NewC => f.write_str("NEWC"),
            Instruction::EndC => f.write_str("ENDC"),
            Instruction::Stu(n) => write!(f, "STU {n}"),
            Instruction::Ctos => f.write_str("CTOS"),
            Instruction::Ends => f.write_str("ENDS"),
            Instruction::Ldu(n) => write!(f, "LDU {n}"),
            Instruction::Throw(n) => write!(f, "THROW {n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;

    fn slice(bytes: &[u8]) -> CellSlice {
        let mut b = CellBuilder::new();
        b.store_bits(bytes, bytes.len() * 8).unwrap();
        CellSlice::new(Arc::new(b.build()))
    }

    fn decode_all(bytes: &[u8]) -> Vec<String> {
        let mut code = slice(bytes);
        let mut out = Vec::new();
        while code.remaining_bits() > 0 {
            out.push(Instruction::decode(&mut code).unwrap().instruction.to_string());
        }
        out
    }

    #[test]
    fn test_division_family() {
        assert_eq!(
            decode_all(&[0xA9, 0x04, 0xA9, 0x08, 0xA9, 0x0C, 0xA9, 0x0E, 0xA9, 0x05]),
            ["DIV", "MOD", "DIVMOD", "DIVMODC", "DIVR"]
        );
        assert_eq!(
            Instruction::decode(&mut slice(&[0xA9, 0x00])),
            Err(VmException::InvalidOpcode)
        );
        assert_eq!(
            Instruction::decode(&mut slice(&[0xA9, 0x03])),
            Err(VmException::InvalidOpcode)
        );
    }

    #[test]
    fn test_push_constants() {
        assert_eq!(
            decode_all(&[0x70, 0x7A, 0x7B, 0x7F, 0x80, 0xFF, 0x80, 0x1C, 0x81, 0x80, 0x00]),
            [
                "PUSHINT 0",
                "PUSHINT 10",
                "PUSHINT -5",
                "PUSHINT -1",
                "PUSHINT -1",
                "PUSHINT 28",
                "PUSHINT -32768"
            ]
        );
    }

    #[test]
    fn test_encoding_size() {
        let decoded = Instruction::decode(&mut slice(&[0xA9, 0x0E])).unwrap();
        assert_eq!(decoded.bits, 16);
        assert_eq!(decoded.refs, 0);

        let decoded = Instruction::decode(&mut slice(&[0x01])).unwrap();
        assert_eq!(decoded.instruction, Instruction::XchgTop(1));
        assert_eq!(decoded.bits, 8);
    }

    #[test]
    fn test_pushref_consumes_reference() {
        let mut b = CellBuilder::new();
        b.store_uint(0x88, 8).unwrap();
        b.store_ref(Cell::empty()).unwrap();
        let mut code = CellSlice::new(Arc::new(b.build()));

        let decoded = Instruction::decode(&mut code).unwrap();
        assert_eq!(decoded.refs, 1);
        assert_eq!(code.remaining_refs(), 0);

        assert_eq!(
            Instruction::decode(&mut slice(&[0x88])),
            Err(VmException::InvalidOpcode)
        );
    }

    #[test]
    fn test_invalid_and_truncated() {
        assert_eq!(
            Instruction::decode(&mut slice(&[0xFF])),
            Err(VmException::InvalidOpcode)
        );
        assert_eq!(
            Instruction::decode(&mut slice(&[0x80])),
            Err(VmException::InvalidOpcode)
        );
        assert_eq!(
            Instruction::decode(&mut slice(&[0x10, 0x21])),
            Err(VmException::InvalidOpcode)
        );
        assert_eq!(
            Instruction::decode(&mut slice(&[0xF2, 0x40])),
            Err(VmException::InvalidOpcode)
        );
    }

    #[test]
    fn test_stack_mnemonics() {
        assert_eq!(
            decode_all(&[0x00, 0x01, 0x02, 0x10, 0x12, 0x20, 0x21, 0x25, 0x30, 0x31, 0x33]),
            [
                "NOP",
                "SWAP",
                "XCHG s0,s2",
                "XCHG s1,s2",
                "DUP",
                "OVER",
                "PUSH s5",
                "DROP",
                "NIP",
                "POP s3"
            ]
        );
    }
}
