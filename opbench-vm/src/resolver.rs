//! Code Token Resolution
//!
//! A token is either `boc:` followed by a base64 bag of cells with one root,
//! or a hex bitstring literal such as `A90E`. A literal ending in `_` carries
//! a completion tag: trailing zero bits and the final one bit are dropped, so
//! `4_` is the 2-bit string `01`. The empty token is the empty program.

use crate::boc::{BocError, deserialize_single_root};
use crate::cell::{Cell, CellBuilder, MAX_DATA_BITS};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use opbench_core::CodeResolver;
use std::sync::Arc;
use thiserror::Error;

/// Prefix selecting the bag-of-cells form
pub const BOC_PREFIX: &str = "boc:";

const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Token could not be turned into code
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Character outside `0-9a-fA-F`
    #[error("invalid hex digit {ch:?} at position {position}")]
    InvalidHexDigit {
        /// Character offset in the token
        position: usize,
        /// Offending character
        ch: char,
    },

    /// Hex payload does not fit in one cell
    #[error("bitstring of {bits} bits exceeds the 1023-bit cell limit")]
    TooLong {
        /// Bits the token decodes to
        bits: usize,
    },

    /// `boc:` payload is not base64
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// `boc:` payload is not a valid container
    #[error("malformed bag of cells: {0}")]
    Boc(#[from] BocError),
}

/// Executable code: the root cell of a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeUnit {
    root: Arc<Cell>,
}

impl CodeUnit {
    /// Wrap a root cell
    pub fn new(root: Arc<Cell>) -> Self {
        Self { root }
    }

    /// The program with no instructions
    pub fn empty() -> Self {
        Self::new(Cell::empty())
    }

    /// Root cell of the program
    pub fn root(&self) -> &Arc<Cell> {
        &self.root
    }
}

/// Resolver for hex literals and `boc:` tokens
#[derive(Debug, Default, Clone, Copy)]
pub struct TvmResolver;

impl CodeResolver for TvmResolver {
    type Code = CodeUnit;
    type Error = DecodeError;

    fn resolve(&self, token: &str) -> Result<CodeUnit, DecodeError> {
        let root = match token.strip_prefix(BOC_PREFIX) {
            Some(payload) => {
                let bytes = BASE64.decode(payload.trim())?;
                deserialize_single_root(&bytes)?
            }
            None => Arc::new(parse_hex_bitstring(token)?),
        };
        Ok(CodeUnit::new(root))
    }
}

/// Parse a hex bitstring literal into a cell without references
pub fn parse_hex_bitstring(literal: &str) -> Result<Cell, DecodeError> {
    let (digits, tagged) = match literal.strip_suffix('_') {
        Some(digits) => (digits, true),
        None => (literal, false),
    };

    let mut bytes = Vec::with_capacity(digits.len().div_ceil(2));
    for (position, ch) in digits.chars().enumerate() {
        let nibble = ch
            .to_digit(16)
            .ok_or(DecodeError::InvalidHexDigit { position, ch })? as u8;
        if position % 2 == 0 {
            bytes.push(nibble << 4);
        } else if let Some(last) = bytes.last_mut() {
            *last |= nibble;
        }
    }

    let mut bits = digits.len() * 4;
    if tagged {
        while bits > 0 && (bytes[(bits - 1) / 8] >> (7 - (bits - 1) % 8)) & 1 == 0 {
            bits -= 1;
        }
        bits = bits.saturating_sub(1);
    }
    if bits > MAX_DATA_BITS {
        return Err(DecodeError::TooLong { bits });
    }

    let mut builder = CellBuilder::new();
    builder
        .store_bits(&bytes, bits)
        .map_err(|_| DecodeError::TooLong { bits })?;
    Ok(builder.build())
}
