//! Cells, Builders and Slices
//!
//! A cell holds up to 1023 data bits and up to four references to other
//! cells. Bits are stored most-significant first.

use std::sync::Arc;
use thiserror::Error;

/// Maximum number of data bits in one cell
pub const MAX_DATA_BITS: usize = 1023;

/// Maximum number of references in one cell
pub const MAX_REFS: usize = 4;

/// Builder/slice bounds violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CellError {
    /// Write past 1023 bits or four references
    #[error("cell overflow")]
    Overflow,
    /// Read past the end of the data or references
    #[error("cell underflow")]
    Underflow,
    /// Integer wider than the requested field
    #[error("value does not fit in {0} bits")]
    ValueOutOfRange(usize),
}

/// Immutable cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl Cell {
    /// Cell with no data and no references
    pub fn empty() -> Arc<Cell> {
        Arc::new(Cell::default())
    }

    /// Number of data bits
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Data bytes; bits past `bit_len` are zero
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Child cells
    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Bit at `index` (0 = most significant bit of the first byte)
    #[inline]
    pub fn bit(&self, index: usize) -> bool {
        debug_assert!(index < self.bit_len);
        (self.data[index / 8] >> (7 - index % 8)) & 1 == 1
    }
}

/// Mutable cell under construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Bits stored so far
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Bits that can still be stored
    pub fn remaining_bits(&self) -> usize {
        MAX_DATA_BITS - self.bit_len
    }

    #[inline]
    fn push_bit(&mut self, bit: bool) {
        let offset = self.bit_len % 8;
        if offset == 0 {
            self.data.push(0);
        }
        if bit {
            if let Some(last) = self.data.last_mut() {
                *last |= 0x80 >> offset;
            }
        }
        self.bit_len += 1;
    }

    /// Append one bit
    pub fn store_bit(&mut self, bit: bool) -> Result<(), CellError> {
        if self.remaining_bits() == 0 {
            return Err(CellError::Overflow);
        }
        self.push_bit(bit);
        Ok(())
    }

    /// Append the first `bits` bits of `src`
    pub fn store_bits(&mut self, src: &[u8], bits: usize) -> Result<(), CellError> {
        if bits > src.len() * 8 {
            return Err(CellError::Underflow);
        }
        if bits > self.remaining_bits() {
            return Err(CellError::Overflow);
        }
        for i in 0..bits {
            self.push_bit((src[i / 8] >> (7 - i % 8)) & 1 == 1);
        }
        Ok(())
    }

    /// Append `value` as a `bits`-wide unsigned big-endian integer.
    ///
    /// Widths above 128 are zero-extended on the left.
    pub fn store_uint(&mut self, value: u128, bits: usize) -> Result<(), CellError> {
        if bits < 128 && value >> bits != 0 {
            return Err(CellError::ValueOutOfRange(bits));
        }
        if bits > self.remaining_bits() {
            return Err(CellError::Overflow);
        }
        for i in (0..bits).rev() {
            self.push_bit(i < 128 && (value >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Append a reference
    pub fn store_ref(&mut self, cell: Arc<Cell>) -> Result<(), CellError> {
        if self.refs.len() >= MAX_REFS {
            return Err(CellError::Overflow);
        }
        self.refs.push(cell);
        Ok(())
    }

    /// Finish the cell
    pub fn build(self) -> Cell {
        Cell {
            data: self.data,
            bit_len: self.bit_len,
            refs: self.refs,
        }
    }
}

/// Read cursor over a cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSlice {
    cell: Arc<Cell>,
    bit_pos: usize,
    ref_pos: usize,
}

impl CellSlice {
    /// Cursor at the start of `cell`
    pub fn new(cell: Arc<Cell>) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    /// Bits consumed so far
    pub fn position(&self) -> usize {
        self.bit_pos
    }

    /// Bits left to read
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    /// References left to read
    pub fn remaining_refs(&self) -> usize {
        self.cell.refs().len() - self.ref_pos
    }

    /// Read `bits` (at most 128) without advancing
    pub fn prefetch_uint(&self, bits: usize) -> Option<u128> {
        if bits > 128 || bits > self.remaining_bits() {
            return None;
        }
        let value = (0..bits).fold(0_u128, |acc, i| {
            let bit = self.cell.bit(self.bit_pos + i);
            (acc << 1) | u128::from(bit)
        });
        Some(value)
    }

    /// Read `bits` (at most 128) and advance
    pub fn fetch_uint(&mut self, bits: usize) -> Option<u128> {
        let value = self.prefetch_uint(bits)?;
        self.bit_pos += bits;
        Some(value)
    }

    /// Read one byte and advance
    #[inline]
    pub fn fetch_u8(&mut self) -> Option<u8> {
        self.fetch_uint(8).map(|v| v as u8)
    }

    /// Read the next reference and advance
    pub fn fetch_ref(&mut self) -> Option<Arc<Cell>> {
        let cell = self.cell.refs().get(self.ref_pos)?.clone();
        self.ref_pos += 1;
        Some(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_read_back() {
        let mut b = CellBuilder::new();
        b.store_uint(0xA9, 8).unwrap();
        b.store_uint(0b101, 3).unwrap();
        b.store_bit(true).unwrap();
        let cell = Arc::new(b.build());

        assert_eq!(cell.bit_len(), 12);
        assert_eq!(cell.data(), &[0xA9, 0xB0]);

        let mut s = CellSlice::new(cell);
        assert_eq!(s.fetch_u8(), Some(0xA9));
        assert_eq!(s.prefetch_uint(4), Some(0b1011));
        assert_eq!(s.fetch_uint(5), None);
        assert_eq!(s.fetch_uint(4), Some(0b1011));
        assert_eq!(s.remaining_bits(), 0);
    }

    #[test]
    fn test_overflow_is_atomic() {
        let mut b = CellBuilder::new();
        b.store_uint(0, 1000).unwrap();
        assert_eq!(b.store_uint(0, 24), Err(CellError::Overflow));
        assert_eq!(b.bit_len(), 1000);
        b.store_uint(0, 23).unwrap();
        assert_eq!(b.store_bit(false), Err(CellError::Overflow));
    }

    #[test]
    fn test_value_range() {
        let mut b = CellBuilder::new();
        assert_eq!(b.store_uint(256, 8), Err(CellError::ValueOutOfRange(8)));
        b.store_uint(u128::MAX, 200).unwrap();
        assert_eq!(b.bit_len(), 200);
    }

    #[test]
    fn test_refs() {
        let mut b = CellBuilder::new();
        for _ in 0..MAX_REFS {
            b.store_ref(Cell::empty()).unwrap();
        }
        assert_eq!(b.store_ref(Cell::empty()), Err(CellError::Overflow));

        let mut s = CellSlice::new(Arc::new(b.build()));
        assert_eq!(s.remaining_refs(), 4);
        assert!(s.fetch_ref().is_some());
        assert_eq!(s.remaining_refs(), 3);
    }
}
