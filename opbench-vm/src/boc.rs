//! Bag-of-Cells Deserialization
//!
//! Layout of the generic container:
//!
//! ```text
//! magic       u32  b5ee9c72
//! flags       u8   has_idx:1 has_crc32c:1 has_cache_bits:1 flags:2 size:3
//! off_bytes   u8
//! cells       size bytes
//! roots       size bytes
//! absent      size bytes
//! tot_cells   off_bytes bytes
//! root_list   roots * size bytes
//! index       cells * off_bytes bytes (if has_idx)
//! cell_data   tot_cells bytes
//! crc32c      u32 little endian (if has_crc32c)
//! ```
//!
//! Each cell record is `d1 d2 data refs`, where `d1 = refs + 8*exotic +
//! 16*with_hashes + 32*level` and `d2 = floor(bits/8) + ceil(bits/8)`. An odd
//! `d2` marks a completion tag in the last data byte. References must point
//! to cells later in the list.

use crate::cell::{Cell, CellBuilder, MAX_REFS};
use std::sync::Arc;
use thiserror::Error;

/// Magic prefix of the generic container format
pub const BOC_GENERIC_MAGIC: u32 = 0xb5ee_9c72;

/// Malformed or unsupported container
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BocError {
    /// Input ended early
    #[error("unexpected end of data at byte {0}")]
    UnexpectedEof(usize),

    /// Not a generic container
    #[error("unknown magic {0:#010x}")]
    BadMagic(u32),

    /// Reference size outside 1..=4 bytes
    #[error("invalid reference size {0}")]
    BadRefSize(usize),

    /// Offset size outside 1..=8 bytes
    #[error("invalid offset size {0}")]
    BadOffsetSize(usize),

    /// More roots than cells
    #[error("root count {roots} exceeds cell count {cells}")]
    TooManyRoots {
        /// Declared roots
        roots: usize,
        /// Declared cells
        cells: usize,
    },

    /// Code containers carry a single root
    #[error("expected exactly one root, found {0}")]
    RootCount(usize),

    /// Container declares absent cells
    #[error("absent cells are not supported")]
    AbsentCells,

    /// Root or reference index past the cell count
    #[error("cell index {0} out of range")]
    IndexOutOfRange(usize),

    /// Descriptor bytes inconsistent
    #[error("cell {0} has an invalid descriptor")]
    BadDescriptor(usize),

    /// Exotic cells are not supported
    #[error("cell {0} is exotic")]
    ExoticCell(usize),

    /// Reference to a cell at or before the referrer
    #[error("cell {index} references cell {target}, which does not follow it")]
    BackwardReference {
        /// Referring cell
        index: usize,
        /// Referenced cell
        target: usize,
    },

    /// Cell data size disagrees with the header
    #[error("cell data occupies {actual} bytes, header declares {declared}")]
    SizeMismatch {
        /// Size from the header
        declared: usize,
        /// Bytes consumed by cells
        actual: usize,
    },

    /// CRC-32C trailer does not match the payload
    #[error("crc32c mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Trailer value
        stored: u32,
        /// Checksum of the payload
        computed: u32,
    },

    /// Bytes left after the container
    #[error("{0} trailing bytes after container")]
    TrailingBytes(usize),
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], BocError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(BocError::UnexpectedEof(self.pos))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn byte(&mut self) -> Result<u8, BocError> {
        Ok(self.take(1)?[0])
    }

    fn uint(&mut self, n: usize) -> Result<usize, BocError> {
        let value = self
            .take(n)?
            .iter()
            .fold(0_u64, |acc, &b| (acc << 8) | u64::from(b));
        usize::try_from(value).map_err(|_| BocError::UnexpectedEof(self.pos))
    }
}

struct RawCell<'a> {
    data: &'a [u8],
    bits: usize,
    refs: Vec<usize>,
}

/// Decode a container and return its root cells
pub fn deserialize_boc(bytes: &[u8]) -> Result<Vec<Arc<Cell>>, BocError> {
    let mut r = Reader { bytes, pos: 0 };

    let magic = u32::from_be_bytes([r.byte()?, r.byte()?, r.byte()?, r.byte()?]);
    if magic != BOC_GENERIC_MAGIC {
        return Err(BocError::BadMagic(magic));
    }

    let flags = r.byte()?;
    let has_idx = flags & 0x80 != 0;
    let has_crc = flags & 0x40 != 0;
    let ref_size = usize::from(flags & 0x07);
    if !(1..=4).contains(&ref_size) {
        return Err(BocError::BadRefSize(ref_size));
    }
    let off_bytes = usize::from(r.byte()?);
    if !(1..=8).contains(&off_bytes) {
        return Err(BocError::BadOffsetSize(off_bytes));
    }

    let cell_count = r.uint(ref_size)?;
    let root_count = r.uint(ref_size)?;
    let absent = r.uint(ref_size)?;
    let tot_cells_size = r.uint(off_bytes)?;
    if root_count > cell_count {
        return Err(BocError::TooManyRoots {
            roots: root_count,
            cells: cell_count,
        });
    }
    if absent != 0 {
        return Err(BocError::AbsentCells);
    }

    let mut roots = Vec::with_capacity(root_count);
    for _ in 0..root_count {
        let index = r.uint(ref_size)?;
        if index >= cell_count {
            return Err(BocError::IndexOutOfRange(index));
        }
        roots.push(index);
    }

    if has_idx {
        let index_len = cell_count
            .checked_mul(off_bytes)
            .ok_or(BocError::UnexpectedEof(r.pos))?;
        r.take(index_len)?;
    }

    let data_start = r.pos;
    let mut raw = Vec::with_capacity(cell_count.min(bytes.len()));
    for index in 0..cell_count {
        raw.push(read_cell(&mut r, index, cell_count, ref_size)?);
    }
    let actual = r.pos - data_start;
    if actual != tot_cells_size {
        return Err(BocError::SizeMismatch {
            declared: tot_cells_size,
            actual,
        });
    }

    if has_crc {
        let computed = crc32c::crc32c(&bytes[..r.pos]);
        let stored = u32::from_le_bytes([r.byte()?, r.byte()?, r.byte()?, r.byte()?]);
        if stored != computed {
            return Err(BocError::ChecksumMismatch { stored, computed });
        }
    }
    if r.pos != bytes.len() {
        return Err(BocError::TrailingBytes(bytes.len() - r.pos));
    }

    // references point forward, so build from the end of the list
    let mut built: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
    for (index, cell) in raw.iter().enumerate().rev() {
        let mut b = CellBuilder::new();
        b.store_bits(cell.data, cell.bits)
            .map_err(|_| BocError::BadDescriptor(index))?;
        for &target in &cell.refs {
            let child = built[target]
                .clone()
                .ok_or(BocError::BackwardReference { index, target })?;
            b.store_ref(child)
                .map_err(|_| BocError::BadDescriptor(index))?;
        }
        built[index] = Some(Arc::new(b.build()));
    }

    roots
        .into_iter()
        .map(|i| built[i].clone().ok_or(BocError::IndexOutOfRange(i)))
        .collect()
}

fn read_cell<'a>(
    r: &mut Reader<'a>,
    index: usize,
    cell_count: usize,
    ref_size: usize,
) -> Result<RawCell<'a>, BocError> {
    let d1 = r.byte()?;
    let d2 = r.byte()?;

    let ref_count = usize::from(d1 & 0x07);
    if ref_count > MAX_REFS {
        return Err(BocError::BadDescriptor(index));
    }
    if d1 & 0x08 != 0 {
        return Err(BocError::ExoticCell(index));
    }
    if d1 & 0x10 != 0 {
        // stored hashes are not supported
        return Err(BocError::BadDescriptor(index));
    }

    let data_len = usize::from(d2).div_ceil(2);
    let data = r.take(data_len)?;
    let bits = if d2 & 1 == 1 {
        let last = data[data_len - 1];
        if last == 0 {
            return Err(BocError::BadDescriptor(index));
        }
        data_len * 8 - (last.trailing_zeros() as usize + 1)
    } else {
        data_len * 8
    };

    let mut refs = Vec::with_capacity(ref_count);
    for _ in 0..ref_count {
        let target = r.uint(ref_size)?;
        if target >= cell_count {
            return Err(BocError::IndexOutOfRange(target));
        }
        if target <= index {
            return Err(BocError::BackwardReference { index, target });
        }
        refs.push(target);
    }

    Ok(RawCell { data, bits, refs })
}

/// Decode a container that must hold exactly one root
pub fn deserialize_single_root(bytes: &[u8]) -> Result<Arc<Cell>, BocError> {
    let mut roots = deserialize_boc(bytes)?;
    match roots.len() {
        1 => Ok(roots.remove(0)),
        n => Err(BocError::RootCount(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One root holding `A9 0E`
    const DIVMODC_BOC: [u8; 15] = [
        0xb5, 0xee, 0x9c, 0x72, 0x01, 0x01, 0x01, 0x01, 0x00, 0x04, 0x00, 0x00, 0x04, 0xa9, 0x0e,
    ];

    #[test]
    fn test_crc32c_check_value() {
        assert_eq!(crc32c::crc32c(b"123456789"), 0xE306_9283);
        assert_eq!(crc32c::crc32c(b""), 0);
    }

    #[test]
    fn test_single_cell() {
        let root = deserialize_single_root(&DIVMODC_BOC).unwrap();
        assert_eq!(root.bit_len(), 16);
        assert_eq!(root.data(), &[0xa9, 0x0e]);
        assert!(root.refs().is_empty());
    }

    #[test]
    fn test_two_cells_with_reference() {
        let bytes = [
            0xb5, 0xee, 0x9c, 0x72, 0x01, 0x01, 0x02, 0x01, 0x00, 0x07, 0x00, 0x01, 0x02, 0x88,
            0x01, 0x00, 0x02, 0x7b,
        ];
        let root = deserialize_single_root(&bytes).unwrap();
        assert_eq!(root.data(), &[0x88]);
        assert_eq!(root.refs().len(), 1);
        assert_eq!(root.refs()[0].data(), &[0x7b]);
    }

    #[test]
    fn test_completion_tag() {
        // 4 bits `A` encoded as A8 with d2 = 1
        let bytes = [
            0xb5, 0xee, 0x9c, 0x72, 0x01, 0x01, 0x01, 0x01, 0x00, 0x03, 0x00, 0x00, 0x01, 0xa8,
        ];
        let root = deserialize_single_root(&bytes).unwrap();
        assert_eq!(root.bit_len(), 4);
        assert_eq!(root.data(), &[0xa0]);
    }

    #[test]
    fn test_crc_trailer() {
        let mut bytes = DIVMODC_BOC.to_vec();
        bytes[4] |= 0x40;
        let crc = crc32c::crc32c(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        assert!(deserialize_single_root(&bytes).is_ok());

        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            deserialize_single_root(&bytes),
            Err(BocError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_rejections() {
        let mut bad_magic = DIVMODC_BOC;
        bad_magic[0] = 0x68;
        assert!(matches!(
            deserialize_boc(&bad_magic),
            Err(BocError::BadMagic(_))
        ));

        assert_eq!(
            deserialize_boc(&DIVMODC_BOC[..14]),
            Err(BocError::UnexpectedEof(13))
        );

        let mut trailing = DIVMODC_BOC.to_vec();
        trailing.push(0);
        assert_eq!(deserialize_boc(&trailing), Err(BocError::TrailingBytes(1)));

        let mut exotic = DIVMODC_BOC;
        exotic[11] = 0x08;
        assert_eq!(deserialize_boc(&exotic), Err(BocError::ExoticCell(0)));

        let self_ref = [
            0xb5, 0xee, 0x9c, 0x72, 0x01, 0x01, 0x01, 0x01, 0x00, 0x03, 0x00, 0x01, 0x00, 0x00,
        ];
        assert_eq!(
            deserialize_boc(&self_ref),
            Err(BocError::BackwardReference {
                index: 0,
                target: 0
            })
        );
    }

    #[test]
    fn test_zero_roots() {
        let bytes = [
            0xb5, 0xee, 0x9c, 0x72, 0x01, 0x01, 0x01, 0x00, 0x00, 0x02, 0x00, 0x00,
        ];
        assert_eq!(deserialize_boc(&bytes), Ok(vec![]));
        assert_eq!(deserialize_single_root(&bytes), Err(BocError::RootCount(0)));
    }
}
