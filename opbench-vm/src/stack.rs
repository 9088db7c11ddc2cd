//! Operand Stack
//!
//! Indices passed to [`Stack`] methods count from the top: `s0` is the most
//! recently pushed entry.

use crate::cell::{Cell, CellBuilder, CellSlice};
use crate::exception::VmException;
use std::sync::Arc;

/// One stack value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEntry {
    /// 257-bit signed integer, narrowed to `i128`
    Int(i128),
    /// Finished cell
    Cell(Arc<Cell>),
    /// Cell under construction
    Builder(CellBuilder),
    /// Read cursor over a cell
    Slice(CellSlice),
}

/// LIFO operand stack
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    entries: Vec<StackEntry>,
}

impl Stack {
    /// Empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Integer entries bottom first, `None` if any entry is not an integer
    #[cfg(test)]
    pub fn as_ints(&self) -> Option<Vec<i128>> {
        self.entries
            .iter()
            .map(|e| match e {
                StackEntry::Int(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    #[inline]
    fn check_depth(&self, required: usize) -> Result<(), VmException> {
        if self.entries.len() < required {
            Err(VmException::StackUnderflow)
        } else {
            Ok(())
        }
    }

    #[inline]
    fn slot(&self, i: usize) -> usize {
        self.entries.len() - 1 - i
    }

    /// Push `entry` on top
    #[inline]
    pub fn push(&mut self, entry: StackEntry) {
        self.entries.push(entry);
    }

    /// Push an integer on top
    #[inline]
    pub fn push_int(&mut self, value: i128) {
        self.entries.push(StackEntry::Int(value));
    }

    /// Push -1 for true and 0 for false
    #[inline]
    pub fn push_bool(&mut self, value: bool) {
        self.push_int(if value { -1 } else { 0 });
    }

    /// Remove and return the top entry
    #[inline]
    pub fn pop(&mut self) -> Result<StackEntry, VmException> {
        self.entries.pop().ok_or(VmException::StackUnderflow)
    }

    /// Pop an integer; a non-integer top is a type check failure
    pub fn pop_int(&mut self) -> Result<i128, VmException> {
        match self.pop()? {
            StackEntry::Int(v) => Ok(v),
            _ => Err(VmException::TypeCheck),
        }
    }

    /// Pop a cell
    pub fn pop_cell(&mut self) -> Result<Arc<Cell>, VmException> {
        match self.pop()? {
            StackEntry::Cell(c) => Ok(c),
            _ => Err(VmException::TypeCheck),
        }
    }

    /// Pop a builder
    pub fn pop_builder(&mut self) -> Result<CellBuilder, VmException> {
        match self.pop()? {
            StackEntry::Builder(b) => Ok(b),
            _ => Err(VmException::TypeCheck),
        }
    }

    /// Pop a slice
    pub fn pop_slice(&mut self) -> Result<CellSlice, VmException> {
        match self.pop()? {
            StackEntry::Slice(s) => Ok(s),
            _ => Err(VmException::TypeCheck),
        }
    }

    /// Push a copy of `s(i)`
    pub fn push_copy(&mut self, i: usize) -> Result<(), VmException> {
        self.check_depth(i + 1)?;
        let entry = self.entries[self.slot(i)].clone();
        self.entries.push(entry);
        Ok(())
    }

    /// Move `s0` into `s(i)`, dropping the old `s(i)`
    pub fn pop_into(&mut self, i: usize) -> Result<(), VmException> {
        self.check_depth(i + 1)?;
        let top = self.slot(0);
        let target = self.slot(i);
        self.entries.swap(top, target);
        self.entries.pop();
        Ok(())
    }

    /// Exchange `s(i)` and `s(j)`
    pub fn exchange(&mut self, i: usize, j: usize) -> Result<(), VmException> {
        self.check_depth(i.max(j) + 1)?;
        let (a, b) = (self.slot(i), self.slot(j));
        self.entries.swap(a, b);
        Ok(())
    }
}

impl FromIterator<StackEntry> for Stack {
    fn from_iter<T: IntoIterator<Item = StackEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
