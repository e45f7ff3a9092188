//! VM Memory Model
//!
//! Flat, fixed-capacity store of signed cells holding both code and data.
//! Every access is bounds-checked.

use crate::error::FaultKind;
use super::Word;

/// Memory address operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Addr(usize);

impl Addr {
    pub const fn new(index: usize) -> Self {
        Addr(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl From<Addr> for Word {
    fn from(addr: Addr) -> Self {
        addr.0 as Word
    }
}

/// Flat cell memory
#[derive(Debug, Clone)]
pub struct Memory {
    cells: Vec<Word>,
}

impl Memory {
    /// Zeroed memory of `size` cells
    pub fn new(size: usize) -> Self {
        Memory {
            cells: vec![0; size],
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Validate a raw operand as an address into this memory
    pub fn address(&self, raw: Word) -> Result<Addr, FaultKind> {
        match usize::try_from(raw) {
            Ok(index) if index < self.cells.len() => Ok(Addr(index)),
            _ => Err(FaultKind::OutOfBounds { address: raw as i64 }),
        }
    }

    pub fn read(&self, addr: Addr) -> Result<Word, FaultKind> {
        self.cells
            .get(addr.0)
            .copied()
            .ok_or(FaultKind::OutOfBounds { address: addr.0 as i64 })
    }

    pub fn write(&mut self, addr: Addr, value: Word) -> Result<(), FaultKind> {
        match self.cells.get_mut(addr.0) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(FaultKind::OutOfBounds { address: addr.0 as i64 }),
        }
    }

    /// Copy a block of cells starting at `base`
    pub fn load(&mut self, base: usize, block: &[Word]) -> Result<(), FaultKind> {
        let end = base
            .checked_add(block.len())
            .filter(|&end| end <= self.cells.len())
            .ok_or(FaultKind::OutOfBounds {
                address: base.saturating_add(block.len()) as i64,
            })?;
        self.cells[base..end].copy_from_slice(block);
        Ok(())
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.cells
    }
}
