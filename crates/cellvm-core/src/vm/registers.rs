//! Register File
//!
//! Eight general-purpose registers. Register 0 also receives CMP results.

use crate::error::FaultKind;
use super::Word;

/// Number of registers
pub const REGISTER_COUNT: usize = 8;

/// Validated register index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg(u8);

impl Reg {
    pub const R0: Reg = Reg(0);
    pub const R1: Reg = Reg(1);
    pub const R2: Reg = Reg(2);
    pub const R3: Reg = Reg(3);
    pub const R4: Reg = Reg(4);
    pub const R5: Reg = Reg(5);
    pub const R6: Reg = Reg(6);
    pub const R7: Reg = Reg(7);

    /// Validate a raw operand as a register index
    pub fn new(raw: Word) -> Result<Self, FaultKind> {
        match u8::try_from(raw) {
            Ok(index) if (index as usize) < REGISTER_COUNT => Ok(Reg(index)),
            _ => Err(FaultKind::InvalidRegister { index: raw }),
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<Reg> for Word {
    fn from(reg: Reg) -> Self {
        reg.0 as Word
    }
}

/// Register file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers {
    regs: [Word; REGISTER_COUNT],
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reg: Reg) -> Word {
        self.regs[reg.index()]
    }

    pub fn set(&mut self, reg: Reg, value: Word) {
        self.regs[reg.index()] = value;
    }

    /// Comparison result register
    pub fn flags(&self) -> Word {
        self.regs[0]
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.regs
    }
}
