//! Instruction Representation
//!
//! A decoded instruction: one variant per opcode, carrying its operands.
//! This layer contains no execution semantics.

use std::fmt;

use super::opcode::OpCode;
use crate::vm::{Addr, Reg, Word};

/// Decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Load { reg: Reg, addr: Addr },
    Store { reg: Reg, addr: Addr },
    Mov { dst: Reg, src: Reg },
    Push { reg: Reg },
    Pop { reg: Reg },

    Add { dst: Reg, src: Reg },
    Sub { dst: Reg, src: Reg },
    Mul { dst: Reg, src: Reg },
    Div { dst: Reg, src: Reg },
    Inc { reg: Reg },
    Dec { reg: Reg },

    Jmp { target: Addr },
    Jz { target: Addr },
    Jnz { target: Addr },
    Call { target: Addr },
    Ret,

    Cmp { lhs: Reg, rhs: Reg },
    And { dst: Reg, src: Reg },
    Or { dst: Reg, src: Reg },
    Xor { dst: Reg, src: Reg },
    Not { reg: Reg },

    Int { code: Word },
    Hlt,
    Nop,

    In { reg: Reg, port: Word },
    Out { port: Word, reg: Reg },
}

impl Instruction {
    pub fn opcode(&self) -> OpCode {
        match self {
            Instruction::Load { .. } => OpCode::Load,
            Instruction::Store { .. } => OpCode::Store,
            Instruction::Mov { .. } => OpCode::Mov,
            Instruction::Push { .. } => OpCode::Push,
            Instruction::Pop { .. } => OpCode::Pop,
            Instruction::Add { .. } => OpCode::Add,
            Instruction::Sub { .. } => OpCode::Sub,
            Instruction::Mul { .. } => OpCode::Mul,
            Instruction::Div { .. } => OpCode::Div,
            Instruction::Inc { .. } => OpCode::Inc,
            Instruction::Dec { .. } => OpCode::Dec,
            Instruction::Jmp { .. } => OpCode::Jmp,
            Instruction::Jz { .. } => OpCode::Jz,
            Instruction::Jnz { .. } => OpCode::Jnz,
            Instruction::Call { .. } => OpCode::Call,
            Instruction::Ret => OpCode::Ret,
            Instruction::Cmp { .. } => OpCode::Cmp,
            Instruction::And { .. } => OpCode::And,
            Instruction::Or { .. } => OpCode::Or,
            Instruction::Xor { .. } => OpCode::Xor,
            Instruction::Not { .. } => OpCode::Not,
            Instruction::Int { .. } => OpCode::Int,
            Instruction::Hlt => OpCode::Hlt,
            Instruction::Nop => OpCode::Nop,
            Instruction::In { .. } => OpCode::In,
            Instruction::Out { .. } => OpCode::Out,
        }
    }

    /// Operand cells in fetch order
    pub fn operands(&self) -> Vec<Word> {
        match *self {
            Instruction::Load { reg, addr } | Instruction::Store { reg, addr } => {
                vec![reg.into(), addr.into()]
            }
            Instruction::Mov { dst, src }
            | Instruction::Add { dst, src }
            | Instruction::Sub { dst, src }
            | Instruction::Mul { dst, src }
            | Instruction::Div { dst, src }
            | Instruction::And { dst, src }
            | Instruction::Or { dst, src }
            | Instruction::Xor { dst, src } => vec![dst.into(), src.into()],
            Instruction::Cmp { lhs, rhs } => vec![lhs.into(), rhs.into()],
            Instruction::Push { reg }
            | Instruction::Pop { reg }
            | Instruction::Inc { reg }
            | Instruction::Dec { reg }
            | Instruction::Not { reg } => vec![reg.into()],
            Instruction::Jmp { target }
            | Instruction::Jz { target }
            | Instruction::Jnz { target }
            | Instruction::Call { target } => vec![target.into()],
            Instruction::Int { code } => vec![code],
            Instruction::In { reg, port } => vec![reg.into(), port],
            Instruction::Out { port, reg } => vec![port, reg.into()],
            Instruction::Ret | Instruction::Hlt | Instruction::Nop => Vec::new(),
        }
    }

    /// Opcode cell followed by operand cells
    pub fn encode(&self) -> Vec<Word> {
        let mut cells = Vec::with_capacity(1 + self.opcode().arity());
        cells.push(self.opcode().into());
        cells.extend(self.operands());
        cells
    }
}

/// Encode a sequence of instructions into contiguous cells.
pub fn encode_program(instructions: &[Instruction]) -> Vec<Word> {
    instructions.iter().flat_map(Instruction::encode).collect()
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode())?;
        let operands = self.operands();
        for (i, operand) in operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, operand)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_length_matches_arity() {
        let samples = [
            Instruction::Load { reg: Reg::R0, addr: Addr::new(10) },
            Instruction::Inc { reg: Reg::R3 },
            Instruction::Ret,
            Instruction::Out { port: 7, reg: Reg::R2 },
        ];
        for instr in samples {
            assert_eq!(instr.encode().len(), 1 + instr.opcode().arity());
        }
    }

    #[test]
    fn out_encodes_port_before_register() {
        let cells = Instruction::Out { port: 9, reg: Reg::R4 }.encode();
        assert_eq!(cells, vec![OpCode::Out as Word, 9, 4]);
    }

    #[test]
    fn display_lists_operands() {
        let instr = Instruction::Add { dst: Reg::R5, src: Reg::R0 };
        assert_eq!(instr.to_string(), "ADD 5, 0");
        assert_eq!(Instruction::Hlt.to_string(), "HLT");
    }
}
