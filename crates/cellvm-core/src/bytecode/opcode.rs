//! Opcode Definitions
//!
//! Defines the raw opcode set for CellVM programs.
//! This file contains no execution semantics.
//! Opcode values are part of the program format and must not change.

use std::fmt;

use crate::vm::Word;

/// Opcodes, numbered in declaration order.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // Data management
    Load  = 0,
    Store = 1,
    Mov   = 2,
    Push  = 3,
    Pop   = 4,

    // Arithmetic
    Add = 5,
    Sub = 6,
    Mul = 7,
    Div = 8,
    Inc = 9,
    Dec = 10,

    // Control flow
    Jmp  = 11,
    Jz   = 12,
    Jnz  = 13,
    Call = 14,
    Ret  = 15,

    // Logical
    Cmp = 16,
    And = 17,
    Or  = 18,
    Xor = 19,
    Not = 20,

    // System
    Int = 21,
    Hlt = 22,
    Nop = 23,

    // I/O
    In  = 24,
    Out = 25,
}

impl OpCode {
    pub const ALL: [OpCode; 26] = [
        OpCode::Load, OpCode::Store, OpCode::Mov, OpCode::Push, OpCode::Pop,
        OpCode::Add, OpCode::Sub, OpCode::Mul, OpCode::Div, OpCode::Inc, OpCode::Dec,
        OpCode::Jmp, OpCode::Jz, OpCode::Jnz, OpCode::Call, OpCode::Ret,
        OpCode::Cmp, OpCode::And, OpCode::Or, OpCode::Xor, OpCode::Not,
        OpCode::Int, OpCode::Hlt, OpCode::Nop,
        OpCode::In, OpCode::Out,
    ];

    /// Convert a memory cell to an opcode
    pub fn from_word(word: Word) -> Option<Self> {
        match word {
            0 => Some(OpCode::Load),
            1 => Some(OpCode::Store),
            2 => Some(OpCode::Mov),
            3 => Some(OpCode::Push),
            4 => Some(OpCode::Pop),

            5 => Some(OpCode::Add),
            6 => Some(OpCode::Sub),
            7 => Some(OpCode::Mul),
            8 => Some(OpCode::Div),
            9 => Some(OpCode::Inc),
            10 => Some(OpCode::Dec),

            11 => Some(OpCode::Jmp),
            12 => Some(OpCode::Jz),
            13 => Some(OpCode::Jnz),
            14 => Some(OpCode::Call),
            15 => Some(OpCode::Ret),

            16 => Some(OpCode::Cmp),
            17 => Some(OpCode::And),
            18 => Some(OpCode::Or),
            19 => Some(OpCode::Xor),
            20 => Some(OpCode::Not),

            21 => Some(OpCode::Int),
            22 => Some(OpCode::Hlt),
            23 => Some(OpCode::Nop),

            24 => Some(OpCode::In),
            25 => Some(OpCode::Out),

            _ => None,
        }
    }

    /// Number of operand cells following the opcode cell
    pub fn arity(self) -> usize {
        match self {
            OpCode::Ret | OpCode::Hlt | OpCode::Nop => 0,

            OpCode::Push
            | OpCode::Pop
            | OpCode::Inc
            | OpCode::Dec
            | OpCode::Jmp
            | OpCode::Jz
            | OpCode::Jnz
            | OpCode::Call
            | OpCode::Not
            | OpCode::Int => 1,

            OpCode::Load
            | OpCode::Store
            | OpCode::Mov
            | OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Cmp
            | OpCode::And
            | OpCode::Or
            | OpCode::Xor
            | OpCode::In
            | OpCode::Out => 2,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Load => "LOAD",
            OpCode::Store => "STORE",
            OpCode::Mov => "MOV",
            OpCode::Push => "PUSH",
            OpCode::Pop => "POP",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Inc => "INC",
            OpCode::Dec => "DEC",
            OpCode::Jmp => "JMP",
            OpCode::Jz => "JZ",
            OpCode::Jnz => "JNZ",
            OpCode::Call => "CALL",
            OpCode::Ret => "RET",
            OpCode::Cmp => "CMP",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Xor => "XOR",
            OpCode::Not => "NOT",
            OpCode::Int => "INT",
            OpCode::Hlt => "HLT",
            OpCode::Nop => "NOP",
            OpCode::In => "IN",
            OpCode::Out => "OUT",
        }
    }
}

impl From<OpCode> for Word {
    fn from(op: OpCode) -> Self {
        op as Word
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_opcode_maps_back_to_itself() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::from_word(op as Word), Some(op));
        }
    }

    #[test]
    fn unknown_values_are_rejected() {
        assert_eq!(OpCode::from_word(-1), None);
        assert_eq!(OpCode::from_word(26), None);
        assert_eq!(OpCode::from_word(Word::MAX), None);
    }

    #[test]
    fn arity_matches_operand_layout() {
        assert_eq!(OpCode::Hlt.arity(), 0);
        assert_eq!(OpCode::Ret.arity(), 0);
        assert_eq!(OpCode::Int.arity(), 1);
        assert_eq!(OpCode::Call.arity(), 1);
        assert_eq!(OpCode::Out.arity(), 2);
        assert_eq!(OpCode::Load.arity(), 2);
    }
}
