//! CellVM Error Types
//!
//! Defines the fault conditions produced by the interpreter and the loader.
//! Every fault is terminal for the current run and carries enough context
//! to explain where decoding stopped.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::vm::Word;

/// Errors raised by a port provider while serving IN/OUT/INT.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// No more input is available for the requested port.
    #[error("input exhausted on port {port}")]
    InputExhausted { port: Word },
    /// The provider received input it could not parse as an integer.
    #[error("invalid input on port {port}: {input:?}")]
    InvalidInput { port: Word, input: String },
    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(String),
}

impl From<io::Error> for PortError {
    fn from(err: io::Error) -> Self {
        PortError::Io(err.to_string())
    }
}

/// The reason a fetch or execute step failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaultKind {
    /// Instruction pointer, address operand or return address outside memory.
    #[error("address {address} out of bounds")]
    OutOfBounds { address: i64 },
    /// Register operand outside `[0, 8)`.
    #[error("invalid register r{index}")]
    InvalidRegister { index: Word },
    /// Opcode cell matches no instruction.
    #[error("invalid opcode {value}")]
    InvalidOpcode { value: Word },
    /// Push beyond the configured maximum stack depth.
    #[error("stack overflow (limit {limit})")]
    StackOverflow { limit: usize },
    /// Port provider failure.
    #[error("port failure: {0}")]
    Port(#[from] PortError),
}

/// A fault together with the decode context it was raised in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    /// Address of the faulting instruction's opcode cell.
    pub ip: usize,
    /// Raw opcode cell, if it was fetched before the fault.
    pub opcode: Option<Word>,
    /// Operand cells decoded before the fault.
    pub operands: Vec<Word>,
}

impl Fault {
    pub fn new(kind: FaultKind, ip: usize) -> Self {
        Fault {
            kind,
            ip,
            opcode: None,
            operands: Vec::new(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at ip {}", self.kind, self.ip)?;
        if let Some(op) = self.opcode {
            write!(f, " (opcode {}", op)?;
            if !self.operands.is_empty() {
                write!(f, ", operands {:?}", self.operands)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Errors produced while reading a program image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("image is too short")]
    TooShort,
    #[error("invalid image magic number 0x{0:08X}")]
    InvalidMagic(u32),
    #[error("unsupported image version {0}")]
    UnsupportedVersion(u8),
    #[error("line {line}: invalid token {token:?}")]
    InvalidToken { line: usize, token: String },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("{field} {value} does not fit in a 32-bit image field")]
    FieldOverflow { field: &'static str, value: usize },
}

/// Invalid machine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("memory size must be at least one cell")]
    EmptyMemory,
    #[error("memory size {0} exceeds the addressable range")]
    MemoryTooLarge(usize),
}

pub type VmResult<T> = Result<T, Fault>;
