//! CellVM - Core Library
//!
//! A small register machine: flat cell memory, eight registers, a shared
//! data/call stack and a fixed 26-opcode instruction set. Hosts supply I/O
//! through the [`Ports`] trait and drive execution with
//! [`VirtualMachine::step`] or [`VirtualMachine::run`].

pub mod bytecode;
pub mod config;
pub mod error;
pub mod loader;
pub mod vm;

// Re-export commonly used types
pub use bytecode::{encode_program, Instruction, OpCode};
pub use config::VmConfig;
pub use error::{ConfigError, Fault, FaultKind, LoadError, PortError, VmResult};
pub use loader::{ImageLoader, ProgramImage};
pub use vm::{Addr, Event, Ports, Reg, RunOutcome, ScriptedPorts, VirtualMachine, Word};
