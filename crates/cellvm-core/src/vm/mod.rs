pub mod io;
pub mod memory;
pub mod registers;
pub mod stack;
pub mod vm;

/// Machine word: every memory cell, register and stack entry
pub type Word = i32;

pub use io::{Event, Ports, ScriptedPorts};
pub use memory::{Addr, Memory};
pub use registers::{Reg, Registers, REGISTER_COUNT};
pub use stack::Stack;
pub use vm::{RunOutcome, VirtualMachine};
