pub mod instruction;
pub mod opcode;

pub use instruction::{encode_program, Instruction};
pub use opcode::OpCode;
