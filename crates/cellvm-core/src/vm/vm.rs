//! Virtual Machine Core
//!
//! Defines the CellVM machine state and its fetch-decode-execute cycle.
//! The machine is steppable: `step` retires one instruction, `run` loops
//! until HLT, a fault, or the configured step budget.

use crate::bytecode::instruction::Instruction;
use crate::bytecode::opcode::OpCode;
use crate::config::VmConfig;
use crate::error::{ConfigError, Fault, FaultKind, VmResult};

use super::io::{Event, Ports};
use super::memory::{Addr, Memory};
use super::registers::{Reg, Registers};
use super::stack::Stack;
use super::Word;

/// Why `run` returned without a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// HLT executed; the machine is retired.
    Halted,
    /// The step budget ran out; the machine is still running and `run` may be called again.
    StepLimitReached,
}

/// CellVM machine
#[derive(Debug, Clone)]
pub struct VirtualMachine {
    config: VmConfig,
    memory: Memory,
    registers: Registers,
    stack: Stack,

    ip: usize,
    running: bool,

    steps: u64,
    fault: Option<Fault>,
}

impl Default for VirtualMachine {
    fn default() -> Self {
        Self::build(VmConfig::default())
    }
}

impl VirtualMachine {
    /// Create a zeroed machine with `ip = 0`, ready to run
    pub fn new(config: VmConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: VmConfig) -> Self {
        VirtualMachine {
            memory: Memory::new(config.memory_size),
            registers: Registers::new(),
            stack: Stack::new(config.max_stack_depth),
            ip: 0,
            running: true,
            steps: 0,
            fault: None,
            config,
        }
    }

    /// Copy `cells` into memory starting at `base`
    pub fn load(&mut self, base: usize, cells: &[Word]) -> Result<(), FaultKind> {
        self.memory.load(base, cells)
    }

    /// Move the instruction pointer, e.g. to a program's entry point
    pub fn set_ip(&mut self, ip: usize) -> Result<(), FaultKind> {
        if ip >= self.memory.capacity() {
            return Err(FaultKind::OutOfBounds { address: ip as i64 });
        }
        self.ip = ip;
        Ok(())
    }

    /// Run until HLT, a fault, or the step budget
    pub fn run<P: Ports + ?Sized>(&mut self, ports: &mut P) -> VmResult<RunOutcome> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }

        let mut budget = self.config.step_limit;
        while self.running {
            if let Some(remaining) = budget.as_mut() {
                if *remaining == 0 {
                    return Ok(RunOutcome::StepLimitReached);
                }
                *remaining -= 1;
            }
            self.step(ports)?;
        }
        Ok(RunOutcome::Halted)
    }

    /// Retire a single instruction. Does nothing once the machine has halted;
    /// after a fault, returns the stored fault again.
    pub fn step<P: Ports + ?Sized>(&mut self, ports: &mut P) -> VmResult<()> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        if !self.running {
            return Ok(());
        }

        let start = self.ip;
        let mut opcode = None;
        let mut operands = Vec::new();

        match self.cycle(ports, &mut opcode, &mut operands) {
            Ok(()) => {
                self.steps += 1;
                Ok(())
            }
            Err(kind) => {
                let fault = Fault {
                    kind,
                    ip: start,
                    opcode,
                    operands,
                };
                self.running = false;
                self.fault = Some(fault.clone());
                Err(fault)
            }
        }
    }

    fn cycle<P: Ports + ?Sized>(
        &mut self,
        ports: &mut P,
        opcode: &mut Option<Word>,
        operands: &mut Vec<Word>,
    ) -> Result<(), FaultKind> {
        let word = self.fetch()?;
        *opcode = Some(word);
        match self.decode_into(word, operands)? {
            Some(instr) => self.execute(instr, ports),
            // unknown opcode under permissive decoding
            None => Ok(()),
        }
    }

    /// Read the cell at `ip` and advance `ip` by one
    pub fn fetch(&mut self) -> Result<Word, FaultKind> {
        if self.ip >= self.memory.capacity() {
            return Err(FaultKind::OutOfBounds { address: self.ip as i64 });
        }
        let word = self.memory.read(Addr::new(self.ip))?;
        self.ip += 1;
        Ok(word)
    }

    /// Fetch and validate the operands of `opcode`.
    ///
    /// Returns `Ok(None)` for an unknown opcode when permissive opcodes are enabled.
    pub fn decode(&mut self, opcode: Word) -> Result<Option<Instruction>, FaultKind> {
        self.decode_into(opcode, &mut Vec::new())
    }

    fn decode_into(
        &mut self,
        word: Word,
        operands: &mut Vec<Word>,
    ) -> Result<Option<Instruction>, FaultKind> {
        let opcode = match OpCode::from_word(word) {
            Some(op) => op,
            None if self.config.permissive_opcodes => return Ok(None),
            None => return Err(FaultKind::InvalidOpcode { value: word }),
        };

        let mut cursor = OperandCursor { vm: self, operands };

        let instr = match opcode {
            OpCode::Load => Instruction::Load { reg: cursor.reg()?, addr: cursor.addr()? },
            OpCode::Store => Instruction::Store { reg: cursor.reg()?, addr: cursor.addr()? },
            OpCode::Mov => Instruction::Mov { dst: cursor.reg()?, src: cursor.reg()? },
            OpCode::Push => Instruction::Push { reg: cursor.reg()? },
            OpCode::Pop => Instruction::Pop { reg: cursor.reg()? },

            OpCode::Add => Instruction::Add { dst: cursor.reg()?, src: cursor.reg()? },
            OpCode::Sub => Instruction::Sub { dst: cursor.reg()?, src: cursor.reg()? },
            OpCode::Mul => Instruction::Mul { dst: cursor.reg()?, src: cursor.reg()? },
            OpCode::Div => Instruction::Div { dst: cursor.reg()?, src: cursor.reg()? },
            OpCode::Inc => Instruction::Inc { reg: cursor.reg()? },
            OpCode::Dec => Instruction::Dec { reg: cursor.reg()? },

            OpCode::Jmp => Instruction::Jmp { target: cursor.addr()? },
            OpCode::Jz => Instruction::Jz { target: cursor.addr()? },
            OpCode::Jnz => Instruction::Jnz { target: cursor.addr()? },
            OpCode::Call => Instruction::Call { target: cursor.addr()? },
            OpCode::Ret => Instruction::Ret,

            OpCode::Cmp => Instruction::Cmp { lhs: cursor.reg()?, rhs: cursor.reg()? },
            OpCode::And => Instruction::And { dst: cursor.reg()?, src: cursor.reg()? },
            OpCode::Or => Instruction::Or { dst: cursor.reg()?, src: cursor.reg()? },
            OpCode::Xor => Instruction::Xor { dst: cursor.reg()?, src: cursor.reg()? },
            OpCode::Not => Instruction::Not { reg: cursor.reg()? },

            OpCode::Int => Instruction::Int { code: cursor.raw()? },
            OpCode::Hlt => Instruction::Hlt,
            OpCode::Nop => Instruction::Nop,

            OpCode::In => Instruction::In { reg: cursor.reg()?, port: cursor.raw()? },
            OpCode::Out => Instruction::Out { port: cursor.raw()?, reg: cursor.reg()? },
        };

        Ok(Some(instr))
    }

    /// Apply the state transition of one decoded instruction.
    ///
    /// DIV by zero and POP/RET on an empty stack are no-ops, not faults.
    pub fn execute<P: Ports + ?Sized>(
        &mut self,
        instr: Instruction,
        ports: &mut P,
    ) -> Result<(), FaultKind> {
        match instr {
            Instruction::Load { reg, addr } => {
                let value = self.memory.read(addr)?;
                self.registers.set(reg, value);
            }
            Instruction::Store { reg, addr } => {
                self.memory.write(addr, self.registers.get(reg))?;
            }
            Instruction::Mov { dst, src } => {
                self.registers.set(dst, self.registers.get(src));
            }
            Instruction::Push { reg } => {
                self.stack.push(self.registers.get(reg))?;
            }
            Instruction::Pop { reg } => {
                if let Some(value) = self.stack.pop() {
                    self.registers.set(reg, value);
                }
            }

            Instruction::Add { dst, src } => self.combine(dst, src, Word::wrapping_add),
            Instruction::Sub { dst, src } => self.combine(dst, src, Word::wrapping_sub),
            Instruction::Mul { dst, src } => self.combine(dst, src, Word::wrapping_mul),
            Instruction::Div { dst, src } => {
                if self.registers.get(src) != 0 {
                    self.combine(dst, src, Word::wrapping_div);
                }
            }
            Instruction::Inc { reg } => {
                self.registers.set(reg, self.registers.get(reg).wrapping_add(1));
            }
            Instruction::Dec { reg } => {
                self.registers.set(reg, self.registers.get(reg).wrapping_sub(1));
            }

            Instruction::Jmp { target } => self.ip = target.index(),
            Instruction::Jz { target } => {
                if self.registers.flags() == 0 {
                    self.ip = target.index();
                }
            }
            Instruction::Jnz { target } => {
                if self.registers.flags() != 0 {
                    self.ip = target.index();
                }
            }
            Instruction::Call { target } => {
                let return_ip = Word::try_from(self.ip)
                    .map_err(|_| FaultKind::OutOfBounds { address: self.ip as i64 })?;
                self.stack.push(return_ip)?;
                self.ip = target.index();
            }
            Instruction::Ret => {
                if let Some(raw) = self.stack.pop() {
                    self.ip = self.memory.address(raw)?.index();
                }
            }

            Instruction::Cmp { lhs, rhs } => {
                let equal = self.registers.get(lhs) == self.registers.get(rhs);
                self.registers.set(Reg::R0, Word::from(equal));
            }
            Instruction::And { dst, src } => self.combine(dst, src, |a, b| a & b),
            Instruction::Or { dst, src } => self.combine(dst, src, |a, b| a | b),
            Instruction::Xor { dst, src } => self.combine(dst, src, |a, b| a ^ b),
            Instruction::Not { reg } => {
                self.registers.set(reg, !self.registers.get(reg));
            }

            Instruction::Int { code } => ports.emit(Event::Interrupt { code })?,
            Instruction::Hlt => self.running = false,
            Instruction::Nop => {}

            Instruction::In { reg, port } => {
                let value = ports.input(port)?;
                self.registers.set(reg, value);
            }
            Instruction::Out { port, reg } => {
                let value = self.registers.get(reg);
                ports.emit(Event::Output { port, value })?;
            }
        }
        Ok(())
    }

    /// `dst <- op(dst, src)`
    fn combine(&mut self, dst: Reg, src: Reg, op: impl Fn(Word, Word) -> Word) {
        let value = op(self.registers.get(dst), self.registers.get(src));
        self.registers.set(dst, value);
    }

    // Inspection

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn register(&self, reg: Reg) -> Word {
        self.registers.get(reg)
    }

    /// Write a register directly, e.g. to seed inputs from a host
    pub fn set_register(&mut self, reg: Reg, value: Word) {
        self.registers.set(reg, value);
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Writable memory for loaders. Must not be used mid-instruction.
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of instructions retired so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn last_fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }
}

/// Fetches operand cells for one instruction, recording each for fault reports.
struct OperandCursor<'a> {
    vm: &'a mut VirtualMachine,
    operands: &'a mut Vec<Word>,
}

impl OperandCursor<'_> {
    fn raw(&mut self) -> Result<Word, FaultKind> {
        let word = self.vm.fetch()?;
        self.operands.push(word);
        Ok(word)
    }

    fn reg(&mut self) -> Result<Reg, FaultKind> {
        let word = self.raw()?;
        Reg::new(word)
    }

    fn addr(&mut self) -> Result<Addr, FaultKind> {
        let word = self.raw()?;
        self.vm.memory.address(word)
    }
}
