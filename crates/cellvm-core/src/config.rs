//! CellVM Configuration
//!
//! Defines sizing and runtime limits for a machine instance.
//! Configuration specifies constraints only; enforcement is handled by the machine.

use crate::error::ConfigError;

/// Default memory capacity in cells (64 Ki).
pub const DEFAULT_MEMORY_SIZE: usize = 65_536;

/// Machine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Number of memory cells
    pub memory_size: usize,

    /// Maximum number of instructions retired by one `run` call.
    /// `None` runs until HLT or a fault.
    pub step_limit: Option<u64>,

    /// Maximum stack depth. `None` leaves the stack unbounded.
    pub max_stack_depth: Option<usize>,

    /// Treat unknown opcodes as NOP instead of faulting.
    pub permissive_opcodes: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            memory_size: DEFAULT_MEMORY_SIZE,
            step_limit: None,
            max_stack_depth: None,
            permissive_opcodes: false,
        }
    }
}

impl VmConfig {
    /// Create a new configuration with default limits
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory_size(mut self, cells: usize) -> Self {
        self.memory_size = cells;
        self
    }

    pub fn with_step_limit(mut self, steps: u64) -> Self {
        self.step_limit = Some(steps);
        self
    }

    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = Some(depth);
        self
    }

    pub fn permissive(mut self) -> Self {
        self.permissive_opcodes = true;
        self
    }

    /// Check that the memory size is usable. Return addresses are stored
    /// on the stack as words, so every address must fit in an `i32`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_size == 0 {
            return Err(ConfigError::EmptyMemory);
        }
        if self.memory_size > i32::MAX as usize {
            return Err(ConfigError::MemoryTooLarge(self.memory_size));
        }
        Ok(())
    }
}
