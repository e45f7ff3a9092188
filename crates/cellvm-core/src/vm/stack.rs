//! VM Stack Implementation
//!
//! Shared LIFO store for PUSH/POP data and CALL/RET return addresses.
//! No execution semantics.

use crate::error::FaultKind;
use super::Word;

/// Operand and call stack
#[derive(Debug, Clone, Default)]
pub struct Stack {
    values: Vec<Word>,
    max_depth: Option<usize>,
}

impl Stack {
    /// Create a stack, optionally bounded to `max_depth` entries
    pub fn new(max_depth: Option<usize>) -> Self {
        Stack {
            values: Vec::new(),
            max_depth,
        }
    }

    /// Push value onto stack
    pub fn push(&mut self, value: Word) -> Result<(), FaultKind> {
        if let Some(limit) = self.max_depth {
            if self.values.len() >= limit {
                return Err(FaultKind::StackOverflow { limit });
            }
        }
        self.values.push(value);
        Ok(())
    }

    /// Pop value from stack; `None` when empty
    pub fn pop(&mut self) -> Option<Word> {
        self.values.pop()
    }

    /// Peek at top of stack without removing
    pub fn peek(&self) -> Option<Word> {
        self.values.last().copied()
    }

    /// Get current stack depth
    pub fn depth(&self) -> usize {
        self.values.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries from bottom to top
    pub fn as_slice(&self) -> &[Word] {
        &self.values
    }
}
