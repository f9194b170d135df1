use crate::{RuntimeError, StackKind, Value};

/// The value stack shared by every frame of one runtime.
///
/// Holds evaluation temporaries and call arguments, and is the main root
/// set of the collector.
#[derive(Debug, Clone)]
pub struct ExecutionState {
    stack: Vec<Value>,
    limit: usize,
}

#[derive(Debug, Clone)]
pub struct ExecutionStateInfo {
    /// Maximum number of values. Exceeding it is fatal.
    pub stack_size: usize,
}

impl Default for ExecutionStateInfo {
    fn default() -> Self {
        Self { stack_size: 1024 }
    }
}

impl ExecutionState {
    #[must_use]
    pub fn new(info: &ExecutionStateInfo) -> Self {
        Self {
            stack: Vec::with_capacity(info.stack_size),
            limit: info.stack_size,
        }
    }

    /// Returns the active portion of the stack, bottom first.
    #[must_use]
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.limit {
            return Err(RuntimeError::StackOverflow(StackKind::Values));
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    pub fn peek(&self) -> Option<Value> {
        self.stack.last().copied()
    }

    /// Removes the top `n` values and returns them bottom first.
    pub fn stack_pop_slice(
        &mut self,
        n: usize,
    ) -> Result<Vec<Value>, RuntimeError> {
        let start = self
            .stack
            .len()
            .checked_sub(n)
            .ok_or(RuntimeError::StackUnderflow)?;
        Ok(self.stack.split_off(start))
    }

    /// Drop everything above `depth`.
    pub fn truncate(&mut self, depth: usize) {
        self.stack.truncate(depth);
    }
}
