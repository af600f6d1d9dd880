//! The explicit, bounded call stack.
//!
//! One frame per active scripted call. Frames carry everything needed to
//! resume the caller: its function index, its resume statement, and where
//! in the arena the callee's saved locals live. The depth bound turns
//! unbounded recursion into a clean fault instead of a host stack overflow.

use progvm_foundation::{ExecResult, FaultKind, VmFault};

/// One suspended caller.
#[derive(Copy, Clone, Debug)]
pub struct StackFrame {
    /// Function-table index of the caller.
    pub function: usize,
    /// Statement index the caller resumes at.
    pub statement: i32,
    /// First global slot of the callee's parameter/local region.
    pub locals_slot: usize,
    /// Arena start of the saved copy of that region.
    pub locals_start: usize,
    /// Length of the saved region in slots.
    pub locals_len: usize,
    /// Arena mark taken at function entry.
    pub arena_mark: usize,
}

/// The call stack, bounded by a configured maximum depth.
#[derive(Clone, Debug)]
pub struct CallStack {
    frames: Vec<StackFrame>,
    max_depth: usize,
}

impl CallStack {
    /// Creates an empty stack with the given depth bound.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::with_capacity(max_depth),
            max_depth,
        }
    }

    /// Current depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns true at depth 0.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Pushes a frame.
    ///
    /// # Errors
    /// Faults with `StackOverflow` at the depth bound.
    pub fn push(&mut self, frame: StackFrame) -> ExecResult<()> {
        if self.frames.len() >= self.max_depth {
            return Err(VmFault::new(FaultKind::StackOverflow));
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Pops the innermost frame.
    ///
    /// # Errors
    /// Faults with `StackUnderflow` at depth 0.
    pub fn pop(&mut self) -> ExecResult<StackFrame> {
        self.frames
            .pop()
            .ok_or_else(|| VmFault::new(FaultKind::StackUnderflow))
    }

    /// Drops every frame; used when a fault unwinds to depth 0.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Frames from innermost to outermost, for stack traces.
    pub fn frames_innermost_first(&self) -> impl Iterator<Item = &StackFrame> {
        self.frames.iter().rev()
    }
}
