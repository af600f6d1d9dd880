//! The scoped bump arena for saved locals.
//!
//! Function entry saves the callee's parameter/local region here so that
//! recursion works over a single shared global array; function exit copies
//! the save back and rewinds to the entry mark. Allocation is a pointer
//! bump, deallocation is a pointer move, and a top-level fault rewinds the
//! whole arena at once.

use progvm_foundation::{EvalSlot, ExecResult, FaultKind, VmFault};

/// Fixed-capacity bump arena of evaluation slots.
#[derive(Clone, Debug)]
pub struct LocalArena {
    slots: Vec<EvalSlot>,
    top: usize,
}

impl LocalArena {
    /// Creates an arena with a fixed slot capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![EvalSlot::ZERO; capacity],
            top: 0,
        }
    }

    /// The current high-water mark, for a later [`rewind`](Self::rewind).
    #[must_use]
    pub fn mark(&self) -> usize {
        self.top
    }

    /// Slots currently in use.
    #[must_use]
    pub fn used(&self) -> usize {
        self.top
    }

    /// Total slot capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Bumps out a run of `len` slots and returns its start.
    ///
    /// # Errors
    /// Faults with `LocalArenaOverflow` when capacity is exhausted.
    pub fn alloc(&mut self, len: usize) -> ExecResult<usize> {
        if self.top + len > self.slots.len() {
            return Err(VmFault::new(FaultKind::LocalArenaOverflow));
        }
        let start = self.top;
        self.top += len;
        Ok(start)
    }

    /// Borrows an allocated run.
    #[must_use]
    pub fn slice(&self, start: usize, len: usize) -> &[EvalSlot] {
        &self.slots[start..start + len]
    }

    /// Mutably borrows an allocated run.
    pub fn slice_mut(&mut self, start: usize, len: usize) -> &mut [EvalSlot] {
        &mut self.slots[start..start + len]
    }

    /// Releases everything allocated since `mark`.
    ///
    /// # Panics
    /// Panics if `mark` is above the current top; marks only move down.
    pub fn rewind(&mut self, mark: usize) {
        assert!(mark <= self.top, "arena mark above top");
        self.top = mark;
    }
}
