//! Error types for the progvm system.
//!
//! Two taxonomies, per the engine's failure policy: [`LoadError`] is fatal
//! at image-load time and produces no VM instance; [`VmFault`] is fatal for
//! the current top-level `execute` invocation only, after which the call
//! stack is unwound to depth 0 and the host may keep running.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

/// Result alias for interpreter operations.
pub type ExecResult<T> = Result<T, VmFault>;

/// Fatal load-time error; no VM state is produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The image's format version does not match the host's.
    #[error("image version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// The version this host was compiled for.
        expected: u32,
        /// The version declared by the image.
        found: u32,
    },

    /// The image was compiled against a different well-known-globals layout.
    #[error("system globals schema mismatch: expected crc {expected:#06x}, found {found:#06x}")]
    SchemaMismatch {
        /// The schema signature this host was compiled for.
        expected: u16,
        /// The signature declared by the image.
        found: u16,
    },

    /// The byte blob ends before a header-declared table does.
    #[error("truncated image: {what}")]
    Truncated {
        /// Which region was cut short.
        what: &'static str,
    },

    /// A table entry is internally inconsistent (bad branch target, bad
    /// statement index, out-of-range definition offset).
    #[error("corrupt image: {detail}")]
    Corrupt {
        /// Description of the inconsistency.
        detail: String,
    },
}

/// A fatal fault raised during execution.
///
/// Faults abort the current top-level `execute` invocation: the interpreter
/// attaches a [`FaultContext`], unwinds its explicit call stack to depth 0,
/// rewinds the local arena, and propagates the fault to the native caller.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct VmFault {
    /// The kind of fault that occurred.
    pub kind: FaultKind,
    /// Diagnostic context captured at the faulting statement.
    pub context: Option<FaultContext>,
}

impl VmFault {
    /// Creates a fault with the given kind and no context.
    #[must_use]
    pub fn new(kind: FaultKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Attaches diagnostic context to this fault.
    #[must_use]
    pub fn with_context(mut self, context: FaultContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates an operand-range fault with a description of the bad access.
    #[must_use]
    pub fn operand_out_of_range(what: impl Into<String>) -> Self {
        Self::new(FaultKind::OperandOutOfRange { what: what.into() })
    }
}

/// Categorized fault kinds for pattern matching.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// Call through a zero or out-of-table function reference.
    #[error("NULL function call")]
    NullFunctionCall,

    /// Call of a builtin id with no registered callback.
    #[error("no callback for builtin #{0}")]
    BadBuiltinId(i32),

    /// The explicit call stack exceeded its depth bound.
    #[error("stack overflow")]
    StackOverflow,

    /// A return was executed with no frame to return to.
    #[error("stack underflow")]
    StackUnderflow,

    /// The per-invocation instruction budget was exhausted.
    #[error("runaway loop")]
    RunawayLoop,

    /// An operand addressed memory outside its valid range.
    #[error("operand out of range: {what}")]
    OperandOutOfRange {
        /// Description of the bad access.
        what: String,
    },

    /// A write was attempted on the world entity while the simulation
    /// is active.
    #[error("assignment to world entity")]
    WorldMutation,

    /// The statement's opcode is not part of the instruction set.
    #[error("bad opcode {0}")]
    BadOpcode(u16),

    /// The program counter left the statement table.
    #[error("program counter out of range")]
    ProgramCounterOutOfRange,

    /// Entity allocation hit the hard capacity limit.
    #[error("entity limit reached")]
    EntityLimitReached,

    /// The local-variable arena ran out of slots.
    #[error("local arena overflow")]
    LocalArenaOverflow,
}

/// Diagnostic context captured when a fault is raised.
#[derive(Debug, Clone, Default)]
pub struct FaultContext {
    /// Name of the function that was executing.
    pub function: String,
    /// Source-file name recorded for that function.
    pub file: String,
    /// Disassembly of the faulting statement.
    pub statement: String,
    /// Stack trace, innermost frame first.
    pub stack: Vec<String>,
}

impl FaultContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for FaultContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.statement)?;
        writeln!(f, "in {} ({})", self.function, self.file)?;
        for frame in &self.stack {
            writeln!(f, "  {frame}")?;
        }
        Ok(())
    }
}
