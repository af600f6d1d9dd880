//! Function-table records.

use progvm_foundation::StringOffset;

/// Maximum number of declared parameters per function.
pub const MAX_PARMS: usize = 8;

/// One entry in the image's function table.
///
/// A non-negative `first_statement` is the entry point of a user-defined
/// function; a negative value identifies builtin `-first_statement`.
/// Immutable after load; profiling counters live in the runtime, not here.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FunctionDescriptor {
    /// Statement index of the entry point, or `-builtin_id`.
    pub first_statement: i32,
    /// First global slot of the parameter/local region.
    pub parm_start: u16,
    /// Total slots in the parameter/local region.
    pub locals: u16,
    /// Function name (string-table offset).
    pub name: StringOffset,
    /// Source-file name (string-table offset).
    pub file: StringOffset,
    /// Declared parameter count.
    pub num_parms: u8,
    /// Width of each parameter in slots (1 scalar, 3 vector).
    pub parm_sizes: [u8; MAX_PARMS],
}

impl FunctionDescriptor {
    /// Size of one encoded function record in bytes.
    pub const WIRE_SIZE: usize = 36;

    /// Returns true if this descriptor names a builtin.
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        self.first_statement < 0
    }

    /// For builtins, the declared builtin id.
    #[must_use]
    pub fn builtin_id(&self) -> Option<u32> {
        if self.is_builtin() {
            Some(self.first_statement.unsigned_abs())
        } else {
            None
        }
    }

    /// For user-defined functions, the entry statement index.
    #[must_use]
    pub fn entry(&self) -> Option<usize> {
        usize::try_from(self.first_statement).ok()
    }
}
