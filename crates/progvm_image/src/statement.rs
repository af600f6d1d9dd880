//! Statement-table records.

use progvm_foundation::GlobalSlot;

use crate::opcode::Opcode;

/// One instruction as stored in the statement table: an opcode plus three
/// 16-bit operand fields.
///
/// Operands are raw wire values. For most opcodes they are unsigned slot
/// offsets into the global array; for branch opcodes they are signed
/// statement-relative offsets. The accessors perform the appropriate
/// reinterpretation; which one applies is opcode-directed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Statement {
    /// Wire opcode.
    pub op: u16,
    /// First operand.
    pub a: i16,
    /// Second operand.
    pub b: i16,
    /// Third operand.
    pub c: i16,
}

impl Statement {
    /// Size of one encoded statement in bytes.
    pub const WIRE_SIZE: usize = 8;

    /// Decodes the opcode, if recognized.
    #[must_use]
    pub fn opcode(self) -> Option<Opcode> {
        Opcode::from_u16(self.op)
    }

    /// Operand `a` as a global-slot offset.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn a_slot(self) -> GlobalSlot {
        GlobalSlot::new(self.a as u16)
    }

    /// Operand `b` as a global-slot offset.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn b_slot(self) -> GlobalSlot {
        GlobalSlot::new(self.b as u16)
    }

    /// Operand `c` as a global-slot offset.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn c_slot(self) -> GlobalSlot {
        GlobalSlot::new(self.c as u16)
    }

    /// Operand `a` as a signed branch offset.
    #[must_use]
    pub const fn a_branch(self) -> i32 {
        self.a as i32
    }

    /// Operand `b` as a signed branch offset.
    #[must_use]
    pub const fn b_branch(self) -> i32 {
        self.b as i32
    }

    /// Decodes a statement from its 8-byte wire form.
    #[must_use]
    pub fn from_wire(bytes: [u8; Self::WIRE_SIZE]) -> Self {
        Self {
            op: u16::from_le_bytes([bytes[0], bytes[1]]),
            a: i16::from_le_bytes([bytes[2], bytes[3]]),
            b: i16::from_le_bytes([bytes[4], bytes[5]]),
            c: i16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    /// Encodes this statement into its 8-byte wire form.
    #[must_use]
    pub fn to_wire(self) -> [u8; Self::WIRE_SIZE] {
        let op = self.op.to_le_bytes();
        let a = self.a.to_le_bytes();
        let b = self.b.to_le_bytes();
        let c = self.c.to_le_bytes();
        [op[0], op[1], a[0], a[1], b[0], b[1], c[0], c[1]]
    }
}
