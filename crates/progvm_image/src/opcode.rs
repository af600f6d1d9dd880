//! Instruction set for the progvm interpreter.
//!
//! Operand addressing is a slot offset into the global array unless a
//! variant says otherwise: branch opcodes carry signed statement-relative
//! offsets, and the `STOREP` family consumes entity-relative byte offsets
//! produced by `ADDRESS`.

use std::fmt;

/// A single opcode, in wire order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// End of function; copies `a..a+2` into the return slots.
    Done = 0,

    /// Float multiply: `c = a * b`
    MulF = 1,
    /// Vector dot product: `c = a . b`
    MulV = 2,
    /// Scale vector by float: `c = a * b` (a float, b vector)
    MulFv = 3,
    /// Scale vector by float: `c = a * b` (a vector, b float)
    MulVf = 4,
    /// Float divide: `c = a / b`
    DivF = 5,

    /// Float add: `c = a + b`
    AddF = 6,
    /// Vector add: `c = a + b`
    AddV = 7,
    /// Float subtract: `c = a - b`
    SubF = 8,
    /// Vector subtract: `c = a - b`
    SubV = 9,

    /// Float equality, producing 0/1 float in `c`.
    EqF = 10,
    /// Vector equality.
    EqV = 11,
    /// String equality (by content).
    EqS = 12,
    /// Entity-reference equality.
    EqE = 13,
    /// Function-reference equality.
    EqFnc = 14,

    /// Float inequality.
    NeF = 15,
    /// Vector inequality.
    NeV = 16,
    /// String inequality.
    NeS = 17,
    /// Entity-reference inequality.
    NeE = 18,
    /// Function-reference inequality.
    NeFnc = 19,

    /// Float less-or-equal.
    Le = 20,
    /// Float greater-or-equal.
    Ge = 21,
    /// Float less-than.
    Lt = 22,
    /// Float greater-than.
    Gt = 23,

    /// Load float field: `a` entity ref, `b` field slot, result in `c`.
    LoadF = 24,
    /// Load vector field (3 slots).
    LoadV = 25,
    /// Load string field.
    LoadS = 26,
    /// Load entity-reference field.
    LoadEnt = 27,
    /// Load field-offset field.
    LoadFld = 28,
    /// Load function-reference field.
    LoadFnc = 29,

    /// Compute an entity-relative byte address: `a` entity ref, `b` field
    /// slot, address stored in `c` for a later `STOREP`/`LOAD`.
    Address = 30,

    /// Copy slot `a` into slot `b` (float).
    StoreF = 31,
    /// Copy 3 slots (vector).
    StoreV = 32,
    /// Copy slot (string).
    StoreS = 33,
    /// Copy slot (entity reference).
    StoreEnt = 34,
    /// Copy slot (field offset).
    StoreFld = 35,
    /// Copy slot (function reference).
    StoreFnc = 36,

    /// Indirect store through the byte address in `b` (float).
    StorepF = 37,
    /// Indirect vector store (3 slots).
    StorepV = 38,
    /// Indirect store (string).
    StorepS = 39,
    /// Indirect store (entity reference).
    StorepEnt = 40,
    /// Indirect store (field offset).
    StorepFld = 41,
    /// Indirect store (function reference).
    StorepFnc = 42,

    /// Return from function; same return-slot copy as `DONE`.
    Return = 43,

    /// Float logical not.
    NotF = 44,
    /// Vector logical not (all components zero).
    NotV = 45,
    /// String logical not (empty or null reference).
    NotS = 46,
    /// Entity logical not (world reference).
    NotEnt = 47,
    /// Function logical not (null reference).
    NotFnc = 48,

    /// Branch by `b` if `a` holds any non-zero bit pattern.
    If = 49,
    /// Branch by `b` if `a` is all zero bits.
    IfNot = 50,

    /// Call with 0 arguments; `a` holds the function reference.
    Call0 = 51,
    /// Call with 1 argument.
    Call1 = 52,
    /// Call with 2 arguments.
    Call2 = 53,
    /// Call with 3 arguments.
    Call3 = 54,
    /// Call with 4 arguments.
    Call4 = 55,
    /// Call with 5 arguments.
    Call5 = 56,
    /// Call with 6 arguments.
    Call6 = 57,
    /// Call with 7 arguments.
    Call7 = 58,
    /// Call with 8 arguments.
    Call8 = 59,

    /// Schedule a future re-entry on the current self entity: stamps
    /// `nextthink`, writes `frame` from `a` and `think` from `b`.
    State = 60,

    /// Unconditional branch by `a`.
    Goto = 61,

    /// Float logical and: `c = (a != 0) && (b != 0)`.
    And = 62,
    /// Float logical or: `c = (a != 0) || (b != 0)`.
    Or = 63,

    /// Bitwise and on truncated floats.
    BitAnd = 64,
    /// Bitwise or on truncated floats.
    BitOr = 65,
}

/// Every opcode in wire order; index equals discriminant.
const OPCODES: [Opcode; 66] = [
    Opcode::Done,
    Opcode::MulF,
    Opcode::MulV,
    Opcode::MulFv,
    Opcode::MulVf,
    Opcode::DivF,
    Opcode::AddF,
    Opcode::AddV,
    Opcode::SubF,
    Opcode::SubV,
    Opcode::EqF,
    Opcode::EqV,
    Opcode::EqS,
    Opcode::EqE,
    Opcode::EqFnc,
    Opcode::NeF,
    Opcode::NeV,
    Opcode::NeS,
    Opcode::NeE,
    Opcode::NeFnc,
    Opcode::Le,
    Opcode::Ge,
    Opcode::Lt,
    Opcode::Gt,
    Opcode::LoadF,
    Opcode::LoadV,
    Opcode::LoadS,
    Opcode::LoadEnt,
    Opcode::LoadFld,
    Opcode::LoadFnc,
    Opcode::Address,
    Opcode::StoreF,
    Opcode::StoreV,
    Opcode::StoreS,
    Opcode::StoreEnt,
    Opcode::StoreFld,
    Opcode::StoreFnc,
    Opcode::StorepF,
    Opcode::StorepV,
    Opcode::StorepS,
    Opcode::StorepEnt,
    Opcode::StorepFld,
    Opcode::StorepFnc,
    Opcode::Return,
    Opcode::NotF,
    Opcode::NotV,
    Opcode::NotS,
    Opcode::NotEnt,
    Opcode::NotFnc,
    Opcode::If,
    Opcode::IfNot,
    Opcode::Call0,
    Opcode::Call1,
    Opcode::Call2,
    Opcode::Call3,
    Opcode::Call4,
    Opcode::Call5,
    Opcode::Call6,
    Opcode::Call7,
    Opcode::Call8,
    Opcode::State,
    Opcode::Goto,
    Opcode::And,
    Opcode::Or,
    Opcode::BitAnd,
    Opcode::BitOr,
];

const MNEMONICS: [&str; 66] = [
    "DONE",
    "MUL_F",
    "MUL_V",
    "MUL_FV",
    "MUL_VF",
    "DIV_F",
    "ADD_F",
    "ADD_V",
    "SUB_F",
    "SUB_V",
    "EQ_F",
    "EQ_V",
    "EQ_S",
    "EQ_E",
    "EQ_FNC",
    "NE_F",
    "NE_V",
    "NE_S",
    "NE_E",
    "NE_FNC",
    "LE",
    "GE",
    "LT",
    "GT",
    "LOAD_F",
    "LOAD_V",
    "LOAD_S",
    "LOAD_ENT",
    "LOAD_FLD",
    "LOAD_FNC",
    "ADDRESS",
    "STORE_F",
    "STORE_V",
    "STORE_S",
    "STORE_ENT",
    "STORE_FLD",
    "STORE_FNC",
    "STOREP_F",
    "STOREP_V",
    "STOREP_S",
    "STOREP_ENT",
    "STOREP_FLD",
    "STOREP_FNC",
    "RETURN",
    "NOT_F",
    "NOT_V",
    "NOT_S",
    "NOT_ENT",
    "NOT_FNC",
    "IF",
    "IFNOT",
    "CALL0",
    "CALL1",
    "CALL2",
    "CALL3",
    "CALL4",
    "CALL5",
    "CALL6",
    "CALL7",
    "CALL8",
    "STATE",
    "GOTO",
    "AND",
    "OR",
    "BITAND",
    "BITOR",
];

impl Opcode {
    /// Decodes a wire opcode, if it is part of the instruction set.
    #[must_use]
    pub fn from_u16(op: u16) -> Option<Self> {
        OPCODES.get(op as usize).copied()
    }

    /// Returns the wire value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the conventional mnemonic.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        MNEMONICS[self as usize]
    }

    /// For `CALL0`..`CALL8`, the argument count.
    #[must_use]
    pub fn call_arg_count(self) -> Option<u8> {
        let op = self.as_u16();
        let base = Opcode::Call0.as_u16();
        if (base..=Opcode::Call8.as_u16()).contains(&op) {
            #[allow(clippy::cast_possible_truncation)]
            let count = (op - base) as u8;
            Some(count)
        } else {
            None
        }
    }

    /// Returns true for `IF`/`IFNOT`/`GOTO`, whose operands are signed
    /// statement-relative branch offsets rather than slot offsets.
    #[must_use]
    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::If | Opcode::IfNot | Opcode::Goto)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
