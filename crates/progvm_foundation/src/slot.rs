//! The 4-byte evaluation slot and the VM's address newtypes.
//!
//! All VM storage (globals, entity fields, the local arena) is made of
//! [`EvalSlot`] cells: raw 32-bit bit patterns whose interpretation is
//! directed by the opcode touching them. A run of three consecutive slots
//! represents a vector. The newtypes below keep the two addressing modes
//! of the instruction set apart at the type level: [`GlobalSlot`] indexes
//! the flat global array, while [`EntityOffset`] is a byte offset into the
//! entity store and is only ever produced by `ADDRESS` or entity-reference
//! slots.

use std::fmt;

/// Number of consecutive slots occupied by a vector value.
pub const VECTOR_WIDTH: usize = 3;

/// One 4-byte cell of VM memory.
///
/// The stored bit pattern is interpreted contextually as a float, a 32-bit
/// integer, a string-table offset, a function id, or an entity reference.
/// No tag is stored; the opcode supplies the kind.
#[derive(Copy, Clone, Default, Eq, PartialEq)]
pub struct EvalSlot(u32);

impl EvalSlot {
    /// The all-zero slot (0.0, 0, empty string, null function, the world).
    pub const ZERO: EvalSlot = EvalSlot(0);

    /// Creates a slot from a raw bit pattern.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Creates a slot holding a float.
    #[must_use]
    pub const fn from_float(value: f32) -> Self {
        Self(value.to_bits())
    }

    /// Creates a slot holding a signed 32-bit integer.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn from_int(value: i32) -> Self {
        Self(value as u32)
    }

    /// Creates a slot holding a string-table offset.
    #[must_use]
    pub const fn from_string(ofs: StringOffset) -> Self {
        Self(ofs.0)
    }

    /// Creates a slot holding a function id.
    #[must_use]
    pub const fn from_function(id: FunctionId) -> Self {
        Self(id.0)
    }

    /// Creates a slot holding an entity reference (a byte offset into the
    /// entity store).
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn from_entity(ofs: EntityOffset) -> Self {
        Self(ofs.0 as u32)
    }

    /// Returns the raw bit pattern.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Reads the slot as a float.
    #[must_use]
    pub const fn float(self) -> f32 {
        f32::from_bits(self.0)
    }

    /// Reads the slot as a signed 32-bit integer.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn int(self) -> i32 {
        self.0 as i32
    }

    /// Reads the slot as a string-table offset.
    #[must_use]
    pub const fn string(self) -> StringOffset {
        StringOffset(self.0)
    }

    /// Reads the slot as a function id.
    #[must_use]
    pub const fn function(self) -> FunctionId {
        FunctionId(self.0)
    }

    /// Reads the slot as an entity reference.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn entity(self) -> EntityOffset {
        EntityOffset(self.0 as i32)
    }

    /// Returns true if every bit is zero.
    ///
    /// This is the truthiness test used by `IF`/`IFNOT`: any non-zero bit
    /// pattern counts as true, including negative zero's sign bit.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for EvalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EvalSlot({:#010x} = {})", self.0, self.float())
    }
}

/// Kind hint for a slot access.
///
/// The storage itself is untyped; accessors take a `SlotKind` so width and
/// bounds checks happen once, centrally, instead of ad hoc at each opcode.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SlotKind {
    /// No value (unused definition slots).
    Void,
    /// A string-table offset.
    String,
    /// A 32-bit float.
    Float,
    /// Three consecutive float slots.
    Vector,
    /// An entity reference (byte offset into the entity store).
    Entity,
    /// A field offset within an entity record, in slots.
    Field,
    /// A function id.
    Function,
    /// A raw pointer-sized value (never produced by well-formed images).
    Pointer,
}

impl SlotKind {
    /// Number of slots a value of this kind occupies.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            SlotKind::Vector => VECTOR_WIDTH,
            _ => 1,
        }
    }
}

/// Index of one slot in the flat global array.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct GlobalSlot(u16);

impl GlobalSlot {
    /// Creates a global slot index.
    #[must_use]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the slot index as a usize.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the slot `n` positions after this one.
    ///
    /// # Panics
    /// Panics if the result does not fit in 16 bits; operand offsets are
    /// 16-bit in the image format, so this cannot happen for valid images.
    #[must_use]
    pub fn offset(self, n: u16) -> Self {
        Self(self.0.checked_add(n).expect("global slot offset overflow"))
    }
}

impl fmt::Debug for GlobalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalSlot({})", self.0)
    }
}

/// Byte offset of a field cell relative to the entity store base.
///
/// Produced by `ADDRESS` and stored in entity-reference slots; consumed by
/// `STOREP_*`/`LOAD_*`. Deliberately distinct from [`GlobalSlot`] so the
/// two addressing modes can never be confused.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct EntityOffset(i32);

impl EntityOffset {
    /// The world entity (record 0, byte offset 0).
    pub const WORLD: EntityOffset = EntityOffset(0);

    /// Creates an entity-relative byte offset.
    #[must_use]
    pub const fn new(bytes: i32) -> Self {
        Self(bytes)
    }

    /// Returns the raw byte offset.
    #[must_use]
    pub const fn bytes(self) -> i32 {
        self.0
    }

    /// Returns true if this references the world record's base.
    #[must_use]
    pub const fn is_world(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for EntityOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityOffset({})", self.0)
    }
}

/// Offset of a NUL-terminated string in the string table.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct StringOffset(u32);

impl StringOffset {
    /// The empty string at the start of every blob.
    pub const EMPTY: StringOffset = StringOffset(0);

    /// Creates a string offset.
    #[must_use]
    pub const fn new(ofs: u32) -> Self {
        Self(ofs)
    }

    /// Returns the raw offset.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StringOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringOffset({})", self.0)
    }
}

/// Index of a function descriptor in the image's function table.
///
/// Id 0 is the null function; calling it is a fault.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FunctionId(u32);

impl FunctionId {
    /// The null function reference.
    pub const NULL: FunctionId = FunctionId(0);

    /// Creates a function id.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the function-table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns true if this is the null function reference.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "FunctionId(null)")
        } else {
            write!(f, "FunctionId({})", self.0)
        }
    }
}
