//! Global- and field-definition table records.

use progvm_foundation::{SlotKind, StringOffset};

/// Definition-type flag marking a global that savegames must persist.
pub const DEF_SAVE_GLOBAL: u16 = 1 << 15;

/// One entry in the global- or field-definition table.
///
/// Global defs describe slots in the global array; field defs describe
/// slot offsets within the declared-field region of an entity record.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Def {
    /// Wire type id, possibly carrying [`DEF_SAVE_GLOBAL`].
    pub raw_type: u16,
    /// Slot offset of the definition.
    pub offset: u16,
    /// Definition name (string-table offset).
    pub name: StringOffset,
}

impl Def {
    /// Size of one encoded definition record in bytes.
    pub const WIRE_SIZE: usize = 8;

    /// Decodes the slot kind, if the wire type id is recognized.
    #[must_use]
    pub fn kind(self) -> Option<SlotKind> {
        match self.raw_type & !DEF_SAVE_GLOBAL {
            0 => Some(SlotKind::Void),
            1 => Some(SlotKind::String),
            2 => Some(SlotKind::Float),
            3 => Some(SlotKind::Vector),
            4 => Some(SlotKind::Entity),
            5 => Some(SlotKind::Field),
            6 => Some(SlotKind::Function),
            7 => Some(SlotKind::Pointer),
            _ => None,
        }
    }

    /// Encodes a slot kind to its wire type id.
    #[must_use]
    pub fn type_id(kind: SlotKind) -> u16 {
        match kind {
            SlotKind::Void => 0,
            SlotKind::String => 1,
            SlotKind::Float => 2,
            SlotKind::Vector => 3,
            SlotKind::Entity => 4,
            SlotKind::Field => 5,
            SlotKind::Function => 6,
            SlotKind::Pointer => 7,
        }
    }

    /// Returns true if this global participates in savegame persistence.
    #[must_use]
    pub const fn save_global(self) -> bool {
        self.raw_type & DEF_SAVE_GLOBAL != 0
    }
}
