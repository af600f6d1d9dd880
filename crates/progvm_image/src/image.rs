//! The loaded bytecode image.

use progvm_foundation::{EvalSlot, FunctionId, StringOffset};

use crate::def::Def;
use crate::function::FunctionDescriptor;
use crate::statement::Statement;
use crate::strings::StringTable;

/// A validated, loaded bytecode image.
///
/// Created once by [`crate::load`] and owned by the VM until shutdown.
/// Immutable after load with two deliberate exceptions held elsewhere or
/// inside: the global slot array (live state, copied out by the runtime)
/// and the string table's dynamic extension.
#[derive(Clone, Debug)]
pub struct BytecodeImage {
    /// Declared format version.
    pub version: u32,
    /// Well-known-globals schema signature from the header.
    pub schema_crc: u16,
    /// CRC-16 of the raw image bytes, for diagnostics/identification.
    pub content_crc: u16,
    /// The statement table.
    pub statements: Vec<Statement>,
    /// The function table; entry 0 is the null function.
    pub functions: Vec<FunctionDescriptor>,
    /// Global definitions (names for global slots).
    pub global_defs: Vec<Def>,
    /// Field definitions (names for entity-record field slots).
    pub field_defs: Vec<Def>,
    /// String storage; base blob from the image plus runtime extension.
    pub strings: StringTable,
    /// Initial values for the global slot array.
    pub globals_init: Vec<EvalSlot>,
    /// Declared per-entity field count, in slots.
    pub entity_fields: usize,
    /// Derived entity record stride in bytes (fixed header + fields).
    pub record_stride: usize,
}

impl BytecodeImage {
    /// Looks up a function descriptor by id.
    #[must_use]
    pub fn function(&self, id: FunctionId) -> Option<&FunctionDescriptor> {
        self.functions.get(id.index())
    }

    /// Finds a function by name.
    #[must_use]
    pub fn find_function(&self, name: &str) -> Option<FunctionId> {
        self.functions.iter().position(|f| self.string_or_empty(f.name) == name).map(|i| {
            #[allow(clippy::cast_possible_truncation)]
            let id = i as u32;
            FunctionId::new(id)
        })
    }

    /// Finds a field definition by name.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&Def> {
        self.field_defs
            .iter()
            .find(|d| self.string_or_empty(d.name) == name)
    }

    /// Finds a global definition by name.
    #[must_use]
    pub fn find_global(&self, name: &str) -> Option<&Def> {
        self.global_defs
            .iter()
            .find(|d| self.string_or_empty(d.name) == name)
    }

    /// String lookup that falls back to `""` for diagnostics paths.
    #[must_use]
    pub fn string_or_empty(&self, ofs: StringOffset) -> &str {
        self.strings.get(ofs).unwrap_or("")
    }
}
