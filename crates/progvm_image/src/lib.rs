//! Bytecode image format and loader for progvm.
//!
//! This crate provides:
//! - [`Opcode`] - The 66-entry instruction set
//! - [`Statement`] - One fetched instruction with its three operands
//! - [`FunctionDescriptor`], [`Def`] - function and definition table records
//! - [`StringTable`] - immutable blob plus append-only dynamic extension
//! - [`load`] - the fail-fast binary image loader
//! - [`ImageBuilder`] - byte-exact image assembly for hosts and tests

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod builder;
mod crc;
mod def;
mod function;
mod image;
mod loader;
mod opcode;
mod statement;
mod strings;

pub use builder::ImageBuilder;
pub use crc::crc16;
pub use def::{DEF_SAVE_GLOBAL, Def};
pub use function::{FunctionDescriptor, MAX_PARMS};
pub use image::BytecodeImage;
pub use loader::load;
pub use opcode::Opcode;
pub use statement::Statement;
pub use strings::StringTable;

/// Format version every image must declare.
pub const IMAGE_VERSION: u32 = 6;

/// CRC-16 signature of the well-known-globals layout this host expects.
///
/// An image compiled against a different layout carries a different value
/// and is rejected with `SchemaMismatch` before any state is built.
pub const SYSTEM_GLOBALS_CRC: u16 = 5927;

/// Size of the fixed image header in bytes.
pub const HEADER_SIZE: usize = 60;

/// Bytes per evaluation slot.
pub const SLOT_BYTES: usize = 4;

/// Slots occupied by the fixed per-entity record header
/// (free flag, free time, two reserved).
pub const ENTITY_HEADER_SLOTS: usize = 4;

/// Global slots reserved for the parameter-passing region and the
/// well-known-globals overlay; every valid image declares at least this
/// many globals.
pub const RESERVED_GLOBAL_SLOTS: usize = 33;
