//! Interpreter runtime for progvm.
//!
//! This crate provides:
//! - [`Vm`] - a loaded image plus all live execution state
//! - [`VmConfig`] - limits and policies (depth, arena, runaway budget)
//! - [`Globals`] and [`ofs`] - the global slot array and its overlay
//! - [`EntityStore`] - fixed-stride entity records addressed by byte offset
//! - [`BuiltinRegistry`] - host natives bound to image-declared ids
//! - [`disassemble`]/[`profile_report`] - diagnostics over a loaded image

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod arena;
mod builtin;
mod entity;
mod exec;
mod globals;
mod stack;
mod trace;

pub use arena::LocalArena;
pub use builtin::{BuiltinDef, BuiltinFn, BuiltinRegistry, DEFAULT_BUILTINS, RemapMode};
pub use entity::EntityStore;
pub use exec::{LOCAL_ARENA_SLOTS, MAX_CALL_DEPTH, MAX_ENTITIES, RUNAWAY_LIMIT, Vm, VmConfig};
pub use globals::{Globals, ofs};
pub use stack::{CallStack, StackFrame};
pub use trace::{disassemble, frame_line, profile_report};
