//! Progvm - Embedded bytecode VM for game-logic scripts
//!
//! This crate re-exports all layers of the progvm system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: progvm_runtime    — interpreter, globals, entities, builtins
//! Layer 1: progvm_image      — image format, loader, strings, builder
//! Layer 0: progvm_foundation — slot primitives, addresses, errors
//! ```

pub use progvm_foundation as foundation;
pub use progvm_image as image;
pub use progvm_runtime as runtime;
