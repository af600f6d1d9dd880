//! Slot primitives, address newtypes, and error taxonomy for progvm.
//!
//! This crate provides:
//! - [`EvalSlot`] - The 4-byte memory cell shared by all VM storage
//! - [`SlotKind`] - Kind hints for opcode-directed slot interpretation
//! - [`GlobalSlot`], [`EntityOffset`], [`StringOffset`], [`FunctionId`] -
//!   address newtypes that keep the VM's addressing modes distinct
//! - [`LoadError`], [`VmFault`] - the two error taxonomies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod slot;

pub use error::{ExecResult, FaultContext, FaultKind, LoadError, VmFault};
pub use slot::{
    EntityOffset, EvalSlot, FunctionId, GlobalSlot, SlotKind, StringOffset, VECTOR_WIDTH,
};
