//! Shared helpers for runtime tests.

use progvm_foundation::GlobalSlot;
use progvm_image::ImageBuilder;
use progvm_runtime::{Vm, VmConfig};

/// Shorthand for a slot index as a statement operand.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn s(slot: GlobalSlot) -> i16 {
    slot.index() as i16
}

/// Builds the image and loads it with default limits.
pub fn load_vm(builder: &ImageBuilder) -> Vm {
    load_vm_with(builder, VmConfig::default())
}

/// Builds the image and loads it with the given limits.
pub fn load_vm_with(builder: &ImageBuilder, config: VmConfig) -> Vm {
    let (vm, _diagnostics) = Vm::load(&builder.build(), config).expect("image load failed");
    vm
}
