//! Entity lifecycle natives.

use progvm_foundation::ExecResult;

use crate::exec::Vm;

/// `spawn()` - allocates a fresh entity and returns its reference.
pub fn native_spawn(vm: &mut Vm) -> ExecResult<()> {
    let ent = vm.spawn_entity()?;
    vm.return_entity(ent);
    Ok(())
}

/// `remove(e)` - frees an entity. Freeing the world is a fault.
pub fn native_remove(vm: &mut Vm) -> ExecResult<()> {
    let ent = vm.parm_entity(0);
    vm.free_entity(ent)
}
