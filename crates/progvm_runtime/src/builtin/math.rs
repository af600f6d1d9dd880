//! Float math natives.

use progvm_foundation::ExecResult;

use crate::exec::Vm;

/// `random()` - uniform float in [0, 1).
pub fn native_random(vm: &mut Vm) -> ExecResult<()> {
    let value = vm.random_float();
    vm.return_float(value);
    Ok(())
}

/// `rint(f)` - round to nearest, halves away from zero.
pub fn native_rint(vm: &mut Vm) -> ExecResult<()> {
    let value = vm.parm_float(0);
    vm.return_float(value.round());
    Ok(())
}

/// `floor(f)`
pub fn native_floor(vm: &mut Vm) -> ExecResult<()> {
    let value = vm.parm_float(0);
    vm.return_float(value.floor());
    Ok(())
}

/// `ceil(f)`
pub fn native_ceil(vm: &mut Vm) -> ExecResult<()> {
    let value = vm.parm_float(0);
    vm.return_float(value.ceil());
    Ok(())
}

/// `fabs(f)`
pub fn native_fabs(vm: &mut Vm) -> ExecResult<()> {
    let value = vm.parm_float(0);
    vm.return_float(value.abs());
    Ok(())
}
