//! String and debug-output natives.
//!
//! Conversion results are interned into the string table's dynamic region;
//! those offsets stay valid for the life of the VM and are never reclaimed.

use progvm_foundation::ExecResult;

use crate::exec::Vm;

/// `dprint(s)` - appends a line to the host-visible debug output.
pub fn native_dprint(vm: &mut Vm) -> ExecResult<()> {
    let text = vm.parm_string(0)?;
    vm.print_line(text);
    Ok(())
}

/// `ftos(f)` - float to string.
pub fn native_ftos(vm: &mut Vm) -> ExecResult<()> {
    let text = format_float(vm.parm_float(0));
    vm.return_string(&text);
    Ok(())
}

/// `vtos(v)` - vector to string, `'x y z'`.
pub fn native_vtos(vm: &mut Vm) -> ExecResult<()> {
    let [x, y, z] = vm.parm_vector3(0);
    let text = format!("'{x:.1} {y:.1} {z:.1}'");
    vm.return_string(&text);
    Ok(())
}

/// Whole values print as integers, everything else with one decimal.
#[allow(clippy::cast_possible_truncation)]
fn format_float(value: f32) -> String {
    if value.fract() == 0.0 && value.abs() < 1e10 {
        format!("{}", value as i64)
    } else {
        format!("{value:.1}")
    }
}
