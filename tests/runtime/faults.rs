//! Fault policy tests
//!
//! Context capture at the faulting statement, stack traces through nested
//! calls, full unwinding, and the STATE scheduling opcode.

use progvm_foundation::{EvalSlot, FaultKind, FunctionId, SlotKind};
use progvm_image::{HEADER_SIZE, ImageBuilder, Opcode, Statement};

use crate::util::{load_vm, s};

// =============================================================================
// Context capture
// =============================================================================

#[test]
fn fault_context_points_at_the_faulting_statement() {
    let mut b = ImageBuilder::new();
    b.string("combat.src");
    let inner_slot = b.slot(EvalSlot::ZERO);

    let inner = b.next_statement();
    // Global 500 is far outside the array.
    b.emit(Opcode::StoreF, 500, 1, 0);
    b.emit(Opcode::Done, 0, 0, 0);
    let inner_id = b.function("bite", inner, 34, 0, &[]);

    let outer = b.next_statement();
    b.emit(Opcode::Call0, s(inner_slot), 0, 0);
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("attack", outer, 34, 0, &[]);

    let mut vm = load_vm(&b);
    vm.globals_mut()
        .set(inner_slot, EvalSlot::from_function(inner_id))
        .unwrap();

    let attack = vm.find_function("attack").unwrap();
    let fault = vm.execute(attack).unwrap_err();
    assert!(matches!(fault.kind, FaultKind::OperandOutOfRange { .. }));

    let context = fault.context.expect("context");
    assert_eq!(context.function, "bite");
    assert!(context.statement.contains("STORE_F 500 1 0"));
    assert!(context.stack.iter().any(|line| line.contains("attack")));
}

#[test]
fn running_off_the_statement_table_is_caught() {
    let mut b = ImageBuilder::new();
    let x = b.slot(EvalSlot::from_float(1.0));
    let entry = b.next_statement();
    // No DONE: execution falls off the end of the table.
    b.emit(Opcode::AddF, s(x), s(x), s(x));
    b.function("ragged", entry, 34, 0, &[]);

    let mut vm = load_vm(&b);
    let ragged = vm.find_function("ragged").unwrap();
    let fault = vm.execute(ragged).unwrap_err();
    assert_eq!(fault.kind, FaultKind::ProgramCounterOutOfRange);
}

#[test]
fn unknown_opcodes_fault_at_execution_not_load() {
    let mut b = ImageBuilder::new();
    let entry = b.next_statement();
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("weird", entry, 33, 0, &[]);

    let mut bytes = b.build();
    // Patch the emitted statement's opcode to a value outside the set.
    let at = HEADER_SIZE + Statement::WIRE_SIZE;
    bytes[at..at + 2].copy_from_slice(&999u16.to_le_bytes());

    let (mut vm, _) =
        progvm_runtime::Vm::load(&bytes, progvm_runtime::VmConfig::default()).expect("load");
    let weird = vm.find_function("weird").unwrap();
    let fault = vm.execute(weird).unwrap_err();
    assert_eq!(fault.kind, FaultKind::BadOpcode(999));
}

#[test]
fn calling_through_a_zero_slot_is_a_null_call() {
    let mut b = ImageBuilder::new();
    let null = b.slot(EvalSlot::ZERO);
    let entry = b.next_statement();
    b.emit(Opcode::Call0, s(null), 0, 0);
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("misfire", entry, 34, 0, &[]);

    let mut vm = load_vm(&b);
    let misfire = vm.find_function("misfire").unwrap();
    let fault = vm.execute(misfire).unwrap_err();
    assert_eq!(fault.kind, FaultKind::NullFunctionCall);
}

// =============================================================================
// STATE scheduling
// =============================================================================

#[test]
fn state_stamps_think_fields_on_self() {
    let mut b = ImageBuilder::new();
    b.field("nextthink", SlotKind::Float);
    b.field("frame", SlotKind::Float);
    b.field("think", SlotKind::Function);
    let frame = b.slot(EvalSlot::from_float(12.0));
    let think_fn = b.slot(EvalSlot::from_function(FunctionId::new(1)));

    let entry = b.next_statement();
    b.emit(Opcode::State, s(frame), s(think_fn), 0);
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("walk_cycle", entry, 35, 0, &[]);

    let mut vm = load_vm(&b);
    vm.set_time(4.0);
    let ent = vm.spawn_entity().expect("spawn failed");
    vm.globals_mut().set_self(ent);

    let walk = vm.find_function("walk_cycle").unwrap();
    vm.execute(walk).expect("run failed");

    assert_eq!(
        vm.entities().field(ent, 0).unwrap().float(),
        4.0f32 + 0.1f32
    );
    assert_eq!(vm.entities().field(ent, 1).unwrap().float(), 12.0);
    assert_eq!(vm.entities().field(ent, 2).unwrap().function(), FunctionId::new(1));
}

#[test]
fn state_on_the_world_is_guarded_while_simulating() {
    let mut b = ImageBuilder::new();
    b.field("nextthink", SlotKind::Float);
    b.field("frame", SlotKind::Float);
    b.field("think", SlotKind::Function);
    let frame = b.slot(EvalSlot::ZERO);

    let entry = b.next_statement();
    b.emit(Opcode::State, s(frame), s(frame), 0);
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("idle", entry, 34, 0, &[]);

    let mut vm = load_vm(&b);
    vm.set_simulation_active(true);
    // Overlay self defaults to the world.
    let idle = vm.find_function("idle").unwrap();
    let fault = vm.execute(idle).unwrap_err();
    assert_eq!(fault.kind, FaultKind::WorldMutation);
}

// =============================================================================
// Clock
// =============================================================================

#[test]
fn set_time_derives_frametime() {
    let b = ImageBuilder::new();
    let mut vm = load_vm(&b);

    vm.set_time(1.0);
    vm.set_time(1.25);
    assert_eq!(vm.globals().time(), 1.25);
    assert_eq!(vm.globals().frametime(), 0.25);
}
