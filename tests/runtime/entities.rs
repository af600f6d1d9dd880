//! Entity store and field-addressing tests
//!
//! ADDRESS/STOREP/LOAD over real entity records, the world-mutation guard,
//! and the byte-offset reference arithmetic visible to scripts.

use progvm_foundation::{EntityOffset, EvalSlot, FaultKind, SlotKind};
use progvm_image::{ImageBuilder, Opcode};

use crate::util::{load_vm, s};

// =============================================================================
// Field addressing
// =============================================================================

#[test]
fn address_storep_load_roundtrip() {
    let mut b = ImageBuilder::new();
    b.field("armor", SlotKind::Float);
    let health = b.field_ref("health", SlotKind::Float);
    let eslot = b.slot(EvalSlot::ZERO);
    let value = b.slot(EvalSlot::from_float(75.0));
    let addr = b.slot(EvalSlot::ZERO);
    let out = b.global_float("health_read", 0.0);

    let entry = b.next_statement();
    b.emit(Opcode::Address, s(eslot), s(health), s(addr));
    b.emit(Opcode::StorepF, s(value), s(addr), 0);
    b.emit(Opcode::LoadF, s(eslot), s(health), s(out));
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("hurt", entry, 38, 0, &[]);

    let mut vm = load_vm(&b);
    let ent = vm.spawn_entity().expect("spawn failed");
    vm.globals_mut()
        .set(eslot, EvalSlot::from_entity(ent))
        .unwrap();

    let hurt = vm.find_function("hurt").unwrap();
    vm.execute(hurt).expect("run failed");

    assert_eq!(vm.globals().get(out).unwrap().float(), 75.0);
    // Field 1 is health; field 0 (armor) is untouched.
    assert_eq!(vm.entities().field(ent, 1).unwrap().float(), 75.0);
    assert_eq!(vm.entities().field(ent, 0).unwrap(), EvalSlot::ZERO);
}

#[test]
fn vector_fields_move_three_slots_at_once() {
    let mut b = ImageBuilder::new();
    let origin = b.field_ref("origin", SlotKind::Vector);
    let eslot = b.slot(EvalSlot::ZERO);
    let vx = b.slot(EvalSlot::from_float(16.0));
    b.slot(EvalSlot::from_float(-8.0));
    b.slot(EvalSlot::from_float(24.0));
    let addr = b.slot(EvalSlot::ZERO);
    let out = b.slot(EvalSlot::ZERO);
    b.slot(EvalSlot::ZERO);
    b.slot(EvalSlot::ZERO);

    let entry = b.next_statement();
    b.emit(Opcode::Address, s(eslot), s(origin), s(addr));
    b.emit(Opcode::StorepV, s(vx), s(addr), 0);
    b.emit(Opcode::LoadV, s(eslot), s(origin), s(out));
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("place", entry, 42, 0, &[]);

    let mut vm = load_vm(&b);
    let ent = vm.spawn_entity().expect("spawn failed");
    vm.globals_mut()
        .set(eslot, EvalSlot::from_entity(ent))
        .unwrap();

    let place = vm.find_function("place").unwrap();
    vm.execute(place).expect("run failed");

    assert_eq!(vm.globals().get(out).unwrap().float(), 16.0);
    assert_eq!(vm.globals().get(out.offset(1)).unwrap().float(), -8.0);
    assert_eq!(vm.globals().get(out.offset(2)).unwrap().float(), 24.0);
    assert_eq!(vm.entities().field(ent, 2).unwrap().float(), 24.0);
}

// =============================================================================
// World-mutation guard
// =============================================================================

#[test]
fn addressing_the_world_faults_only_while_simulating() {
    let mut b = ImageBuilder::new();
    let health = b.field_ref("health", SlotKind::Float);
    let world = b.slot(EvalSlot::ZERO);
    let value = b.slot(EvalSlot::from_float(1.0));
    let addr = b.slot(EvalSlot::ZERO);

    let entry = b.next_statement();
    b.emit(Opcode::Address, s(world), s(health), s(addr));
    b.emit(Opcode::StorepF, s(value), s(addr), 0);
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("touch_world", entry, 37, 0, &[]);

    let mut vm = load_vm(&b);
    let touch = vm.find_function("touch_world").unwrap();

    // Setup phase: writing world fields is allowed.
    vm.execute(touch).expect("setup write failed");
    assert_eq!(
        vm.entities().field(EntityOffset::WORLD, 0).unwrap().float(),
        1.0
    );

    vm.set_simulation_active(true);
    let fault = vm.execute(touch).unwrap_err();
    assert_eq!(fault.kind, FaultKind::WorldMutation);
}

#[test]
fn stale_world_address_is_gated_at_storep() {
    // An address taken during setup and smuggled into a global must not
    // allow a world write once the simulation is live.
    let mut b = ImageBuilder::new();
    let health = b.field_ref("health", SlotKind::Float);
    let world = b.slot(EvalSlot::ZERO);
    let value = b.slot(EvalSlot::from_float(1.0));
    let addr = b.global("stash", SlotKind::Entity, EvalSlot::ZERO);

    let take = b.next_statement();
    b.emit(Opcode::Address, s(world), s(health), s(addr));
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("take_addr", take, 37, 0, &[]);

    let write = b.next_statement();
    b.emit(Opcode::StorepF, s(value), s(addr), 0);
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("write_addr", write, 37, 0, &[]);

    let mut vm = load_vm(&b);
    let take = vm.find_function("take_addr").unwrap();
    let write = vm.find_function("write_addr").unwrap();

    vm.execute(take).expect("setup failed");
    vm.set_simulation_active(true);
    let fault = vm.execute(write).unwrap_err();
    assert_eq!(fault.kind, FaultKind::WorldMutation);
}

// =============================================================================
// Reference arithmetic
// =============================================================================

#[test]
fn entity_references_are_record_strides_apart() {
    let mut b = ImageBuilder::new();
    b.field("health", SlotKind::Float);
    b.field("origin", SlotKind::Vector);

    let mut vm = load_vm(&b);
    let stride = vm.entities().stride_bytes();
    assert_eq!(stride, (4 + 4) * 4);

    let first = vm.spawn_entity().unwrap();
    let second = vm.spawn_entity().unwrap();
    assert_eq!(usize::try_from(first.bytes()).unwrap(), stride);
    assert_eq!(usize::try_from(second.bytes()).unwrap(), 2 * stride);
}

#[test]
fn freed_entities_zero_their_fields() {
    let mut b = ImageBuilder::new();
    b.field("health", SlotKind::Float);

    let mut vm = load_vm(&b);
    vm.set_time(5.0);
    let ent = vm.spawn_entity().unwrap();
    vm.entities_mut()
        .set_field(ent, 0, EvalSlot::from_float(50.0))
        .unwrap();

    vm.free_entity(ent).expect("free failed");
    assert_eq!(vm.entities().field(ent, 0).unwrap(), EvalSlot::ZERO);
    assert!(vm.entities().is_free(1));
}
