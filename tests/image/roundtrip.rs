//! Builder-to-loader roundtrip tests
//!
//! Whole programs assembled with the builder must come back from the
//! loader with the same tables, names, and derived layout facts.

use progvm_foundation::{EvalSlot, SlotKind, StringOffset};
use progvm_image::{
    DEF_SAVE_GLOBAL, ENTITY_HEADER_SLOTS, ImageBuilder, Opcode, SLOT_BYTES, load,
};

// =============================================================================
// Null entries
// =============================================================================

#[test]
fn statement_zero_and_function_zero_are_null() {
    let image = load(&ImageBuilder::new().build()).expect("load failed");

    let null_statement = image.statements[0];
    assert_eq!(null_statement.opcode(), Some(Opcode::Done));
    assert_eq!((null_statement.a, null_statement.b, null_statement.c), (0, 0, 0));

    let null_function = &image.functions[0];
    assert_eq!(null_function.first_statement, 0);
    assert_eq!(null_function.name, StringOffset::EMPTY);
}

#[test]
fn real_ids_start_at_one() {
    let mut builder = ImageBuilder::new();
    let entry = builder.emit(Opcode::Done, 0, 0, 0);
    let first = builder.function("first", entry, 33, 0, &[]);
    assert_eq!(first.index(), 1);
    assert_eq!(entry, 1);
}

// =============================================================================
// Tables
// =============================================================================

#[test]
fn statements_survive_byte_for_byte() {
    let mut builder = ImageBuilder::new();
    builder.emit(Opcode::MulF, 33, 34, 35);
    builder.emit(Opcode::StoreF, 35, -1, 0);
    let image = load(&builder.build()).expect("load failed");

    assert_eq!(image.statements[1].opcode(), Some(Opcode::MulF));
    assert_eq!(image.statements[2].a, 35);
    assert_eq!(image.statements[2].b, -1);
}

#[test]
fn strings_resolve_after_reload() {
    let mut builder = ImageBuilder::new();
    let hello = builder.string("hello");
    let doors = builder.string("doors.src");
    let image = load(&builder.build()).expect("load failed");

    assert_eq!(image.strings.get(hello).unwrap(), "hello");
    assert_eq!(image.strings.get(doors).unwrap(), "doors.src");
    assert_eq!(image.strings.get(StringOffset::EMPTY).unwrap(), "");
}

#[test]
fn function_parameters_roundtrip() {
    let mut builder = ImageBuilder::new();
    let entry = builder.emit(Opcode::Done, 0, 0, 0);
    for _ in 0..4 {
        builder.slot(EvalSlot::ZERO);
    }
    builder.function("impact", entry, 33, 4, &[1, 3]);
    let image = load(&builder.build()).expect("load failed");

    let f = &image.functions[1];
    assert_eq!(f.num_parms, 2);
    assert_eq!(f.parm_sizes[0], 1);
    assert_eq!(f.parm_sizes[1], 3);
    assert_eq!(f.locals, 4);
    assert_eq!(image.string_or_empty(f.name), "impact");
}

#[test]
fn save_global_flag_survives() {
    let mut builder = ImageBuilder::new();
    builder.global("plain", SlotKind::Float, EvalSlot::ZERO);
    let image = load(&builder.build()).expect("load failed");

    let def = image.find_global("plain").expect("def missing");
    assert!(!def.save_global());
    assert_eq!(def.raw_type & DEF_SAVE_GLOBAL, 0);
}

// =============================================================================
// Derived layout
// =============================================================================

#[test]
fn record_stride_follows_declared_fields() {
    let mut builder = ImageBuilder::new();
    builder.field("health", SlotKind::Float);
    builder.field("velocity", SlotKind::Vector);
    builder.field("enemy", SlotKind::Entity);
    let image = load(&builder.build()).expect("load failed");

    assert_eq!(image.entity_fields, 5);
    assert_eq!(image.record_stride, (ENTITY_HEADER_SLOTS + 5) * SLOT_BYTES);

    assert_eq!(image.find_field("health").unwrap().offset, 0);
    assert_eq!(image.find_field("velocity").unwrap().offset, 1);
    assert_eq!(image.find_field("enemy").unwrap().offset, 4);
}

#[test]
fn vector_fields_occupy_three_slots() {
    let mut builder = ImageBuilder::new();
    builder.field("origin", SlotKind::Vector);
    let image = load(&builder.build()).expect("load failed");
    assert_eq!(image.entity_fields, 3);
}
