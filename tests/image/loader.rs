//! Loader validation tests
//!
//! Rejection paths: version and schema mismatches, truncation, and the
//! structural cross-checks that run before any VM state exists.

use progvm_foundation::LoadError;
use progvm_image::{
    HEADER_SIZE, IMAGE_VERSION, ImageBuilder, Opcode, RESERVED_GLOBAL_SLOTS, SYSTEM_GLOBALS_CRC,
    crc16, load,
};

// =============================================================================
// Header validation
// =============================================================================

#[test]
fn empty_input_is_a_truncated_header() {
    assert_eq!(
        load(&[]).unwrap_err(),
        LoadError::Truncated { what: "header" }
    );
}

#[test]
fn header_must_be_complete() {
    let bytes = ImageBuilder::new().build();
    for cut in [1, HEADER_SIZE / 2, HEADER_SIZE - 1] {
        assert_eq!(
            load(&bytes[..cut]).unwrap_err(),
            LoadError::Truncated { what: "header" }
        );
    }
}

#[test]
fn version_is_checked_before_anything_else() {
    // Version 0 with otherwise-garbage tables must still report the
    // version, not a table error.
    let bytes = ImageBuilder::new().with_version(0).build();
    assert_eq!(
        load(&bytes).unwrap_err(),
        LoadError::VersionMismatch {
            expected: IMAGE_VERSION,
            found: 0
        }
    );
}

#[test]
fn schema_signature_is_checked_second() {
    let bytes = ImageBuilder::new().with_schema_crc(0xbeef).build();
    assert_eq!(
        load(&bytes).unwrap_err(),
        LoadError::SchemaMismatch {
            expected: SYSTEM_GLOBALS_CRC,
            found: 0xbeef
        }
    );
}

#[test]
fn content_crc_covers_the_whole_blob() {
    let bytes = ImageBuilder::new().build();
    let image = load(&bytes).expect("load failed");
    assert_eq!(image.content_crc, crc16(&bytes));

    let mut tweaked = bytes.clone();
    *tweaked.last_mut().unwrap() ^= 0x01;
    // A flipped global bit still loads but identifies differently.
    if let Ok(other) = load(&tweaked) {
        assert_ne!(other.content_crc, image.content_crc);
    }
}

// =============================================================================
// Structural cross-checks
// =============================================================================

#[test]
fn branch_past_the_end_is_corrupt() {
    let mut builder = ImageBuilder::new();
    builder.emit(Opcode::Goto, 500, 0, 0);
    assert!(matches!(
        load(&builder.build()).unwrap_err(),
        LoadError::Corrupt { .. }
    ));
}

#[test]
fn branch_before_the_start_is_corrupt() {
    let mut builder = ImageBuilder::new();
    builder.emit(Opcode::IfNot, 33, -5, 0);
    assert!(matches!(
        load(&builder.build()).unwrap_err(),
        LoadError::Corrupt { .. }
    ));
}

#[test]
fn conditional_branches_check_the_b_operand() {
    let mut builder = ImageBuilder::new();
    // Operand a is a slot offset here, not a branch; only b must be in
    // range.
    let target = builder.emit(Opcode::Done, 0, 0, 0);
    let jump = builder.emit(Opcode::If, 5000, 0, 0);
    builder.patch_branch(jump, target);
    assert!(load(&builder.build()).is_ok());
}

#[test]
fn function_entry_must_be_a_real_statement() {
    let mut builder = ImageBuilder::new();
    builder.function("ghost", 40, 33, 0, &[]);
    assert!(matches!(
        load(&builder.build()).unwrap_err(),
        LoadError::Corrupt { .. }
    ));
}

#[test]
fn locals_region_must_fit_the_global_array() {
    let mut builder = ImageBuilder::new();
    let entry = builder.emit(Opcode::Done, 0, 0, 0);
    builder.function("fat", entry, 30, 500, &[]);
    assert!(matches!(
        load(&builder.build()).unwrap_err(),
        LoadError::Corrupt { .. }
    ));
}

#[test]
fn reserved_global_region_is_mandatory() {
    let bytes = ImageBuilder::new().build();
    let image = load(&bytes).expect("load failed");
    assert!(image.globals_init.len() >= RESERVED_GLOBAL_SLOTS);
}

#[test]
fn truncated_final_table_is_rejected() {
    let bytes = ImageBuilder::new().build();
    assert!(matches!(
        load(&bytes[..bytes.len() - 1]).unwrap_err(),
        LoadError::Truncated { .. }
    ));
}
