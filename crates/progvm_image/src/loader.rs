//! The fail-fast binary image loader.
//!
//! Parses the fixed header, validates version and schema signature,
//! slices each header-declared table out of the blob, and cross-checks
//! structural facts (branch targets, entry points, definition offsets)
//! before any VM state exists. On any error the whole load is abandoned;
//! there is no partial image.

use progvm_foundation::{EvalSlot, LoadError, StringOffset};

use crate::crc::crc16;
use crate::def::Def;
use crate::function::{FunctionDescriptor, MAX_PARMS};
use crate::image::BytecodeImage;
use crate::statement::Statement;
use crate::strings::StringTable;
use crate::{
    ENTITY_HEADER_SLOTS, HEADER_SIZE, IMAGE_VERSION, RESERVED_GLOBAL_SLOTS, SLOT_BYTES,
    SYSTEM_GLOBALS_CRC,
};

/// Loads and validates a bytecode image from raw bytes.
///
/// # Errors
/// Returns a [`LoadError`] if the header is malformed, the version or
/// schema signature disagrees with this host, any table runs past the end
/// of the blob, or a table entry is internally inconsistent.
#[allow(clippy::too_many_lines)]
pub fn load(bytes: &[u8]) -> Result<BytecodeImage, LoadError> {
    if bytes.len() < HEADER_SIZE {
        return Err(LoadError::Truncated { what: "header" });
    }

    let word = |index: usize| -> i32 {
        let at = index * 4;
        i32::from_le_bytes(bytes[at..at + 4].try_into().expect("4-byte header word"))
    };

    #[allow(clippy::cast_sign_loss)]
    let version = word(0) as u32;
    if version != IMAGE_VERSION {
        return Err(LoadError::VersionMismatch {
            expected: IMAGE_VERSION,
            found: version,
        });
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let schema_crc = word(1) as u16;
    if schema_crc != SYSTEM_GLOBALS_CRC {
        return Err(LoadError::SchemaMismatch {
            expected: SYSTEM_GLOBALS_CRC,
            found: schema_crc,
        });
    }

    let content_crc = crc16(bytes);

    let statements_raw = table(bytes, word(2), word(3), Statement::WIRE_SIZE, "statements")?;
    let global_defs_raw = table(bytes, word(4), word(5), Def::WIRE_SIZE, "global defs")?;
    let field_defs_raw = table(bytes, word(6), word(7), Def::WIRE_SIZE, "field defs")?;
    let functions_raw = table(bytes, word(8), word(9), FunctionDescriptor::WIRE_SIZE, "functions")?;
    let strings_raw = table(bytes, word(10), word(11), 1, "strings")?;
    let globals_raw = table(bytes, word(12), word(13), SLOT_BYTES, "globals")?;
    let entity_fields = non_negative(word(14), "entity field count")?;

    // String blob first; every other table points into it.
    if strings_raw.is_empty() || strings_raw[strings_raw.len() - 1] != 0 {
        return Err(LoadError::Corrupt {
            detail: "string blob is empty or not NUL-terminated".to_string(),
        });
    }
    let strings = StringTable::from_blob(strings_raw.to_vec());

    let statements: Vec<Statement> = statements_raw
        .chunks_exact(Statement::WIRE_SIZE)
        .map(|chunk| Statement::from_wire(chunk.try_into().expect("8-byte statement")))
        .collect();
    validate_branches(&statements)?;

    let globals_init: Vec<EvalSlot> = globals_raw
        .chunks_exact(SLOT_BYTES)
        .map(|chunk| {
            EvalSlot::from_bits(u32::from_le_bytes(chunk.try_into().expect("4-byte slot")))
        })
        .collect();
    if globals_init.len() < RESERVED_GLOBAL_SLOTS {
        return Err(LoadError::Corrupt {
            detail: format!(
                "only {} globals, {} reserved slots required",
                globals_init.len(),
                RESERVED_GLOBAL_SLOTS
            ),
        });
    }

    let functions = parse_functions(functions_raw, statements.len(), globals_init.len(), &strings)?;
    if functions.is_empty() {
        return Err(LoadError::Corrupt {
            detail: "empty function table".to_string(),
        });
    }

    let global_defs = parse_defs(global_defs_raw, globals_init.len(), &strings, "global def")?;
    let field_defs = parse_defs(field_defs_raw, entity_fields, &strings, "field def")?;

    Ok(BytecodeImage {
        version,
        schema_crc,
        content_crc,
        statements,
        functions,
        global_defs,
        field_defs,
        strings,
        globals_init,
        entity_fields,
        record_stride: (ENTITY_HEADER_SLOTS + entity_fields) * SLOT_BYTES,
    })
}

/// Slices a header-declared table, or fails with `Truncated`.
fn table<'a>(
    bytes: &'a [u8],
    ofs: i32,
    count: i32,
    entry_size: usize,
    what: &'static str,
) -> Result<&'a [u8], LoadError> {
    let ofs = non_negative(ofs, what)?;
    let count = non_negative(count, what)?;
    let len = count
        .checked_mul(entry_size)
        .ok_or(LoadError::Truncated { what })?;
    let end = ofs.checked_add(len).ok_or(LoadError::Truncated { what })?;
    bytes.get(ofs..end).ok_or(LoadError::Truncated { what })
}

fn non_negative(value: i32, what: &'static str) -> Result<usize, LoadError> {
    usize::try_from(value).map_err(|_| LoadError::Truncated { what })
}

/// Branch targets are structural facts, checked once at load rather than
/// per-execution.
fn validate_branches(statements: &[Statement]) -> Result<(), LoadError> {
    #[allow(clippy::cast_possible_wrap)]
    let count = statements.len() as i64;
    for (index, st) in statements.iter().enumerate() {
        let Some(op) = st.opcode() else {
            // Unknown opcodes fault at execution time if reached.
            continue;
        };
        if !op.is_branch() {
            continue;
        }
        let offset = if op == crate::Opcode::Goto {
            st.a_branch()
        } else {
            st.b_branch()
        };
        #[allow(clippy::cast_possible_wrap)]
        let target = index as i64 + i64::from(offset);
        if target < 0 || target >= count {
            return Err(LoadError::Corrupt {
                detail: format!("statement {index}: branch target {target} of {count}"),
            });
        }
    }
    Ok(())
}

fn parse_functions(
    raw: &[u8],
    num_statements: usize,
    num_globals: usize,
    strings: &StringTable,
) -> Result<Vec<FunctionDescriptor>, LoadError> {
    let mut functions = Vec::with_capacity(raw.len() / FunctionDescriptor::WIRE_SIZE);
    for (index, chunk) in raw.chunks_exact(FunctionDescriptor::WIRE_SIZE).enumerate() {
        let word = |at: usize| -> i32 {
            i32::from_le_bytes(chunk[at..at + 4].try_into().expect("4-byte function word"))
        };
        let corrupt = |detail: String| LoadError::Corrupt {
            detail: format!("function {index}: {detail}"),
        };

        let first_statement = word(0);
        if let Ok(entry) = usize::try_from(first_statement) {
            if entry >= num_statements {
                return Err(corrupt(format!(
                    "entry statement {entry} of {num_statements}"
                )));
            }
        }

        let parm_start = u16::try_from(word(4))
            .map_err(|_| corrupt(format!("parameter base {}", word(4))))?;
        let locals =
            u16::try_from(word(8)).map_err(|_| corrupt(format!("locals count {}", word(8))))?;
        if usize::from(parm_start) + usize::from(locals) > num_globals {
            return Err(corrupt(format!(
                "locals region {parm_start}+{locals} of {num_globals} globals"
            )));
        }

        // word(12) is the on-disk profile counter; runtime keeps its own.
        let name = string_offset(word(16), strings).map_err(|detail| corrupt(detail))?;
        let file = string_offset(word(20), strings).map_err(|detail| corrupt(detail))?;

        let num_parms = u8::try_from(word(24))
            .ok()
            .filter(|&n| usize::from(n) <= MAX_PARMS)
            .ok_or_else(|| corrupt(format!("parameter count {}", word(24))))?;
        let mut parm_sizes = [0u8; MAX_PARMS];
        parm_sizes.copy_from_slice(&chunk[28..36]);

        functions.push(FunctionDescriptor {
            first_statement,
            parm_start,
            locals,
            name,
            file,
            num_parms,
            parm_sizes,
        });
    }
    Ok(functions)
}

fn parse_defs(
    raw: &[u8],
    slot_bound: usize,
    strings: &StringTable,
    what: &str,
) -> Result<Vec<Def>, LoadError> {
    let mut defs = Vec::with_capacity(raw.len() / Def::WIRE_SIZE);
    for (index, chunk) in raw.chunks_exact(Def::WIRE_SIZE).enumerate() {
        let raw_type = u16::from_le_bytes(chunk[0..2].try_into().expect("2-byte type"));
        let offset = u16::from_le_bytes(chunk[2..4].try_into().expect("2-byte offset"));
        let name_word = i32::from_le_bytes(chunk[4..8].try_into().expect("4-byte name"));

        let corrupt = |detail: String| LoadError::Corrupt {
            detail: format!("{what} {index}: {detail}"),
        };
        let name = string_offset(name_word, strings).map_err(|detail| corrupt(detail))?;

        let def = Def {
            raw_type,
            offset,
            name,
        };
        let width = def.kind().map_or(1, progvm_foundation::SlotKind::width);
        if usize::from(offset) + width > slot_bound {
            return Err(corrupt(format!(
                "slot offset {offset}+{width} of {slot_bound}"
            )));
        }
        defs.push(def);
    }
    Ok(defs)
}

fn string_offset(word: i32, strings: &StringTable) -> Result<StringOffset, String> {
    let ofs =
        usize::try_from(word).map_err(|_| format!("negative string offset {word}"))?;
    if ofs >= strings.base_len() {
        return Err(format!("string offset {ofs} of {}", strings.base_len()));
    }
    #[allow(clippy::cast_possible_truncation)]
    let ofs = ofs as u32;
    Ok(StringOffset::new(ofs))
}
