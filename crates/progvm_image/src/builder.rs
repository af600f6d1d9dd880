//! In-memory image construction, for tests and tooling.
//!
//! Builds a byte-exact image the loader accepts: statement 0 is a null
//! `DONE` and function 0 is the null function, so real ids start at 1 and
//! zero-valued slots never alias live code.

use progvm_foundation::{EvalSlot, FunctionId, GlobalSlot, SlotKind, StringOffset};

use crate::def::Def;
use crate::function::{FunctionDescriptor, MAX_PARMS};
use crate::opcode::Opcode;
use crate::statement::Statement;
use crate::{HEADER_SIZE, IMAGE_VERSION, RESERVED_GLOBAL_SLOTS, SYSTEM_GLOBALS_CRC};

/// Assembles a bytecode image from code, definitions, and globals.
#[derive(Clone, Debug)]
pub struct ImageBuilder {
    version: u32,
    schema_crc: u16,
    statements: Vec<Statement>,
    functions: Vec<FunctionDescriptor>,
    global_defs: Vec<Def>,
    field_defs: Vec<Def>,
    strings: Vec<u8>,
    globals: Vec<EvalSlot>,
    entity_fields: u16,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBuilder {
    /// Starts an image with the null statement, null function, empty
    /// string at offset 0, and the reserved global region zeroed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: IMAGE_VERSION,
            schema_crc: SYSTEM_GLOBALS_CRC,
            statements: vec![Statement {
                op: Opcode::Done.as_u16(),
                a: 0,
                b: 0,
                c: 0,
            }],
            functions: vec![FunctionDescriptor {
                first_statement: 0,
                parm_start: 0,
                locals: 0,
                name: StringOffset::EMPTY,
                file: StringOffset::EMPTY,
                num_parms: 0,
                parm_sizes: [0; MAX_PARMS],
            }],
            global_defs: Vec::new(),
            field_defs: Vec::new(),
            strings: vec![0],
            globals: vec![EvalSlot::ZERO; RESERVED_GLOBAL_SLOTS],
            entity_fields: 0,
        }
    }

    /// Overrides the declared format version.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Overrides the declared schema signature.
    #[must_use]
    pub fn with_schema_crc(mut self, crc: u16) -> Self {
        self.schema_crc = crc;
        self
    }

    /// Adds `text` to the string blob and returns its offset.
    pub fn string(&mut self, text: &str) -> StringOffset {
        #[allow(clippy::cast_possible_truncation)]
        let ofs = StringOffset::new(self.strings.len() as u32);
        self.strings.extend_from_slice(text.as_bytes());
        self.strings.push(0);
        ofs
    }

    /// Appends one anonymous global slot with an initial value.
    pub fn slot(&mut self, init: EvalSlot) -> GlobalSlot {
        #[allow(clippy::cast_possible_truncation)]
        let slot = GlobalSlot::new(self.globals.len() as u16);
        self.globals.push(init);
        slot
    }

    /// Appends a named global. Vectors get three consecutive slots.
    pub fn global(&mut self, name: &str, kind: SlotKind, init: EvalSlot) -> GlobalSlot {
        let name = self.string(name);
        let slot = self.slot(init);
        for _ in 1..kind.width() {
            self.slot(EvalSlot::ZERO);
        }
        #[allow(clippy::cast_possible_truncation)]
        self.global_defs.push(Def {
            raw_type: Def::type_id(kind),
            offset: slot.index() as u16,
            name,
        });
        slot
    }

    /// Appends a named float global.
    pub fn global_float(&mut self, name: &str, value: f32) -> GlobalSlot {
        self.global(name, SlotKind::Float, EvalSlot::from_float(value))
    }

    /// Declares an entity field and returns its field offset in slots.
    pub fn field(&mut self, name: &str, kind: SlotKind) -> u16 {
        let name = self.string(name);
        let offset = self.entity_fields;
        #[allow(clippy::cast_possible_truncation)]
        {
            self.entity_fields += kind.width() as u16;
        }
        self.field_defs.push(Def {
            raw_type: Def::type_id(kind),
            offset,
            name,
        });
        offset
    }

    /// Declares an entity field and a global slot holding its offset,
    /// the form `LOAD_*` and `ADDRESS` operands expect.
    pub fn field_ref(&mut self, name: &str, kind: SlotKind) -> GlobalSlot {
        let offset = self.field(name, kind);
        self.slot(EvalSlot::from_bits(u32::from(offset)))
    }

    /// Emits one statement and returns its index.
    pub fn emit(&mut self, op: Opcode, a: i16, b: i16, c: i16) -> usize {
        self.statements.push(Statement {
            op: op.as_u16(),
            a,
            b,
            c,
        });
        self.statements.len() - 1
    }

    /// Index the next emitted statement will get.
    #[must_use]
    pub fn next_statement(&self) -> usize {
        self.statements.len()
    }

    /// Patches the branch operand of a previously emitted conditional or
    /// goto so it lands on `target`.
    ///
    /// # Panics
    /// Panics if `at` is not a branch statement or the offset overflows.
    pub fn patch_branch(&mut self, at: usize, target: usize) {
        let offset = i16::try_from(
            i64::try_from(target).expect("branch target") - i64::try_from(at).expect("branch site"),
        )
        .expect("branch offset fits i16");
        let st = &mut self.statements[at];
        match Opcode::from_u16(st.op) {
            Some(Opcode::Goto) => st.a = offset,
            Some(Opcode::If | Opcode::IfNot) => st.b = offset,
            _ => panic!("statement {at} is not a branch"),
        }
    }

    /// Registers a scripted function whose body starts at `first_statement`.
    ///
    /// # Panics
    /// Panics if more than eight parameters are given.
    pub fn function(
        &mut self,
        name: &str,
        first_statement: usize,
        parm_start: u16,
        locals: u16,
        parm_sizes: &[u8],
    ) -> FunctionId {
        assert!(parm_sizes.len() <= MAX_PARMS, "too many parameters");
        let name = self.string(name);
        let mut sizes = [0u8; MAX_PARMS];
        sizes[..parm_sizes.len()].copy_from_slice(parm_sizes);

        #[allow(clippy::cast_possible_truncation)]
        let id = FunctionId::new(self.functions.len() as u32);
        self.functions.push(FunctionDescriptor {
            first_statement: i32::try_from(first_statement).expect("statement index"),
            parm_start,
            locals,
            name,
            file: StringOffset::EMPTY,
            num_parms: parm_sizes.len() as u8,
            parm_sizes: sizes,
        });
        id
    }

    /// Registers a builtin stub under `id` (encoded as a negative entry).
    ///
    /// # Panics
    /// Panics if `id` is not positive.
    pub fn builtin(&mut self, name: &str, id: i32) -> FunctionId {
        assert!(id > 0, "builtin ids are positive");
        let name = self.string(name);
        #[allow(clippy::cast_possible_truncation)]
        let fid = FunctionId::new(self.functions.len() as u32);
        self.functions.push(FunctionDescriptor {
            first_statement: -id,
            parm_start: 0,
            locals: 0,
            name,
            file: StringOffset::EMPTY,
            num_parms: 0,
            parm_sizes: [0; MAX_PARMS],
        });
        fid
    }

    /// Serializes the image.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    pub fn build(&self) -> Vec<u8> {
        let statements: Vec<u8> = self.statements.iter().flat_map(|s| s.to_wire()).collect();
        let functions: Vec<u8> = self.functions.iter().flat_map(encode_function).collect();
        let global_defs: Vec<u8> = self.global_defs.iter().flat_map(encode_def).collect();
        let field_defs: Vec<u8> = self.field_defs.iter().flat_map(encode_def).collect();
        let globals: Vec<u8> = self
            .globals
            .iter()
            .flat_map(|slot| slot.bits().to_le_bytes())
            .collect();

        let mut ofs = HEADER_SIZE;
        let mut place = |section: &[u8]| {
            let at = ofs;
            ofs += section.len();
            at as i32
        };
        let ofs_statements = place(&statements);
        let ofs_functions = place(&functions);
        let ofs_strings = place(&self.strings);
        let ofs_globaldefs = place(&global_defs);
        let ofs_fielddefs = place(&field_defs);
        let ofs_globals = place(&globals);

        let header: [i32; 15] = [
            self.version as i32,
            i32::from(self.schema_crc),
            ofs_statements,
            self.statements.len() as i32,
            ofs_globaldefs,
            self.global_defs.len() as i32,
            ofs_fielddefs,
            self.field_defs.len() as i32,
            ofs_functions,
            self.functions.len() as i32,
            ofs_strings,
            self.strings.len() as i32,
            ofs_globals,
            self.globals.len() as i32,
            i32::from(self.entity_fields),
        ];

        let mut bytes = Vec::with_capacity(ofs);
        for word in header {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.extend_from_slice(&statements);
        bytes.extend_from_slice(&functions);
        bytes.extend_from_slice(&self.strings);
        bytes.extend_from_slice(&global_defs);
        bytes.extend_from_slice(&field_defs);
        bytes.extend_from_slice(&globals);
        bytes
    }
}

fn encode_function(f: &FunctionDescriptor) -> Vec<u8> {
    let mut out = Vec::with_capacity(FunctionDescriptor::WIRE_SIZE);
    out.extend_from_slice(&f.first_statement.to_le_bytes());
    out.extend_from_slice(&i32::from(f.parm_start).to_le_bytes());
    out.extend_from_slice(&i32::from(f.locals).to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    #[allow(clippy::cast_possible_wrap)]
    out.extend_from_slice(&(f.name.index() as i32).to_le_bytes());
    #[allow(clippy::cast_possible_wrap)]
    out.extend_from_slice(&(f.file.index() as i32).to_le_bytes());
    out.extend_from_slice(&i32::from(f.num_parms).to_le_bytes());
    out.extend_from_slice(&f.parm_sizes);
    out
}

fn encode_def(d: &Def) -> Vec<u8> {
    let mut out = Vec::with_capacity(Def::WIRE_SIZE);
    out.extend_from_slice(&d.raw_type.to_le_bytes());
    out.extend_from_slice(&d.offset.to_le_bytes());
    #[allow(clippy::cast_possible_wrap)]
    out.extend_from_slice(&(d.name.index() as i32).to_le_bytes());
    out
}
