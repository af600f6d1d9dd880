//! The fetch-decode-execute interpreter.
//!
//! One [`Vm`] owns a loaded image and all mutable state: the global slot
//! array, the entity store, the call stack, the local arena, and the bound
//! builtin table. `execute` runs a single scripted function to completion.
//! A fault anywhere aborts that invocation: diagnostic context is captured
//! at the faulting statement, the call stack unwinds to depth 0, the arena
//! rewinds, and the fault propagates to the host. The VM itself stays
//! usable for the next invocation.

use progvm_foundation::{
    EntityOffset, EvalSlot, ExecResult, FaultContext, FaultKind, FunctionId, GlobalSlot,
    LoadError, StringOffset, VmFault,
};
use progvm_image::{BytecodeImage, FunctionDescriptor, Opcode, Statement};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::arena::LocalArena;
use crate::builtin::{BuiltinDef, BuiltinRegistry, DEFAULT_BUILTINS, RemapMode};
use crate::entity::EntityStore;
use crate::globals::Globals;
use crate::stack::{CallStack, StackFrame};
use crate::trace;

/// Default hard cap on allocated entity records.
pub const MAX_ENTITIES: usize = 1024;
/// Default call-stack depth bound.
pub const MAX_CALL_DEPTH: usize = 32;
/// Default local-arena capacity in slots.
pub const LOCAL_ARENA_SLOTS: usize = 2048;
/// Default per-invocation statement budget.
pub const RUNAWAY_LIMIT: u32 = 5_000_000;

/// Tunable limits and policies for a VM instance.
#[derive(Copy, Clone, Debug)]
pub struct VmConfig {
    /// Hard cap on entity records.
    pub max_entities: usize,
    /// Call-stack depth bound.
    pub max_call_depth: usize,
    /// Local-arena capacity in slots.
    pub local_arena_slots: usize,
    /// Statements one `execute` may run before faulting.
    pub runaway_limit: u32,
    /// How builtin ids are bound to host natives.
    pub remap: RemapMode,
    /// Seed for the deterministic `random()` stream.
    pub rng_seed: u64,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_entities: MAX_ENTITIES,
            max_call_depth: MAX_CALL_DEPTH,
            local_arena_slots: LOCAL_ARENA_SLOTS,
            runaway_limit: RUNAWAY_LIMIT,
            remap: RemapMode::default(),
            rng_seed: 0,
        }
    }
}

/// Field offsets the `STATE` opcode writes through, resolved by name.
#[derive(Copy, Clone, Debug)]
struct StateFields {
    nextthink: usize,
    frame: usize,
    think: usize,
}

impl StateFields {
    fn resolve(image: &BytecodeImage) -> Option<Self> {
        Some(Self {
            nextthink: usize::from(image.find_field("nextthink")?.offset),
            frame: usize::from(image.find_field("frame")?.offset),
            think: usize::from(image.find_field("think")?.offset),
        })
    }
}

/// A loaded image plus all of its live execution state.
#[derive(Debug)]
pub struct Vm {
    image: BytecodeImage,
    globals: Globals,
    entities: EntityStore,
    stack: CallStack,
    arena: LocalArena,
    builtins: BuiltinRegistry,
    state_fields: Option<StateFields>,
    current_function: usize,
    current_statement: i32,
    argc: usize,
    simulation_active: bool,
    runaway_limit: u32,
    profile: Vec<u32>,
    output: Vec<String>,
    rng: ChaCha8Rng,
}

impl Vm {
    /// Loads an image and binds the default builtin set.
    ///
    /// Returns the VM and the builtin-remap diagnostics.
    ///
    /// # Errors
    /// Returns a [`LoadError`] if the image is rejected.
    pub fn load(bytes: &[u8], config: VmConfig) -> Result<(Self, Vec<String>), LoadError> {
        Self::with_builtins(bytes, DEFAULT_BUILTINS, config)
    }

    /// Loads an image and binds a caller-supplied builtin set.
    ///
    /// # Errors
    /// Returns a [`LoadError`] if the image is rejected.
    pub fn with_builtins(
        bytes: &[u8],
        defs: &[BuiltinDef],
        config: VmConfig,
    ) -> Result<(Self, Vec<String>), LoadError> {
        let image = progvm_image::load(bytes)?;
        let (builtins, diagnostics) = BuiltinRegistry::remap(&image, defs, config.remap);
        let globals = Globals::new(&image.globals_init);
        let entities = EntityStore::new(image.entity_fields, config.max_entities);
        let state_fields = StateFields::resolve(&image);
        let profile = vec![0; image.functions.len()];

        Ok((
            Self {
                globals,
                entities,
                stack: CallStack::new(config.max_call_depth),
                arena: LocalArena::new(config.local_arena_slots),
                builtins,
                state_fields,
                current_function: 0,
                current_statement: 0,
                argc: 0,
                simulation_active: false,
                runaway_limit: config.runaway_limit,
                profile,
                output: Vec::new(),
                rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
                image,
            },
            diagnostics,
        ))
    }

    /// Runs a scripted function for an event involving `self_ent` and
    /// `other`, the usual host entry point.
    ///
    /// # Errors
    /// Propagates any [`VmFault`] raised while running.
    pub fn run(
        &mut self,
        self_ent: EntityOffset,
        other: EntityOffset,
        function: FunctionId,
    ) -> ExecResult<()> {
        self.globals.set_self(self_ent);
        self.globals.set_other(other);
        self.execute(function)
    }

    /// Runs a function to completion.
    ///
    /// # Errors
    /// On a fault, diagnostic context is attached, the call stack unwinds
    /// to depth 0, the arena rewinds fully, and the fault is returned. The
    /// VM remains usable.
    pub fn execute(&mut self, function: FunctionId) -> ExecResult<()> {
        match self.run_from(function) {
            Ok(()) => Ok(()),
            Err(mut fault) => {
                if fault.context.is_none() {
                    fault.context = Some(self.capture_context());
                }
                self.stack.clear();
                self.arena.rewind(0);
                self.current_function = 0;
                self.current_statement = 0;
                Err(fault)
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn run_from(&mut self, function: FunctionId) -> ExecResult<()> {
        let entry = self.descriptor(function)?;
        if let Some(id) = entry.builtin_id() {
            return self.call_builtin(id, function.index());
        }

        let exit_depth = self.stack.depth();
        let mut pc = self.enter_function(function)?;
        let mut budget = self.runaway_limit;

        loop {
            pc += 1;
            if budget == 0 {
                return Err(VmFault::new(FaultKind::RunawayLoop));
            }
            budget -= 1;

            let st = self.fetch(pc)?;
            self.current_statement = pc;
            if let Some(count) = self.profile.get_mut(self.current_function) {
                *count += 1;
            }

            let Some(op) = st.opcode() else {
                return Err(VmFault::new(FaultKind::BadOpcode(st.op)));
            };

            match op {
                Opcode::Done | Opcode::Return => {
                    let value = self.globals.get_vector(st.a_slot())?;
                    self.globals.set_return_vector(value);
                    let resume = self.leave_function()?;
                    if self.stack.depth() == exit_depth {
                        return Ok(());
                    }
                    pc = resume;
                }

                Opcode::MulF => self.binary_float(st, |a, b| a * b)?,
                Opcode::DivF => self.binary_float(st, |a, b| a / b)?,
                Opcode::AddF => self.binary_float(st, |a, b| a + b)?,
                Opcode::SubF => self.binary_float(st, |a, b| a - b)?,

                Opcode::MulV => {
                    let a = self.vector(st.a_slot())?;
                    let b = self.vector(st.b_slot())?;
                    let dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
                    self.globals.set(st.c_slot(), EvalSlot::from_float(dot))?;
                }
                Opcode::MulFv => {
                    let scale = self.globals.get(st.a_slot())?.float();
                    let v = self.vector(st.b_slot())?;
                    self.set_vector(st.c_slot(), [v[0] * scale, v[1] * scale, v[2] * scale])?;
                }
                Opcode::MulVf => {
                    let v = self.vector(st.a_slot())?;
                    let scale = self.globals.get(st.b_slot())?.float();
                    self.set_vector(st.c_slot(), [v[0] * scale, v[1] * scale, v[2] * scale])?;
                }
                Opcode::AddV => {
                    let a = self.vector(st.a_slot())?;
                    let b = self.vector(st.b_slot())?;
                    self.set_vector(st.c_slot(), [a[0] + b[0], a[1] + b[1], a[2] + b[2]])?;
                }
                Opcode::SubV => {
                    let a = self.vector(st.a_slot())?;
                    let b = self.vector(st.b_slot())?;
                    self.set_vector(st.c_slot(), [a[0] - b[0], a[1] - b[1], a[2] - b[2]])?;
                }

                Opcode::EqF => self.compare_float(st, |a, b| a == b)?,
                Opcode::NeF => self.compare_float(st, |a, b| a != b)?,
                Opcode::Le => self.compare_float(st, |a, b| a <= b)?,
                Opcode::Ge => self.compare_float(st, |a, b| a >= b)?,
                Opcode::Lt => self.compare_float(st, |a, b| a < b)?,
                Opcode::Gt => self.compare_float(st, |a, b| a > b)?,

                Opcode::EqV | Opcode::NeV => {
                    let a = self.vector(st.a_slot())?;
                    let b = self.vector(st.b_slot())?;
                    let equal = a[0] == b[0] && a[1] == b[1] && a[2] == b[2];
                    let result = if op == Opcode::EqV { equal } else { !equal };
                    self.globals.set(st.c_slot(), bool_slot(result))?;
                }
                Opcode::EqS | Opcode::NeS => {
                    let a = self.image.strings.get(self.globals.get(st.a_slot())?.string())?;
                    let b = self.image.strings.get(self.globals.get(st.b_slot())?.string())?;
                    let equal = a == b;
                    let result = if op == Opcode::EqS { equal } else { !equal };
                    self.globals.set(st.c_slot(), bool_slot(result))?;
                }
                Opcode::EqE | Opcode::EqFnc => {
                    let equal =
                        self.globals.get(st.a_slot())?.bits() == self.globals.get(st.b_slot())?.bits();
                    self.globals.set(st.c_slot(), bool_slot(equal))?;
                }
                Opcode::NeE | Opcode::NeFnc => {
                    let equal =
                        self.globals.get(st.a_slot())?.bits() == self.globals.get(st.b_slot())?.bits();
                    self.globals.set(st.c_slot(), bool_slot(!equal))?;
                }

                Opcode::LoadF
                | Opcode::LoadS
                | Opcode::LoadEnt
                | Opcode::LoadFld
                | Opcode::LoadFnc => {
                    let ent = self.globals.get(st.a_slot())?.entity();
                    let field = field_index(self.globals.get(st.b_slot())?)?;
                    let value = self.entities.field(ent, field)?;
                    self.globals.set(st.c_slot(), value)?;
                }
                Opcode::LoadV => {
                    let ent = self.globals.get(st.a_slot())?.entity();
                    let field = field_index(self.globals.get(st.b_slot())?)?;
                    let value = [
                        self.entities.field(ent, field)?,
                        self.entities.field(ent, field + 1)?,
                        self.entities.field(ent, field + 2)?,
                    ];
                    self.globals.set_vector(st.c_slot(), value)?;
                }

                Opcode::Address => {
                    let ent = self.globals.get(st.a_slot())?.entity();
                    if self.simulation_active && ent.is_world() {
                        return Err(VmFault::new(FaultKind::WorldMutation));
                    }
                    let field = field_index(self.globals.get(st.b_slot())?)?;
                    let addr = self.entities.address(ent, field)?;
                    self.globals.set(st.c_slot(), EvalSlot::from_entity(addr))?;
                }

                Opcode::StoreF
                | Opcode::StoreS
                | Opcode::StoreEnt
                | Opcode::StoreFld
                | Opcode::StoreFnc => {
                    let value = self.globals.get(st.a_slot())?;
                    self.globals.set(st.b_slot(), value)?;
                }
                Opcode::StoreV => {
                    let value = self.globals.get_vector(st.a_slot())?;
                    self.globals.set_vector(st.b_slot(), value)?;
                }

                Opcode::StorepF
                | Opcode::StorepS
                | Opcode::StorepEnt
                | Opcode::StorepFld
                | Opcode::StorepFnc => {
                    let value = self.globals.get(st.a_slot())?;
                    let addr = self.globals.get(st.b_slot())?.entity();
                    self.storep(addr, value)?;
                }
                Opcode::StorepV => {
                    let value = self.globals.get_vector(st.a_slot())?;
                    let addr = self.globals.get(st.b_slot())?.entity();
                    for (i, cell) in value.into_iter().enumerate() {
                        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
                        let at = EntityOffset::new(addr.bytes() + (i * 4) as i32);
                        self.storep(at, cell)?;
                    }
                }

                Opcode::NotF => {
                    let value = self.globals.get(st.a_slot())?.float();
                    self.globals.set(st.c_slot(), bool_slot(value == 0.0))?;
                }
                Opcode::NotV => {
                    let v = self.vector(st.a_slot())?;
                    let zero = v[0] == 0.0 && v[1] == 0.0 && v[2] == 0.0;
                    self.globals.set(st.c_slot(), bool_slot(zero))?;
                }
                Opcode::NotS => {
                    let ofs = self.globals.get(st.a_slot())?.string();
                    let empty = ofs == StringOffset::EMPTY || self.image.strings.get(ofs)?.is_empty();
                    self.globals.set(st.c_slot(), bool_slot(empty))?;
                }
                Opcode::NotEnt => {
                    let ent = self.globals.get(st.a_slot())?.entity();
                    self.globals.set(st.c_slot(), bool_slot(ent.is_world()))?;
                }
                Opcode::NotFnc => {
                    let id = self.globals.get(st.a_slot())?.function();
                    self.globals.set(st.c_slot(), bool_slot(id.is_null()))?;
                }

                Opcode::If => {
                    if !self.globals.get(st.a_slot())?.is_zero() {
                        pc += st.b_branch() - 1;
                    }
                }
                Opcode::IfNot => {
                    if self.globals.get(st.a_slot())?.is_zero() {
                        pc += st.b_branch() - 1;
                    }
                }
                Opcode::Goto => {
                    pc += st.a_branch() - 1;
                }

                Opcode::Call0
                | Opcode::Call1
                | Opcode::Call2
                | Opcode::Call3
                | Opcode::Call4
                | Opcode::Call5
                | Opcode::Call6
                | Opcode::Call7
                | Opcode::Call8 => {
                    self.argc = usize::from(op.call_arg_count().unwrap_or(0));
                    let id = self.globals.get(st.a_slot())?.function();
                    let callee = self.descriptor(id)?;
                    if let Some(builtin) = callee.builtin_id() {
                        self.call_builtin(builtin, id.index())?;
                    } else {
                        pc = self.enter_function(id)?;
                    }
                }

                Opcode::State => {
                    let frame = self.globals.get(st.a_slot())?;
                    let think = self.globals.get(st.b_slot())?;
                    self.apply_state(frame, think)?;
                }

                Opcode::And => {
                    let a = self.globals.get(st.a_slot())?.float();
                    let b = self.globals.get(st.b_slot())?.float();
                    self.globals.set(st.c_slot(), bool_slot(a != 0.0 && b != 0.0))?;
                }
                Opcode::Or => {
                    let a = self.globals.get(st.a_slot())?.float();
                    let b = self.globals.get(st.b_slot())?.float();
                    self.globals.set(st.c_slot(), bool_slot(a != 0.0 || b != 0.0))?;
                }
                #[allow(clippy::cast_possible_truncation)]
                Opcode::BitAnd => {
                    self.binary_float(st, |a, b| ((a as i32) & (b as i32)) as f32)?;
                }
                #[allow(clippy::cast_possible_truncation)]
                Opcode::BitOr => {
                    self.binary_float(st, |a, b| ((a as i32) | (b as i32)) as f32)?;
                }
            }
        }
    }

    /// Saves the callee's parameter/local region into the arena, pushes a
    /// frame for the caller, copies arguments into place, and returns the
    /// program counter positioned just before the entry statement.
    fn enter_function(&mut self, id: FunctionId) -> ExecResult<i32> {
        let f = self.descriptor(id)?;
        let Some(entry) = f.entry() else {
            return Err(VmFault::new(FaultKind::NullFunctionCall));
        };

        let start = usize::from(f.parm_start);
        let len = usize::from(f.locals);
        let mark = self.arena.mark();
        let save = self.arena.alloc(len)?;
        let current = self.globals.range(start, len)?;
        self.arena.slice_mut(save, len).copy_from_slice(current);

        self.stack.push(StackFrame {
            function: self.current_function,
            statement: self.current_statement,
            locals_slot: start,
            locals_start: save,
            locals_len: len,
            arena_mark: mark,
        })?;

        let mut dest = start;
        for p in 0..usize::from(f.num_parms) {
            let width = usize::from(f.parm_sizes[p]);
            let block = self.globals.parm_vector(p);
            for &cell in block.iter().take(width) {
                #[allow(clippy::cast_possible_truncation)]
                self.globals.set(GlobalSlot::new(dest as u16), cell)?;
                dest += 1;
            }
        }

        self.current_function = id.index();
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        let pc = entry as i32 - 1;
        Ok(pc)
    }

    /// Restores the caller's locals from the arena, rewinds to the entry
    /// mark, and returns the caller's resume statement.
    fn leave_function(&mut self) -> ExecResult<i32> {
        let frame = self.stack.pop()?;
        let saved = self.arena.slice(frame.locals_start, frame.locals_len);
        self.globals.write_range(frame.locals_slot, saved)?;
        self.arena.rewind(frame.arena_mark);
        self.current_function = frame.function;
        Ok(frame.statement)
    }

    fn call_builtin(&mut self, id: u32, function_index: usize) -> ExecResult<()> {
        #[allow(clippy::cast_possible_wrap)]
        let func = self
            .builtins
            .get(id)
            .ok_or_else(|| VmFault::new(FaultKind::BadBuiltinId(id as i32)))?;
        if let Some(count) = self.profile.get_mut(function_index) {
            *count += 1;
        }
        func(self)
    }

    fn apply_state(&mut self, frame: EvalSlot, think: EvalSlot) -> ExecResult<()> {
        let Some(fields) = self.state_fields else {
            return Err(VmFault::operand_out_of_range(
                "STATE without nextthink/frame/think fields",
            ));
        };
        let ent = self.globals.self_entity();
        if self.simulation_active && ent.is_world() {
            return Err(VmFault::new(FaultKind::WorldMutation));
        }
        let next = self.globals.time() + 0.1;
        self.entities
            .set_field(ent, fields.nextthink, EvalSlot::from_float(next))?;
        self.entities.set_field(ent, fields.frame, frame)?;
        self.entities.set_field(ent, fields.think, think)?;
        Ok(())
    }

    fn storep(&mut self, addr: EntityOffset, value: EvalSlot) -> ExecResult<()> {
        let (record, field) = self.entities.resolve(addr)?;
        if record == 0 && self.simulation_active {
            return Err(VmFault::new(FaultKind::WorldMutation));
        }
        let base = self.entities.offset_of(record);
        self.entities.set_field(base, field, value)
    }

    fn descriptor(&self, id: FunctionId) -> ExecResult<FunctionDescriptor> {
        if id.is_null() {
            return Err(VmFault::new(FaultKind::NullFunctionCall));
        }
        self.image
            .functions
            .get(id.index())
            .cloned()
            .ok_or_else(|| VmFault::new(FaultKind::NullFunctionCall))
    }

    fn fetch(&self, pc: i32) -> ExecResult<Statement> {
        usize::try_from(pc)
            .ok()
            .and_then(|at| self.image.statements.get(at))
            .copied()
            .ok_or_else(|| VmFault::new(FaultKind::ProgramCounterOutOfRange))
    }

    fn binary_float(&mut self, st: Statement, f: impl Fn(f32, f32) -> f32) -> ExecResult<()> {
        let a = self.globals.get(st.a_slot())?.float();
        let b = self.globals.get(st.b_slot())?.float();
        self.globals.set(st.c_slot(), EvalSlot::from_float(f(a, b)))
    }

    fn compare_float(&mut self, st: Statement, f: impl Fn(f32, f32) -> bool) -> ExecResult<()> {
        let a = self.globals.get(st.a_slot())?.float();
        let b = self.globals.get(st.b_slot())?.float();
        self.globals.set(st.c_slot(), bool_slot(f(a, b)))
    }

    fn vector(&self, slot: GlobalSlot) -> ExecResult<[f32; 3]> {
        let v = self.globals.get_vector(slot)?;
        Ok([v[0].float(), v[1].float(), v[2].float()])
    }

    fn set_vector(&mut self, slot: GlobalSlot, value: [f32; 3]) -> ExecResult<()> {
        self.globals.set_vector(
            slot,
            [
                EvalSlot::from_float(value[0]),
                EvalSlot::from_float(value[1]),
                EvalSlot::from_float(value[2]),
            ],
        )
    }

    fn capture_context(&self) -> FaultContext {
        let (function, file) = self
            .image
            .functions
            .get(self.current_function)
            .map_or((String::new(), String::new()), |f| {
                (
                    self.image.string_or_empty(f.name).to_string(),
                    self.image.string_or_empty(f.file).to_string(),
                )
            });
        let statement = usize::try_from(self.current_statement)
            .map_or_else(|_| "<no statement>".to_string(), |at| {
                trace::disassemble(&self.image, at)
            });
        let stack = self
            .stack
            .frames_innermost_first()
            .map(|frame| trace::frame_line(&self.image, frame.function, frame.statement))
            .collect();
        FaultContext {
            function,
            file,
            statement,
            stack,
        }
    }

    // Host surface.

    /// The loaded image.
    #[must_use]
    pub fn image(&self) -> &BytecodeImage {
        &self.image
    }

    /// The global slot array.
    #[must_use]
    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    /// Mutable access to the global slot array.
    pub fn globals_mut(&mut self) -> &mut Globals {
        &mut self.globals
    }

    /// The entity store.
    #[must_use]
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// Mutable access to the entity store.
    pub fn entities_mut(&mut self) -> &mut EntityStore {
        &mut self.entities
    }

    /// Looks up a scripted or builtin function by name.
    #[must_use]
    pub fn find_function(&self, name: &str) -> Option<FunctionId> {
        self.image.find_function(name)
    }

    /// Whether world-mutation guards are armed.
    #[must_use]
    pub fn simulation_active(&self) -> bool {
        self.simulation_active
    }

    /// Arms or disarms the world-mutation guards. Hosts leave this off
    /// during level setup, when scripts legitimately configure the world.
    pub fn set_simulation_active(&mut self, active: bool) {
        self.simulation_active = active;
    }

    /// Advances the simulation clock, deriving the tick duration from the
    /// previous time.
    pub fn set_time(&mut self, time: f32) {
        let previous = self.globals.time();
        self.globals.set_frametime(time - previous);
        self.globals.set_time(time);
    }

    /// Argument count of the builtin call in progress.
    #[must_use]
    pub fn arg_count(&self) -> usize {
        self.argc
    }

    /// Reads parameter block `n` as a float.
    #[must_use]
    pub fn parm_float(&self, n: usize) -> f32 {
        self.globals.parm(n).float()
    }

    /// Reads parameter block `n` as a vector.
    #[must_use]
    pub fn parm_vector3(&self, n: usize) -> [f32; 3] {
        let v = self.globals.parm_vector(n);
        [v[0].float(), v[1].float(), v[2].float()]
    }

    /// Reads parameter block `n` as an entity reference.
    #[must_use]
    pub fn parm_entity(&self, n: usize) -> EntityOffset {
        self.globals.parm(n).entity()
    }

    /// Reads parameter block `n` as a string.
    ///
    /// # Errors
    /// Faults if the slot does not hold a valid string offset.
    pub fn parm_string(&self, n: usize) -> ExecResult<String> {
        Ok(self.image.strings.get(self.globals.parm(n).string())?.to_string())
    }

    /// Writes a float into the return slots.
    pub fn return_float(&mut self, value: f32) {
        self.globals.set_return(EvalSlot::from_float(value));
    }

    /// Writes a vector into the return slots.
    pub fn return_vector(&mut self, value: [f32; 3]) {
        self.globals.set_return_vector([
            EvalSlot::from_float(value[0]),
            EvalSlot::from_float(value[1]),
            EvalSlot::from_float(value[2]),
        ]);
    }

    /// Interns `text` and writes its offset into the return slots.
    pub fn return_string(&mut self, text: &str) {
        let ofs = self.image.strings.intern(text);
        self.globals.set_return(EvalSlot::from_string(ofs));
    }

    /// Writes an entity reference into the return slots.
    pub fn return_entity(&mut self, ent: EntityOffset) {
        self.globals.set_return(EvalSlot::from_entity(ent));
    }

    /// Interns a string into the dynamic region.
    pub fn intern_string(&mut self, text: &str) -> StringOffset {
        self.image.strings.intern(text)
    }

    /// Resolves a string offset.
    ///
    /// # Errors
    /// Faults if the offset is invalid.
    pub fn get_string(&self, ofs: StringOffset) -> ExecResult<&str> {
        self.image.strings.get(ofs)
    }

    /// Allocates an entity at the current simulation time.
    ///
    /// # Errors
    /// Faults with `EntityLimitReached` at capacity.
    pub fn spawn_entity(&mut self) -> ExecResult<EntityOffset> {
        let time = self.globals.time();
        self.entities.spawn(time)
    }

    /// Frees an entity at the current simulation time.
    ///
    /// # Errors
    /// Faults with `WorldMutation` for the world record.
    pub fn free_entity(&mut self, ent: EntityOffset) -> ExecResult<()> {
        let time = self.globals.time();
        self.entities.free(ent, time)
    }

    /// Next value of the deterministic `random()` stream.
    pub fn random_float(&mut self) -> f32 {
        self.rng.gen_range(0.0f32..1.0)
    }

    /// Appends a line to the debug output.
    pub fn print_line(&mut self, line: String) {
        self.output.push(line);
    }

    /// Debug output accumulated so far.
    #[must_use]
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Takes the accumulated debug output, leaving it empty.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// Raw per-function statement counters, indexed like the function table.
    #[must_use]
    pub fn profile_counters(&self) -> &[u32] {
        &self.profile
    }

    /// Formatted per-function profile, busiest first.
    #[must_use]
    pub fn profile_report(&self) -> Vec<String> {
        trace::profile_report(&self.image, &self.profile)
    }
}

fn bool_slot(value: bool) -> EvalSlot {
    EvalSlot::from_float(if value { 1.0 } else { 0.0 })
}

fn field_index(value: EvalSlot) -> ExecResult<usize> {
    usize::try_from(value.int())
        .map_err(|_| VmFault::operand_out_of_range(format!("field offset {}", value.int())))
}
