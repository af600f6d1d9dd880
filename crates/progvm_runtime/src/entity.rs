//! The fixed-stride entity store.
//!
//! Entities are records in one contiguous slot array. Every record has the
//! same stride: a fixed header (free flag, free time, two reserved slots)
//! followed by the image-declared field slots. Scripts hold entity
//! references as byte offsets of a record's base, so reference arithmetic
//! is `index * stride` in both directions and a reference of 0 is always
//! the world.
//!
//! Record 0, the world, is allocated at construction and can never be
//! freed. Freed records keep their slot storage; a short reuse delay keeps
//! references from landing on a recycled record within the same event.

use progvm_foundation::{EntityOffset, EvalSlot, ExecResult, FaultKind, VmFault};
use progvm_image::{ENTITY_HEADER_SLOTS, SLOT_BYTES};

const FREE_FLAG: usize = 0;
const FREE_TIME: usize = 1;

/// Seconds a freed record stays unavailable for reuse.
const REUSE_DELAY: f32 = 0.5;
/// Records freed this early in a session are reusable immediately.
const STARTUP_WINDOW: f32 = 2.0;

/// Flat storage for all entity records.
#[derive(Clone, Debug)]
pub struct EntityStore {
    slots: Vec<EvalSlot>,
    field_slots: usize,
    stride_slots: usize,
    max_entities: usize,
}

impl EntityStore {
    /// Creates a store for records of `field_slots` declared fields and
    /// allocates the world record.
    #[must_use]
    pub fn new(field_slots: usize, max_entities: usize) -> Self {
        let stride_slots = ENTITY_HEADER_SLOTS + field_slots;
        Self {
            slots: vec![EvalSlot::ZERO; stride_slots],
            field_slots,
            stride_slots,
            max_entities,
        }
    }

    /// Number of allocated records, the world included.
    #[must_use]
    pub fn count(&self) -> usize {
        self.slots.len() / self.stride_slots
    }

    /// Hard record capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_entities
    }

    /// Declared field slots per record.
    #[must_use]
    pub fn field_slots(&self) -> usize {
        self.field_slots
    }

    /// Record stride in bytes.
    #[must_use]
    pub fn stride_bytes(&self) -> usize {
        self.stride_slots * SLOT_BYTES
    }

    /// The reference for record `index`.
    ///
    /// # Panics
    /// Panics if the byte offset overflows an `i32`; capacity bounds keep
    /// this unreachable for configured stores.
    #[must_use]
    pub fn offset_of(&self, index: usize) -> EntityOffset {
        EntityOffset::new(
            i32::try_from(index * self.stride_bytes()).expect("entity offset overflow"),
        )
    }

    /// Resolves a record reference back to its index.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` if the reference is negative, not on
    /// a record boundary, or beyond the allocated records.
    pub fn index_of(&self, ent: EntityOffset) -> ExecResult<usize> {
        let stride = self.stride_bytes();
        let bytes = usize::try_from(ent.bytes())
            .map_err(|_| self.bad_reference(ent))?;
        if bytes % stride != 0 {
            return Err(self.bad_reference(ent));
        }
        let index = bytes / stride;
        if index >= self.count() {
            return Err(self.bad_reference(ent));
        }
        Ok(index)
    }

    /// Returns true if record `index` is on the free list.
    #[must_use]
    pub fn is_free(&self, index: usize) -> bool {
        !self.slots[index * self.stride_slots + FREE_FLAG].is_zero()
    }

    /// Allocates a record: reuses the lowest eligible freed record, else
    /// grows the store.
    ///
    /// Freed records become eligible after [`REUSE_DELAY`] seconds, except
    /// during the first [`STARTUP_WINDOW`] seconds of the clock, when churn
    /// from level setup may recycle immediately.
    ///
    /// # Errors
    /// Faults with `EntityLimitReached` at the record capacity.
    pub fn spawn(&mut self, time: f32) -> ExecResult<EntityOffset> {
        for index in 1..self.count() {
            if !self.is_free(index) {
                continue;
            }
            let freed_at = self.slots[index * self.stride_slots + FREE_TIME].float();
            if freed_at < STARTUP_WINDOW || time - freed_at > REUSE_DELAY {
                let base = index * self.stride_slots;
                self.slots[base..base + self.stride_slots].fill(EvalSlot::ZERO);
                return Ok(self.offset_of(index));
            }
        }

        if self.count() >= self.max_entities {
            return Err(VmFault::new(FaultKind::EntityLimitReached));
        }
        let index = self.count();
        self.slots
            .resize(self.slots.len() + self.stride_slots, EvalSlot::ZERO);
        Ok(self.offset_of(index))
    }

    /// Frees a record: zeroes its fields and stamps the free time.
    ///
    /// # Errors
    /// Faults with `WorldMutation` for the world record, or
    /// `OperandOutOfRange` for a bad reference.
    pub fn free(&mut self, ent: EntityOffset, time: f32) -> ExecResult<()> {
        let index = self.index_of(ent)?;
        if index == 0 {
            return Err(VmFault::new(FaultKind::WorldMutation));
        }
        let base = index * self.stride_slots;
        self.slots[base..base + self.stride_slots].fill(EvalSlot::ZERO);
        self.slots[base + FREE_FLAG] = EvalSlot::from_float(1.0);
        self.slots[base + FREE_TIME] = EvalSlot::from_float(time);
        Ok(())
    }

    /// Reads one declared field cell of a record.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` for a bad reference or field offset.
    pub fn field(&self, ent: EntityOffset, field: usize) -> ExecResult<EvalSlot> {
        Ok(self.slots[self.cell(ent, field)?])
    }

    /// Writes one declared field cell of a record.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` for a bad reference or field offset.
    pub fn set_field(&mut self, ent: EntityOffset, field: usize, value: EvalSlot) -> ExecResult<()> {
        let cell = self.cell(ent, field)?;
        self.slots[cell] = value;
        Ok(())
    }

    /// Computes the byte address of a field cell, the value `ADDRESS`
    /// leaves behind for a later `STOREP_*`.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` for a bad reference or field offset.
    pub fn address(&self, ent: EntityOffset, field: usize) -> ExecResult<EntityOffset> {
        let cell = self.cell(ent, field)?;
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        let bytes = (cell * SLOT_BYTES) as i32;
        Ok(EntityOffset::new(bytes))
    }

    /// Resolves a field-cell byte address to `(record index, field offset)`.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` if the address is unaligned, lands
    /// in a record header, or lies outside the allocated records.
    pub fn resolve(&self, addr: EntityOffset) -> ExecResult<(usize, usize)> {
        let stride = self.stride_bytes();
        let bytes = usize::try_from(addr.bytes()).map_err(|_| self.bad_address(addr))?;
        if bytes % SLOT_BYTES != 0 {
            return Err(self.bad_address(addr));
        }
        let index = bytes / stride;
        if index >= self.count() {
            return Err(self.bad_address(addr));
        }
        let slot_in_record = (bytes % stride) / SLOT_BYTES;
        if slot_in_record < ENTITY_HEADER_SLOTS {
            return Err(self.bad_address(addr));
        }
        Ok((index, slot_in_record - ENTITY_HEADER_SLOTS))
    }

    /// Reads the cell a field address points at.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` for a bad address.
    pub fn read_addr(&self, addr: EntityOffset) -> ExecResult<EvalSlot> {
        let (index, field) = self.resolve(addr)?;
        self.field(self.offset_of(index), field)
    }

    /// Writes the cell a field address points at.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` for a bad address.
    pub fn write_addr(&mut self, addr: EntityOffset, value: EvalSlot) -> ExecResult<()> {
        let (index, field) = self.resolve(addr)?;
        self.set_field(self.offset_of(index), field, value)
    }

    fn cell(&self, ent: EntityOffset, field: usize) -> ExecResult<usize> {
        let index = self.index_of(ent)?;
        if field >= self.field_slots {
            return Err(VmFault::operand_out_of_range(format!(
                "entity field {field} of {}",
                self.field_slots
            )));
        }
        Ok(index * self.stride_slots + ENTITY_HEADER_SLOTS + field)
    }

    fn bad_reference(&self, ent: EntityOffset) -> VmFault {
        VmFault::operand_out_of_range(format!(
            "entity reference {} ({} records of {} bytes)",
            ent.bytes(),
            self.count(),
            self.stride_bytes()
        ))
    }

    fn bad_address(&self, addr: EntityOffset) -> VmFault {
        VmFault::operand_out_of_range(format!(
            "field address {} ({} records of {} bytes)",
            addr.bytes(),
            self.count(),
            self.stride_bytes()
        ))
    }
}
