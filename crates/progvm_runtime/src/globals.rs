//! The flat global slot array and the well-known-globals overlay.
//!
//! Every scripted value lives in one array of [`EvalSlot`] cells: compiled
//! constants, parameter-passing slots, function locals, and the handful of
//! well-known slots the host and scripts share. The overlay accessors below
//! read and write those reserved slots by role instead of by raw index.

use progvm_foundation::{EntityOffset, EvalSlot, ExecResult, GlobalSlot, VmFault};

/// Reserved slot offsets shared between host and image.
///
/// The layout is a compile-time contract; its CRC is the schema signature
/// checked at load. Slots 0 through 3 are scratch copied by `DONE`/`RETURN`,
/// the parameter block follows, then the overlay.
pub mod ofs {
    use progvm_foundation::GlobalSlot;

    /// First slot of the three-wide return-value block.
    pub const RETURN: GlobalSlot = GlobalSlot::new(1);
    /// First slot of the first parameter block.
    pub const PARM0: GlobalSlot = GlobalSlot::new(4);
    /// Slots per parameter block (every parameter gets vector width).
    pub const PARM_WIDTH: u16 = 3;
    /// Number of parameter blocks.
    pub const MAX_PARMS: usize = 8;
    /// The entity the current event is about.
    pub const SELF: GlobalSlot = GlobalSlot::new(28);
    /// The other entity involved in the current event.
    pub const OTHER: GlobalSlot = GlobalSlot::new(29);
    /// The world entity reference (always record 0).
    pub const WORLD: GlobalSlot = GlobalSlot::new(30);
    /// Simulation clock, in seconds.
    pub const TIME: GlobalSlot = GlobalSlot::new(31);
    /// Seconds covered by the current tick.
    pub const FRAMETIME: GlobalSlot = GlobalSlot::new(32);

    /// Slot of the `n`th parameter block.
    ///
    /// # Panics
    /// Panics if `n` is 8 or more.
    #[must_use]
    pub fn parm(n: usize) -> GlobalSlot {
        assert!(n < MAX_PARMS, "parameter index out of range");
        #[allow(clippy::cast_possible_truncation)]
        let blocks = n as u16;
        PARM0.offset(blocks * PARM_WIDTH)
    }
}

/// The global slot array.
///
/// Sized once from the image's initial globals and never resized. All
/// bytecode-operand access is bounds-checked here, centrally; the overlay
/// accessors index the loader-guaranteed reserved region directly.
#[derive(Clone, Debug)]
pub struct Globals {
    slots: Vec<EvalSlot>,
}

impl Globals {
    /// Copies the image's initial global values into a live array.
    #[must_use]
    pub fn new(init: &[EvalSlot]) -> Self {
        Self {
            slots: init.to_vec(),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the array is empty (never true for a loaded image).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reads one slot.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` if the slot is out of bounds.
    pub fn get(&self, slot: GlobalSlot) -> ExecResult<EvalSlot> {
        self.slots
            .get(slot.index())
            .copied()
            .ok_or_else(|| self.out_of_range(slot))
    }

    /// Writes one slot.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` if the slot is out of bounds.
    pub fn set(&mut self, slot: GlobalSlot, value: EvalSlot) -> ExecResult<()> {
        let len = self.slots.len();
        match self.slots.get_mut(slot.index()) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(VmFault::operand_out_of_range(format!(
                "global slot {} of {len}",
                slot.index()
            ))),
        }
    }

    /// Reads three consecutive slots as a vector.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` if any of the three is out of bounds.
    pub fn get_vector(&self, slot: GlobalSlot) -> ExecResult<[EvalSlot; 3]> {
        Ok([
            self.get(slot)?,
            self.get(slot.offset(1))?,
            self.get(slot.offset(2))?,
        ])
    }

    /// Writes three consecutive slots as a vector.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` if any of the three is out of bounds.
    pub fn set_vector(&mut self, slot: GlobalSlot, value: [EvalSlot; 3]) -> ExecResult<()> {
        self.set(slot, value[0])?;
        self.set(slot.offset(1), value[1])?;
        self.set(slot.offset(2), value[2])
    }

    /// Borrows a run of slots, for saving locals.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` if the run leaves the array.
    pub fn range(&self, start: usize, len: usize) -> ExecResult<&[EvalSlot]> {
        self.slots.get(start..start + len).ok_or_else(|| {
            VmFault::operand_out_of_range(format!(
                "global run {start}+{len} of {}",
                self.slots.len()
            ))
        })
    }

    /// Copies `values` into the run of slots starting at `start`.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` if the run leaves the array.
    pub fn write_range(&mut self, start: usize, values: &[EvalSlot]) -> ExecResult<()> {
        let total = self.slots.len();
        match self.slots.get_mut(start..start + values.len()) {
            Some(run) => {
                run.copy_from_slice(values);
                Ok(())
            }
            None => Err(VmFault::operand_out_of_range(format!(
                "global run {start}+{} of {total}",
                values.len()
            ))),
        }
    }

    fn out_of_range(&self, slot: GlobalSlot) -> VmFault {
        VmFault::operand_out_of_range(format!(
            "global slot {} of {}",
            slot.index(),
            self.slots.len()
        ))
    }

    // Overlay accessors. The loader guarantees the reserved region exists,
    // so these index directly.

    /// The entity the current event is about.
    #[must_use]
    pub fn self_entity(&self) -> EntityOffset {
        self.slots[ofs::SELF.index()].entity()
    }

    /// Sets the `self` overlay slot.
    pub fn set_self(&mut self, ent: EntityOffset) {
        self.slots[ofs::SELF.index()] = EvalSlot::from_entity(ent);
    }

    /// The other entity involved in the current event.
    #[must_use]
    pub fn other_entity(&self) -> EntityOffset {
        self.slots[ofs::OTHER.index()].entity()
    }

    /// Sets the `other` overlay slot.
    pub fn set_other(&mut self, ent: EntityOffset) {
        self.slots[ofs::OTHER.index()] = EvalSlot::from_entity(ent);
    }

    /// Current simulation time in seconds.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.slots[ofs::TIME.index()].float()
    }

    /// Advances the simulation clock.
    pub fn set_time(&mut self, time: f32) {
        self.slots[ofs::TIME.index()] = EvalSlot::from_float(time);
    }

    /// Seconds covered by the current tick.
    #[must_use]
    pub fn frametime(&self) -> f32 {
        self.slots[ofs::FRAMETIME.index()].float()
    }

    /// Sets the tick duration.
    pub fn set_frametime(&mut self, frametime: f32) {
        self.slots[ofs::FRAMETIME.index()] = EvalSlot::from_float(frametime);
    }

    /// First slot of the return-value block.
    #[must_use]
    pub fn return_value(&self) -> EvalSlot {
        self.slots[ofs::RETURN.index()]
    }

    /// The full three-slot return-value block.
    #[must_use]
    pub fn return_vector(&self) -> [EvalSlot; 3] {
        [
            self.slots[ofs::RETURN.index()],
            self.slots[ofs::RETURN.index() + 1],
            self.slots[ofs::RETURN.index() + 2],
        ]
    }

    /// Writes the first slot of the return-value block.
    pub fn set_return(&mut self, value: EvalSlot) {
        self.slots[ofs::RETURN.index()] = value;
    }

    /// Writes the full three-slot return-value block.
    pub fn set_return_vector(&mut self, value: [EvalSlot; 3]) {
        self.slots[ofs::RETURN.index()] = value[0];
        self.slots[ofs::RETURN.index() + 1] = value[1];
        self.slots[ofs::RETURN.index() + 2] = value[2];
    }

    /// Reads the first slot of parameter block `n`.
    #[must_use]
    pub fn parm(&self, n: usize) -> EvalSlot {
        self.slots[ofs::parm(n).index()]
    }

    /// Reads all three slots of parameter block `n`.
    #[must_use]
    pub fn parm_vector(&self, n: usize) -> [EvalSlot; 3] {
        let at = ofs::parm(n).index();
        [self.slots[at], self.slots[at + 1], self.slots[at + 2]]
    }

    /// Writes the first slot of parameter block `n`, zeroing the rest.
    pub fn set_parm(&mut self, n: usize, value: EvalSlot) {
        let at = ofs::parm(n).index();
        self.slots[at] = value;
        self.slots[at + 1] = EvalSlot::ZERO;
        self.slots[at + 2] = EvalSlot::ZERO;
    }

    /// Writes all three slots of parameter block `n`.
    pub fn set_parm_vector(&mut self, n: usize, value: [EvalSlot; 3]) {
        let at = ofs::parm(n).index();
        self.slots[at] = value[0];
        self.slots[at + 1] = value[1];
        self.slots[at + 2] = value[2];
    }
}
