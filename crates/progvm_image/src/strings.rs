//! The string table: an immutable blob plus an append-only extension.
//!
//! The base blob comes straight from the image and never changes. Strings
//! created at runtime (`ftos`, `vtos`, and friends) are appended to a
//! dynamic extension region whose offsets continue past the base. Offsets
//! are stable for the lifetime of the VM instance: nothing is ever freed
//! or compacted. That leak is the original design's accepted trade-off;
//! scripts may depend on string identity across calls, so it is preserved
//! rather than fixed.

use progvm_foundation::{ExecResult, StringOffset, VmFault};

/// NUL-terminated string storage with stable offsets.
#[derive(Clone, Debug)]
pub struct StringTable {
    /// Blob loaded from the image. Offset 0 is always the empty string.
    base: Vec<u8>,
    /// Runtime-interned extension; offsets continue past `base`.
    dynamic: Vec<u8>,
}

impl StringTable {
    /// Wraps a loaded blob. The loader guarantees NUL termination.
    #[must_use]
    pub fn from_blob(base: Vec<u8>) -> Self {
        Self {
            base,
            dynamic: Vec::new(),
        }
    }

    /// Returns the string starting at `ofs`, up to its NUL terminator.
    ///
    /// # Errors
    /// Faults with `OperandOutOfRange` if the offset lies outside both
    /// regions or the bytes are not valid UTF-8.
    pub fn get(&self, ofs: StringOffset) -> ExecResult<&str> {
        let index = ofs.index();
        let region = if index < self.base.len() {
            &self.base[index..]
        } else if index - self.base.len() < self.dynamic.len() {
            &self.dynamic[index - self.base.len()..]
        } else {
            return Err(VmFault::operand_out_of_range(format!(
                "string offset {index} of {}",
                self.len()
            )));
        };

        let terminated = match region.iter().position(|&b| b == 0) {
            Some(nul) => &region[..nul],
            None => region,
        };
        std::str::from_utf8(terminated).map_err(|_| {
            VmFault::operand_out_of_range(format!("non-utf8 string at offset {index}"))
        })
    }

    /// Appends `text` (NUL-terminated) to the dynamic region and returns
    /// its offset. Repeated interns of equal text return distinct offsets;
    /// equality between dynamic strings is by content (`EQ_S`), never by
    /// offset.
    pub fn intern(&mut self, text: &str) -> StringOffset {
        let ofs = self.len();
        self.dynamic.extend_from_slice(text.as_bytes());
        self.dynamic.push(0);
        #[allow(clippy::cast_possible_truncation)]
        let ofs = ofs as u32;
        StringOffset::new(ofs)
    }

    /// Total bytes across both regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.base.len() + self.dynamic.len()
    }

    /// Returns true if the table holds no bytes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the immutable base blob.
    #[must_use]
    pub fn base_len(&self) -> usize {
        self.base.len()
    }
}
