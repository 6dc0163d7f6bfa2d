//! Architectural register file with renaming state.
//!
//! 64 registers (F0..F31, R0..R31), each holding an f64 value and an
//! optional `qi` tag naming the reservation station that will produce the
//! register's next value. The register alias table is kept inside the file
//! and mutated in lockstep with the `qi` fields, so the RAT is always
//! exactly `{ r -> t : qi(r) == Some(t) }`.
//!
//! Write-after-write discipline: `set_qi` overwrites unconditionally — a
//! later-issued instruction captures the name. When an older producer's
//! broadcast finally arrives, no register carries its tag any more, so the
//! write is skipped; the broadcast has been superseded.

use std::collections::BTreeMap;

use crate::common::reg::NUM_REGISTERS;
use crate::common::{RegName, SimError};

use super::station::StationId;

/// One architectural register.
#[derive(Clone, Copy, Debug, Default)]
pub struct Register {
    /// Current value; authoritative exactly when `qi` is `None`.
    pub value: f64,
    /// Tag of the station producing the next value, if any.
    pub qi: Option<StationId>,
}

/// What a CDB broadcast did to the destination register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CdbWriteOutcome {
    /// The destination's `qi` matched the broadcasting tag; value written.
    Written,
    /// The destination had no pending tag at all; value written anyway
    /// (tolerated degenerate case).
    WrittenUntagged,
    /// A later issue renamed the destination; the write was skipped.
    Superseded(StationId),
    /// The broadcast had no destination register (stores, branches).
    NoDestination,
}

/// The register file plus alias table.
pub struct RegisterFile {
    regs: [Register; NUM_REGISTERS],
    rat: BTreeMap<RegName, StationId>,
}

impl RegisterFile {
    /// Creates a file with every register zero and ready.
    pub fn new() -> Self {
        Self {
            regs: [Register::default(); NUM_REGISTERS],
            rat: BTreeMap::new(),
        }
    }

    /// Direct read of a register's state.
    pub fn get(&self, reg: RegName) -> Register {
        self.regs[reg.flat_index()]
    }

    /// The register's pending producer tag; `None` means the value is
    /// authoritative.
    pub fn status(&self, reg: RegName) -> Option<StationId> {
        self.regs[reg.flat_index()].qi
    }

    /// Reads a ready register's value; fails with [`SimError::RegisterBusy`]
    /// while a producer is pending.
    pub fn read_value(&self, reg: RegName) -> Result<f64, SimError> {
        let r = self.regs[reg.flat_index()];
        match r.qi {
            Some(tag) => Err(SimError::RegisterBusy {
                register: reg.to_string(),
                producer: tag.to_string(),
            }),
            None => Ok(r.value),
        }
    }

    /// Renames the register to a new producer, overwriting any prior tag.
    pub fn set_qi(&mut self, reg: RegName, tag: StationId) {
        self.regs[reg.flat_index()].qi = Some(tag);
        self.rat.insert(reg, tag);
    }

    /// Clears a register's tag without writing a value.
    pub fn clear_qi(&mut self, reg: RegName) {
        self.regs[reg.flat_index()].qi = None;
        self.rat.remove(&reg);
    }

    /// Applies a CDB broadcast to the file.
    ///
    /// Every register whose `qi` equals `tag` (normally just the
    /// destination) receives the value and drops its tag. If no register
    /// carried the tag, the destination is written only when it has no
    /// pending tag at all; a foreign tag means a later issue superseded
    /// this broadcast and the write is skipped.
    pub fn write_from_cdb(
        &mut self,
        tag: StationId,
        dest: Option<RegName>,
        value: f64,
    ) -> CdbWriteOutcome {
        let mut wrote = false;
        for idx in 0..NUM_REGISTERS {
            if self.regs[idx].qi == Some(tag) {
                self.regs[idx].value = value;
                self.regs[idx].qi = None;
                self.rat.remove(&RegName::from_flat_index(idx));
                wrote = true;
            }
        }
        match dest {
            None => CdbWriteOutcome::NoDestination,
            Some(_) if wrote => CdbWriteOutcome::Written,
            Some(d) => match self.regs[d.flat_index()].qi {
                None => {
                    self.regs[d.flat_index()].value = value;
                    CdbWriteOutcome::WrittenUntagged
                }
                Some(other) => CdbWriteOutcome::Superseded(other),
            },
        }
    }

    /// Applies user preloads; names were validated at parse time, values
    /// overwrite whatever is present.
    pub fn preload(&mut self, values: &BTreeMap<RegName, f64>) {
        for (&reg, &value) in values {
            self.regs[reg.flat_index()].value = value;
        }
    }

    /// Zeroes every register and clears all renaming state.
    pub fn reset(&mut self) {
        self.regs = [Register::default(); NUM_REGISTERS];
        self.rat.clear();
    }

    /// The alias table view: exactly the non-`None` `qi` fields.
    pub fn rat(&self) -> &BTreeMap<RegName, StationId> {
        &self.rat
    }

    /// Snapshot of every register in flat-index order (F0..F31, R0..R31).
    pub fn snapshots(&self) -> Vec<(RegName, Register)> {
        (0..NUM_REGISTERS)
            .map(|idx| (RegName::from_flat_index(idx), self.regs[idx]))
            .collect()
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}
