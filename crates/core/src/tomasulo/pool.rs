//! Typed banks of reservation stations.
//!
//! Allocation is deterministic: the lowest-ordinal idle station of a bank is
//! handed out first, so station naming in logs and snapshots is stable for a
//! given program and configuration.

use std::collections::BTreeMap;

use crate::common::SimError;
use crate::config::StationCounts;

use super::station::{ReservationStation, StationId, StationKind, StationSnapshot};

/// All reservation stations, grouped by kind.
pub struct StationPool {
    banks: BTreeMap<StationKind, Vec<ReservationStation>>,
}

impl StationPool {
    /// Creates the banks described by the configuration.
    pub fn new(counts: &StationCounts) -> Self {
        let mut banks = BTreeMap::new();
        for kind in StationKind::ALL {
            let count = Self::count_for(counts, kind);
            let stations = (1..=count)
                .map(|ordinal| ReservationStation::new(StationId::new(kind, ordinal as u8)))
                .collect();
            banks.insert(kind, stations);
        }
        Self { banks }
    }

    fn count_for(counts: &StationCounts, kind: StationKind) -> usize {
        match kind {
            StationKind::FpAdd => counts.fp_add,
            StationKind::FpMul => counts.fp_mul,
            StationKind::FpDiv => counts.fp_div,
            StationKind::IntAdd => counts.int_add,
            StationKind::Load => counts.load,
            StationKind::Store => counts.store,
            StationKind::Branch => counts.branch,
        }
    }

    /// True when the bank has an idle station.
    pub fn has_free(&self, kind: StationKind) -> bool {
        self.banks[&kind].iter().any(|rs| !rs.busy)
    }

    /// Hands out the lowest-ordinal idle station of the bank, or `None` on a
    /// structural hazard.
    pub fn allocate(&mut self, kind: StationKind) -> Option<&mut ReservationStation> {
        self.banks
            .get_mut(&kind)
            .and_then(|bank| bank.iter_mut().find(|rs| !rs.busy))
    }

    /// Looks up a station by id.
    pub fn get(&self, id: StationId) -> Option<&ReservationStation> {
        let slot = (id.ordinal() as usize).checked_sub(1)?;
        self.banks[&id.kind()].get(slot).filter(|rs| rs.id == id)
    }

    /// Looks up a station by id, mutably.
    pub fn get_mut(&mut self, id: StationId) -> Option<&mut ReservationStation> {
        let slot = (id.ordinal() as usize).checked_sub(1)?;
        self.banks
            .get_mut(&id.kind())
            .and_then(|bank| bank.get_mut(slot))
            .filter(|rs| rs.id == id)
    }

    /// Clears the station; it is immediately reusable.
    pub fn release(&mut self, id: StationId) {
        if let Some(rs) = self.get_mut(id) {
            rs.clear();
        }
    }

    /// Iterates every station in bank order.
    pub fn iter(&self) -> impl Iterator<Item = &ReservationStation> {
        self.banks.values().flat_map(|bank| bank.iter())
    }

    /// Iterates every station mutably, in bank order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ReservationStation> {
        self.banks.values_mut().flat_map(|bank| bank.iter_mut())
    }

    /// Busy stations, in bank order.
    pub fn busy(&self) -> impl Iterator<Item = &ReservationStation> {
        self.iter().filter(|rs| rs.busy)
    }

    /// True when no station is occupied.
    pub fn all_idle(&self) -> bool {
        self.iter().all(|rs| !rs.busy)
    }

    /// Re-creates the banks with new counts. Only legal while every station
    /// is idle (user reconfiguration or engine reset).
    pub fn reconfigure(&mut self, counts: &StationCounts) -> Result<(), SimError> {
        if !self.all_idle() {
            return Err(SimError::InvalidConfiguration(
                "cannot reconfigure stations while any is busy".to_string(),
            ));
        }
        *self = StationPool::new(counts);
        Ok(())
    }

    /// Clears every station.
    pub fn reset(&mut self) {
        for rs in self.iter_mut() {
            rs.clear();
        }
    }

    /// Observable state of every station, in bank order.
    pub fn snapshots(&self) -> Vec<StationSnapshot> {
        self.iter().map(|rs| rs.snapshot()).collect()
    }
}
