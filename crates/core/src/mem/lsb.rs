//! Load/store buffer: in-order queue of in-flight memory operations.
//!
//! Entries carry a monotonic `seq` and tick down a frozen latency. Program
//! order over overlapping addresses is enforced by stalling: an entry only
//! counts down when no earlier still-queued entry touches an overlapping byte
//! range. An entry whose counter reaches zero leaves the buffer that same
//! tick; entries behind it that were only blocked by it start counting on the
//! same tick, which keeps a store-then-load pair to one address strictly
//! ordered without a dead cycle in between.

use crate::common::{RegName, SimError};
use crate::isa::OpCode;
use crate::tomasulo::station::StationId;

/// One in-flight memory operation.
#[derive(Clone, Debug)]
pub struct LsbEntry {
    /// Monotonic sequence number; smaller means earlier in program order.
    pub seq: u32,
    /// The memory opcode.
    pub op: OpCode,
    /// Effective byte address.
    pub address: u32,
    /// Store data (register-file representation); unused for loads.
    pub value: f64,
    /// Cycles left before the operation commits.
    pub remaining: u64,
    /// True for loads.
    pub is_load: bool,
    /// Destination register for loads.
    pub dest: Option<RegName>,
    /// Reservation station that owns this operation.
    pub station: StationId,
}

impl LsbEntry {
    fn range(&self) -> (u32, u32) {
        let size = self.op.mem_access_size().max(1);
        (self.address, self.address + size - 1)
    }

    fn overlaps(&self, other: &LsbEntry) -> bool {
        let (a_start, a_end) = self.range();
        let (b_start, b_end) = other.range();
        a_start <= b_end && b_start <= a_end
    }
}

/// Bounded, in-order buffer of in-flight memory operations.
pub struct LoadStoreBuffer {
    entries: Vec<LsbEntry>,
    next_seq: u32,
    capacity: usize,
}

impl LoadStoreBuffer {
    /// Creates an empty buffer holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            next_seq: 1,
            capacity,
        }
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no more operations can be accepted.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn push(&mut self, entry: LsbEntry) -> Result<u32, SimError> {
        if self.is_full() {
            return Err(SimError::StructuralHazard(
                "load/store buffer is full".to_string(),
            ));
        }
        let seq = entry.seq;
        self.entries.push(entry);
        Ok(seq)
    }

    /// Queues a load with its latency frozen by the caller.
    pub fn push_load(
        &mut self,
        op: OpCode,
        address: u32,
        latency: u64,
        dest: Option<RegName>,
        station: StationId,
    ) -> Result<u32, SimError> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.push(LsbEntry {
            seq,
            op,
            address,
            value: 0.0,
            remaining: latency,
            is_load: true,
            dest,
            station,
        })
    }

    /// Queues a store with its latency frozen by the caller.
    pub fn push_store(
        &mut self,
        op: OpCode,
        address: u32,
        value: f64,
        latency: u64,
        station: StationId,
    ) -> Result<u32, SimError> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.push(LsbEntry {
            seq,
            op,
            address,
            value,
            remaining: latency,
            is_load: false,
            dest: None,
            station,
        })
    }

    /// Advances every unblocked entry by one cycle and removes the ones that
    /// reached zero. Returned entries are in `seq` order; the caller commits
    /// them against the cache.
    pub fn tick(&mut self) -> Vec<LsbEntry> {
        let mut completed = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            let blocked = self.entries[..i]
                .iter()
                .any(|earlier| earlier.overlaps(&self.entries[i]));
            if blocked {
                i += 1;
                continue;
            }
            let entry = &mut self.entries[i];
            entry.remaining = entry.remaining.saturating_sub(1);
            if entry.remaining == 0 {
                completed.push(self.entries.remove(i));
            } else {
                i += 1;
            }
        }
        completed
    }

    /// Removes every entry owned by one of the given stations (branch flush).
    pub fn purge_stations(&mut self, stations: &[StationId]) {
        self.entries.retain(|e| !stations.contains(&e.station));
    }

    /// Queued entries, earliest first, for display.
    pub fn entries(&self) -> &[LsbEntry] {
        &self.entries
    }

    /// Drops every entry and restarts the sequence counter.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_seq = 1;
    }
}
