//! Common data bus and broadcast arbitration.
//!
//! A single bus carries at most one (tag, value, destination) broadcast per
//! cycle. Completed executions enqueue requests stamped with the cycle they
//! become eligible; the arbiter picks the earliest-enqueued eligible request
//! each cycle (first-come-first-serve) and defers the rest. A conflict is
//! never an error — deferral is logged and simulation proceeds.
//!
//! Broadcast application is a direct call into the register file and station
//! pool, in that order: register write (WAW-guarded), associative operand
//! forwarding, then release of the producing station. The freed station is
//! reusable by the issue stage in the same cycle.

use std::collections::VecDeque;

use log::{debug, warn};

use crate::common::RegName;
use crate::isa::OpCode;

use super::pool::StationPool;
use super::regfile::{CdbWriteOutcome, RegisterFile};
use super::station::StationId;

/// A pending result waiting for the bus.
#[derive(Clone, Debug)]
pub struct BroadcastRequest {
    /// Producing station; released when the broadcast fires.
    pub station: StationId,
    /// Result value.
    pub value: f64,
    /// Destination register, absent for stores and branches.
    pub dest: Option<RegName>,
    /// Producing opcode (branches get special handling at fire time).
    pub op: OpCode,
    /// First cycle this request may use the bus.
    pub ready_cycle: u64,
}

/// Result of one arbitration round.
#[derive(Debug, Default)]
pub struct Selection {
    /// The winning request, if any was eligible.
    pub fired: Option<BroadcastRequest>,
    /// Eligible requests pushed to a later cycle.
    pub deferred: usize,
}

/// FCFS arbiter over pending broadcast requests.
#[derive(Default)]
pub struct CdbArbiter {
    pending: VecDeque<BroadcastRequest>,
}

impl CdbArbiter {
    /// Creates an empty arbiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a completed result.
    pub fn push(&mut self, request: BroadcastRequest) {
        debug!(
            "cdb: queued {} -> {} (ready cycle {})",
            request.station,
            request
                .dest
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            request.ready_cycle
        );
        self.pending.push_back(request);
    }

    /// Picks the earliest-enqueued request eligible in `cycle`. Requests
    /// keep their enqueue order across deferrals, so ties on `ready_cycle`
    /// resolve first-come-first-serve.
    pub fn select(&mut self, cycle: u64) -> Selection {
        let winner = self
            .pending
            .iter()
            .position(|req| req.ready_cycle <= cycle);
        match winner {
            None => Selection::default(),
            Some(pos) => {
                let fired = self.pending.remove(pos);
                let deferred = self
                    .pending
                    .iter()
                    .filter(|req| req.ready_cycle <= cycle)
                    .count();
                if deferred > 0 {
                    warn!(
                        "cdb: cycle {}: {} eligible request(s) deferred (single bus)",
                        cycle, deferred
                    );
                }
                Selection { fired, deferred }
            }
        }
    }

    /// Drops pending requests from flushed stations.
    pub fn purge_stations(&mut self, stations: &[StationId]) {
        self.pending.retain(|req| !stations.contains(&req.station));
    }

    /// True when nothing is waiting for the bus.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Drops everything (engine reset).
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Effect of applying one broadcast, for logging and bookkeeping.
#[derive(Debug)]
pub struct BroadcastEffect {
    /// What happened at the destination register.
    pub register: CdbWriteOutcome,
    /// Stations whose operand slots were filled.
    pub forwarded: Vec<StationId>,
}

/// Fires a selected broadcast: WAW-guarded register write, associative
/// forwarding into every busy station, then release of the producer.
pub fn apply_broadcast(
    request: &BroadcastRequest,
    regs: &mut RegisterFile,
    pool: &mut StationPool,
    cycle: u64,
) -> BroadcastEffect {
    let register = regs.write_from_cdb(request.station, request.dest, request.value);
    if let CdbWriteOutcome::Superseded(by) = register {
        warn!(
            "cdb: cycle {}: {} write to {} superseded by {}",
            cycle,
            request.station,
            request
                .dest
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            by
        );
    }

    let mut forwarded = Vec::new();
    for rs in pool.iter_mut() {
        if rs.forward(request.station, request.value, cycle) {
            forwarded.push(rs.id);
        }
    }

    pool.release(request.station);
    BroadcastEffect {
        register,
        forwarded,
    }
}
