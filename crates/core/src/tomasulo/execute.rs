//! Execution unit for compute operations.
//!
//! Loads and stores execute inside the memory system; everything else —
//! FP arithmetic, integer immediates, branches — counts down here, in the
//! stations themselves. Each tick runs two passes in a fixed order:
//!
//! 1. Countdown: every running timer decrements; a timer reaching zero
//!    computes its result from the captured operands and queues a broadcast
//!    eligible on the *next* cycle.
//! 2. Dispatch: every ready, not-yet-started station whose wake cycle is
//!    strictly before the current cycle starts executing. The strict
//!    comparison keeps issue and execution start in different cycles, and
//!    makes a station woken by this cycle's broadcast wait one more cycle.
//!
//! An op whose latency was never configured does not start; the unit warns
//! once per opcode and the engine carries on (the instruction will never
//! complete — a fatal misconfiguration by contract).

use std::collections::{BTreeMap, BTreeSet};

use log::warn;

use crate::isa::OpCode;

use super::cdb::{BroadcastRequest, CdbArbiter};
use super::pool::StationPool;
use super::station::StationId;

/// What one execution tick did, for timestamping by the engine.
#[derive(Debug, Default)]
pub struct ExecTick {
    /// Stations that began executing this cycle, with their instruction ids
    /// and configured latencies.
    pub started: Vec<(StationId, u32, u64)>,
    /// Stations whose countdown reached zero this cycle (broadcast queued
    /// for the next cycle), with their instruction ids.
    pub completed: Vec<(StationId, u32)>,
}

/// Per-opcode countdown management for compute stations.
pub struct ExecutionUnit {
    latencies: BTreeMap<OpCode, u64>,
    warned_missing: BTreeSet<OpCode>,
}

impl ExecutionUnit {
    /// Creates the unit with the configured per-opcode latencies.
    pub fn new(latencies: BTreeMap<OpCode, u64>) -> Self {
        Self {
            latencies,
            warned_missing: BTreeSet::new(),
        }
    }

    /// The configured latency for an opcode.
    pub fn latency(&self, op: OpCode) -> Option<u64> {
        self.latencies.get(&op).copied()
    }

    /// Runs one execution cycle over the pool.
    pub fn tick(&mut self, pool: &mut StationPool, cdb: &mut CdbArbiter, cycle: u64) -> ExecTick {
        let mut tick = ExecTick::default();

        // Countdown pass. A station at zero with exec_started is waiting for
        // its broadcast to fire and is left alone.
        for rs in pool.iter_mut() {
            if !rs.busy || rs.id.kind().is_memory() || !rs.exec_started || rs.remaining == 0 {
                continue;
            }
            rs.remaining -= 1;
            if rs.remaining == 0 {
                let op = match rs.op {
                    Some(op) => op,
                    None => continue,
                };
                let value = compute_result(op, rs.vj, rs.vk, rs.a, cycle);
                cdb.push(BroadcastRequest {
                    station: rs.id,
                    value,
                    dest: rs.dest,
                    op,
                    ready_cycle: cycle + 1,
                });
                tick.completed.push((rs.id, rs.instr.unwrap_or(0)));
            }
        }

        // Dispatch pass: start whatever became ready before this cycle.
        for rs in pool.iter_mut() {
            if rs.id.kind().is_memory() || !rs.is_ready() || rs.wake_cycle >= cycle {
                continue;
            }
            let op = match rs.op {
                Some(op) => op,
                None => continue,
            };
            match self.latencies.get(&op) {
                Some(&latency) => {
                    rs.exec_started = true;
                    rs.remaining = latency;
                    tick.started.push((rs.id, rs.instr.unwrap_or(0), latency));
                }
                None => {
                    if self.warned_missing.insert(op) {
                        warn!(
                            "execute: no latency configured for {}; {} will never start",
                            op, rs.id
                        );
                    }
                }
            }
        }

        tick
    }

    /// True when any compute station still has cycles to run.
    pub fn any_running(&self, pool: &StationPool) -> bool {
        pool.busy()
            .any(|rs| !rs.id.kind().is_memory() && rs.exec_started && rs.remaining > 0)
    }
}

/// Computes a completed operation's result from the captured operands.
fn compute_result(op: OpCode, vj: Option<f64>, vk: Option<f64>, a: Option<i32>, cycle: u64) -> f64 {
    let vj = vj.unwrap_or_default();
    let vk = vk.unwrap_or_default();
    match op {
        OpCode::AddD | OpCode::AddS => vj + vk,
        OpCode::SubD | OpCode::SubS => vj - vk,
        OpCode::MulD | OpCode::MulS => vj * vk,
        OpCode::DivD | OpCode::DivS => {
            if vk == 0.0 {
                warn!("execute: cycle {}: division by zero, yielding 0.0", cycle);
                0.0
            } else {
                vj / vk
            }
        }
        OpCode::Daddi => vj + a.unwrap_or(0) as f64,
        OpCode::Dsubi => vj - a.unwrap_or(0) as f64,
        // Branch comparison is deferred to resolution; the broadcast only
        // carries a token.
        OpCode::Beq | OpCode::Bne => 0.0,
        // Memory ops never reach the execution unit.
        _ => 0.0,
    }
}
