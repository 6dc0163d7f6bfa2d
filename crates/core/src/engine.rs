//! The cycle engine: per-cycle phase ordering and whole-run bookkeeping.
//!
//! One engine instance owns every component and steps them in a strict
//! order each cycle:
//!
//! 1. **Write:** the CDB arbiter fires at most one broadcast; branch
//!    producers are resolved (taken branches flush and redirect the cursor).
//! 2. **Execute:** compute-station countdowns tick; ready stations start.
//! 3. **Memory:** the load/store buffer ticks; finished loads queue
//!    broadcasts for the next cycle, finished stores finalize silently.
//! 4. **Re-dispatch:** memory stations whose operands arrived via this
//!    cycle's broadcast are handed to the memory system.
//! 5. **Issue:** exactly the cursor instruction is considered.
//!
//! Write-before-Issue means a station freed by a broadcast in cycle N is
//! available to the issue stage in the same cycle N; Issue-after-Execute
//! (plus the stations' wake-cycle guard) means nothing begins executing in
//! its issue cycle.
//!
//! The engine tracks per-instruction timestamps (issue, exec start/end,
//! write), run statistics, and a bounded, cycle-stamped event log that
//! drivers may drain between cycles.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::common::{RegName, SimError};
use crate::config::Config;
use crate::isa::{Instruction, OpCode};
use crate::mem::{CacheLineSnapshot, CacheStats, LsbEntry, MemorySystem};
use crate::stats::SimStats;
use crate::tomasulo::cdb::{apply_broadcast, BroadcastRequest, CdbArbiter};
use crate::tomasulo::execute::ExecutionUnit;
use crate::tomasulo::issue::{IssueOutcome, IssueUnit, StallReason};
use crate::tomasulo::pool::StationPool;
use crate::tomasulo::regfile::{CdbWriteOutcome, Register, RegisterFile};
use crate::tomasulo::station::{StationId, StationSnapshot};

/// Pipeline timestamps of one instruction, filled in as the run progresses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstrTiming {
    /// Cycle the instruction entered its station.
    pub issue: Option<u64>,
    /// Cycle execution began (for memory ops: the first countdown cycle).
    pub exec_start: Option<u64>,
    /// Cycle the countdown reached zero (memory ops: the commit cycle).
    pub exec_end: Option<u64>,
    /// Cycle the result crossed the CDB (stores: the commit cycle).
    pub write: Option<u64>,
}

/// Everything the branch-resolution path needs, captured before the
/// producing station is released by the broadcast.
struct BranchInfo {
    instr: Option<u32>,
    vj: f64,
    vk: f64,
    target: i32,
    issue_cycle: u64,
}

const EVENT_LOG_CAP: usize = 1000;

/// The simulator: all components plus per-run bookkeeping.
pub struct CycleEngine {
    config: Config,
    regs: RegisterFile,
    pool: StationPool,
    exec: ExecutionUnit,
    cdb: CdbArbiter,
    mem: MemorySystem,
    issue: IssueUnit,
    cycle: u64,
    complete: bool,
    timing: BTreeMap<u32, InstrTiming>,
    stats: SimStats,
    events: Vec<String>,
    preloads: BTreeMap<RegName, f64>,
}

impl CycleEngine {
    /// Builds an engine over a validated configuration and a normalized
    /// program. An invalid configuration is rejected here; the engine never
    /// steps with one.
    pub fn new(config: Config, program: Vec<Instruction>) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            regs: RegisterFile::new(),
            pool: StationPool::new(&config.stations),
            exec: ExecutionUnit::new(config.latencies.clone()),
            cdb: CdbArbiter::new(),
            mem: MemorySystem::new(&config),
            issue: IssueUnit::new(program),
            cycle: 0,
            complete: false,
            timing: BTreeMap::new(),
            stats: SimStats::default(),
            events: Vec::new(),
            preloads: BTreeMap::new(),
            config,
        })
    }

    /// Sets register preloads; applied now and re-applied on reset.
    pub fn preload_registers(&mut self, values: BTreeMap<RegName, f64>) {
        self.regs.preload(&values);
        self.preloads.extend(values);
    }

    /// The composed memory system, for preloading and inspecting memory.
    pub fn memory(&self) -> &MemorySystem {
        &self.mem
    }

    /// Mutable access to the memory system (test data setup).
    pub fn memory_mut(&mut self) -> &mut MemorySystem {
        &mut self.mem
    }

    /// Executes one full cycle. A completed simulation is a no-op.
    pub fn step(&mut self) -> Result<(), SimError> {
        if self.complete {
            return Ok(());
        }
        self.cycle += 1;
        self.stats.cycles = self.cycle;
        let c = self.cycle;

        self.write_phase(c)?;
        self.execute_phase(c);
        self.memory_phase(c)?;
        self.redispatch_phase(c)?;
        self.issue_phase(c)?;
        self.check_termination(c);
        Ok(())
    }

    /// Steps until the termination predicate holds. Fails with
    /// [`SimError::NonTerminating`] once the configured cycle ceiling is
    /// crossed. Returns the final cycle count.
    pub fn run(&mut self) -> Result<u64, SimError> {
        while !self.complete {
            if self.cycle >= self.config.max_cycles {
                return Err(SimError::NonTerminating { cycles: self.cycle });
            }
            self.step()?;
        }
        Ok(self.cycle)
    }

    // ─── Phases ──────────────────────────────────────────────

    fn write_phase(&mut self, c: u64) -> Result<(), SimError> {
        let selection = self.cdb.select(c);
        self.stats.cdb_deferrals += selection.deferred as u64;
        let request = match selection.fired {
            Some(request) => request,
            None => return Ok(()),
        };
        self.stats.cdb_broadcasts += 1;

        // The producing station disappears when the broadcast applies; pull
        // everything the aftermath needs first.
        let producer = self.pool.get(request.station);
        let instr = producer.and_then(|rs| rs.instr);
        let branch = if request.op.is_branch() {
            producer.map(|rs| BranchInfo {
                instr: rs.instr,
                vj: rs.vj.unwrap_or_default(),
                vk: rs.vk.unwrap_or_default(),
                target: rs.a.unwrap_or(0),
                issue_cycle: rs.issue_cycle,
            })
        } else {
            None
        };

        let effect = apply_broadcast(&request, &mut self.regs, &mut self.pool, c);
        if let Some(id) = instr {
            self.timing.entry(id).or_default().write = Some(c);
            self.stats.instructions_completed += 1;
        }
        let dest = request
            .dest
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        match effect.register {
            CdbWriteOutcome::Superseded(by) => self.log(
                c,
                format!(
                    "WRITE {} -> {} superseded by {} (value dropped)",
                    request.station, dest, by
                ),
            ),
            _ => self.log(
                c,
                format!(
                    "WRITE {} -> {} = {} (forwarded to {} station(s))",
                    request.station,
                    dest,
                    request.value,
                    effect.forwarded.len()
                ),
            ),
        }

        if let Some(branch) = branch {
            self.resolve_branch(request.op, branch, c);
        }
        Ok(())
    }

    fn resolve_branch(&mut self, op: OpCode, branch: BranchInfo, c: u64) {
        let taken = match op {
            OpCode::Beq => branch.vj == branch.vk,
            OpCode::Bne => branch.vj != branch.vk,
            _ => false,
        };
        self.stats.branches_resolved += 1;
        self.log(
            c,
            format!(
                "BRANCH {} ({} vs {}) resolved {}",
                op,
                branch.vj,
                branch.vk,
                if taken { "TAKEN" } else { "NOT TAKEN" }
            ),
        );

        if taken {
            self.stats.branches_taken += 1;
            let program_len = self.issue.program().len();
            if branch.target < 0 || branch.target as usize > program_len {
                warn!(
                    "engine: branch {:?} target {} out of range, not jumping",
                    branch.instr, branch.target
                );
                self.issue.resolve_branch(None);
                return;
            }
            self.flush_after(branch.issue_cycle, c);
            self.issue.resolve_branch(Some(branch.target as usize));
        } else {
            self.issue.resolve_branch(None);
        }
    }

    /// Clears every station issued after the branch, drops their timing
    /// rows, and purges their pending CDB requests and in-flight memory
    /// ops. Registers are not rolled back (no reorder buffer).
    fn flush_after(&mut self, branch_issue_cycle: u64, c: u64) {
        let victims: Vec<(StationId, Option<u32>)> = self
            .pool
            .busy()
            .filter(|rs| rs.issue_cycle > branch_issue_cycle)
            .map(|rs| (rs.id, rs.instr))
            .collect();
        if victims.is_empty() {
            return;
        }
        let stations: Vec<StationId> = victims.iter().map(|(id, _)| *id).collect();
        for (station, instr) in &victims {
            self.pool.release(*station);
            if let Some(id) = instr {
                self.timing.remove(id);
            }
            self.log(c, format!("FLUSH {} (issued after taken branch)", station));
        }
        self.cdb.purge_stations(&stations);
        self.mem.purge_stations(&stations);
        self.stats.instructions_flushed += victims.len() as u64;
    }

    fn execute_phase(&mut self, c: u64) {
        let tick = self.exec.tick(&mut self.pool, &mut self.cdb, c);
        for (station, instr, latency) in tick.started {
            self.timing.entry(instr).or_default().exec_start = Some(c);
            self.log(
                c,
                format!("EXEC START {} (instr {}, latency {})", station, instr, latency),
            );
        }
        for (station, instr) in tick.completed {
            self.timing.entry(instr).or_default().exec_end = Some(c);
            self.log(c, format!("EXEC END {} (instr {})", station, instr));
        }
    }

    fn memory_phase(&mut self, c: u64) -> Result<(), SimError> {
        let completed = self.mem.tick()?;
        for op in completed {
            let instr = self.pool.get(op.station).and_then(|rs| rs.instr);
            if op.is_load {
                self.stats.loads_completed += 1;
                if let Some(id) = instr {
                    self.timing.entry(id).or_default().exec_end = Some(c);
                }
                let dest = op
                    .dest
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                self.log(
                    c,
                    format!("LOAD DONE {} -> {} = {}", op.station, dest, op.value),
                );
                self.cdb.push(BroadcastRequest {
                    station: op.station,
                    value: op.value,
                    dest: op.dest,
                    op: op.op,
                    ready_cycle: c + 1,
                });
            } else {
                // Stores finalize without a broadcast: the commit cycle is
                // both their exec end and their write.
                self.stats.stores_completed += 1;
                if let Some(id) = instr {
                    let t = self.timing.entry(id).or_default();
                    t.exec_end = Some(c);
                    t.write = Some(c);
                    self.stats.instructions_completed += 1;
                }
                self.pool.release(op.station);
                self.log(c, format!("STORE DONE {} ({})", op.station, op.op));
            }
        }
        Ok(())
    }

    fn redispatch_phase(&mut self, c: u64) -> Result<(), SimError> {
        let dispatched = self.issue.dispatch_ready_memory(&mut self.pool, &mut self.mem)?;
        for (station, instr) in dispatched {
            // The first countdown tick is next cycle.
            self.timing.entry(instr).or_default().exec_start = Some(c + 1);
            self.log(c, format!("MEM DISPATCH {} (instr {})", station, instr));
        }
        Ok(())
    }

    fn issue_phase(&mut self, c: u64) -> Result<(), SimError> {
        match self
            .issue
            .try_issue(&mut self.regs, &mut self.pool, &mut self.mem, c)?
        {
            IssueOutcome::Issued {
                instr,
                station,
                dispatched,
            } => {
                self.stats.instructions_issued += 1;
                // A fresh row: re-issue after a loop branch restarts the
                // instruction's timeline.
                let mut timing = InstrTiming {
                    issue: Some(c),
                    ..InstrTiming::default()
                };
                if dispatched {
                    timing.exec_start = Some(c + 1);
                }
                self.timing.insert(instr, timing);
                self.log(c, format!("ISSUE instr {} -> {}", instr, station));
            }
            IssueOutcome::Stalled(reason) => {
                match reason {
                    StallReason::BranchPending => self.stats.branch_stalls += 1,
                    StallReason::NoStation(_) | StallReason::LsbFull => {
                        self.stats.structural_stalls += 1
                    }
                }
                debug!("engine: cycle {}: issue stalled ({:?})", c, reason);
            }
            IssueOutcome::AtEnd => {}
        }
        Ok(())
    }

    fn check_termination(&mut self, c: u64) {
        let done = self.issue.at_end()
            && self.timing.values().all(|t| t.write.is_some())
            && self.pool.all_idle()
            && !self.exec.any_running(&self.pool)
            && self.mem.lsb_empty()
            && self.cdb.is_empty();
        if done {
            self.complete = true;
            info!("engine: simulation complete after {} cycles", c);
            self.log(c, format!("COMPLETE after {} cycles", c));
        }
    }

    // ─── Observable state ────────────────────────────────────

    /// Cycles executed so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// True once the termination predicate held.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Per-instruction pipeline timestamps, keyed by instruction id.
    pub fn timing(&self) -> &BTreeMap<u32, InstrTiming> {
        &self.timing
    }

    /// Timestamps of one instruction.
    pub fn timing_of(&self, instr: u32) -> InstrTiming {
        self.timing.get(&instr).copied().unwrap_or_default()
    }

    /// The normalized program under execution.
    pub fn program(&self) -> &[Instruction] {
        self.issue.program()
    }

    /// Current program cursor.
    pub fn cursor(&self) -> usize {
        self.issue.cursor()
    }

    /// Observable state of every reservation station.
    pub fn station_snapshots(&self) -> Vec<StationSnapshot> {
        self.pool.snapshots()
    }

    /// Observable state of every register.
    pub fn register_snapshots(&self) -> Vec<(RegName, Register)> {
        self.regs.snapshots()
    }

    /// A register's current value, regardless of any pending producer.
    /// Final-state assertions use this after the run has drained.
    pub fn register_value(&self, reg: RegName) -> f64 {
        self.regs.get(reg).value
    }

    /// A register's pending producer tag, if any.
    pub fn register_status(&self, reg: RegName) -> Option<String> {
        self.regs.status(reg).map(|tag| tag.to_string())
    }

    /// In-flight memory operations.
    pub fn lsb_entries(&self) -> &[LsbEntry] {
        self.mem.lsb_entries()
    }

    /// Cache hit/miss counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.mem.cache_stats()
    }

    /// Per-line cache state.
    pub fn cache_lines(&self) -> Vec<CacheLineSnapshot> {
        self.mem.cache_lines()
    }

    /// Run statistics so far.
    pub fn stats(&self) -> SimStats {
        self.stats
    }

    /// The cycle-stamped event log (bounded; oldest entries drop first).
    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Returns to cycle 0: stations, buffers, bus, statistics, and timing
    /// clear; registers re-apply their preloads; memory contents persist.
    pub fn reset(&mut self) {
        self.cycle = 0;
        self.complete = false;
        self.timing.clear();
        self.stats = SimStats::default();
        self.events.clear();
        self.regs.reset();
        self.regs.preload(&self.preloads);
        self.pool.reset();
        self.cdb.clear();
        self.mem.reset();
        self.exec = ExecutionUnit::new(self.config.latencies.clone());
        self.issue.reset();
    }

    fn log(&mut self, cycle: u64, message: String) {
        debug!("engine: cycle {}: {}", cycle, message);
        if self.events.len() >= EVENT_LOG_CAP {
            self.events.remove(0);
        }
        self.events.push(format!("[{}] {}", cycle, message));
    }
}
