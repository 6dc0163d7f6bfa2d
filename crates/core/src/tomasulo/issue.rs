//! In-order instruction issue.
//!
//! Exactly one instruction — the one at the program cursor — is considered
//! per cycle. It issues when no branch is pending, a station of the required
//! kind is free, and (for memory ops) the load/store buffer has room;
//! otherwise it stalls at the front and nothing younger may pass it.
//!
//! Issue is where renaming happens: source operands are captured as values
//! if their register is ready, or as producer tags if not, and the
//! destination register's `qi` is overwritten with the new station's tag
//! *after* the sources are captured (so an instruction reading and writing
//! the same register sees its old producer). Memory operations whose
//! operands are already present are handed to the memory system immediately;
//! the rest wait for broadcasts and are re-dispatched by the engine.

use log::debug;

use crate::common::{RegName, SimError};
use crate::isa::Instruction;
use crate::mem::MemorySystem;

use super::pool::StationPool;
use super::regfile::RegisterFile;
use super::station::{StationId, StationKind};

/// Why the front instruction could not issue this cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StallReason {
    /// An unresolved branch blocks all younger instructions.
    BranchPending,
    /// No idle station of the required kind (structural hazard).
    NoStation(StationKind),
    /// The load/store buffer is at capacity (structural hazard).
    LsbFull,
}

/// Outcome of one issue attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueOutcome {
    /// The front instruction entered a station.
    Issued {
        /// Issued instruction id.
        instr: u32,
        /// Station it occupies.
        station: StationId,
        /// True if the op was handed to the memory system at issue.
        dispatched: bool,
    },
    /// The front instruction stalled.
    Stalled(StallReason),
    /// The cursor is past the end of the program.
    AtEnd,
}

/// The issue stage: program, cursor, and branch gate.
pub struct IssueUnit {
    program: Vec<Instruction>,
    cursor: usize,
    branch_pending: bool,
}

impl IssueUnit {
    /// Creates the unit over a normalized program.
    pub fn new(program: Vec<Instruction>) -> Self {
        Self {
            program,
            cursor: 0,
            branch_pending: false,
        }
    }

    /// The full program.
    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    /// Looks up an instruction by id.
    pub fn instruction(&self, id: u32) -> Option<&Instruction> {
        (id as usize)
            .checked_sub(1)
            .and_then(|index| self.program.get(index))
    }

    /// Current program cursor (0-based index).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// True once the cursor has moved past the last instruction.
    pub fn at_end(&self) -> bool {
        self.cursor >= self.program.len()
    }

    /// True while an issued branch is unresolved.
    pub fn branch_pending(&self) -> bool {
        self.branch_pending
    }

    /// Resolves the pending branch: a taken branch moves the cursor to its
    /// target index, a not-taken branch leaves it alone. Either way issue
    /// resumes.
    pub fn resolve_branch(&mut self, taken_target: Option<usize>) {
        if let Some(target) = taken_target {
            self.cursor = target;
        }
        self.branch_pending = false;
    }

    /// Rewinds to the start of the program (engine reset).
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.branch_pending = false;
    }

    /// Attempts to issue the cursor instruction.
    pub fn try_issue(
        &mut self,
        regs: &mut RegisterFile,
        pool: &mut StationPool,
        mem: &mut MemorySystem,
        cycle: u64,
    ) -> Result<IssueOutcome, SimError> {
        let instr = match self.program.get(self.cursor) {
            Some(instr) => instr.clone(),
            None => return Ok(IssueOutcome::AtEnd),
        };

        if self.branch_pending {
            return Ok(IssueOutcome::Stalled(StallReason::BranchPending));
        }
        let kind = StationKind::required_for(instr.op);
        if !pool.has_free(kind) {
            return Ok(IssueOutcome::Stalled(StallReason::NoStation(kind)));
        }
        if instr.op.is_memory() && mem.lsb_full() {
            return Ok(IssueOutcome::Stalled(StallReason::LsbFull));
        }

        let station = {
            let rs = pool.allocate(kind).ok_or_else(|| {
                SimError::StructuralHazard(format!("no free {} station", kind.prefix()))
            })?;
            rs.busy = true;
            rs.op = Some(instr.op);
            rs.instr = Some(instr.id);
            rs.dest = instr.dest;
            rs.issue_cycle = cycle;
            rs.wake_cycle = cycle;
            rs.exec_started = false;
            rs.remaining = 0;

            if instr.op.is_memory() {
                // Base register feeds the j slot; the offset rides in A.
                if let Some(base) = instr.base {
                    let (v, q) = capture(regs, base);
                    rs.vj = v;
                    rs.qj = q;
                }
                rs.a = Some(instr.offset);
                if instr.op.is_store() {
                    // Data to store feeds the k slot.
                    if let Some(data) = instr.src1 {
                        let (v, q) = capture(regs, data);
                        rs.vk = v;
                        rs.qk = q;
                    }
                }
            } else if instr.op.is_integer_immediate() {
                if let Some(src) = instr.src1 {
                    let (v, q) = capture(regs, src);
                    rs.vj = v;
                    rs.qj = q;
                }
                rs.a = Some(instr.immediate);
            } else {
                // FP arithmetic and branches: two register sources.
                if let Some(src) = instr.src1 {
                    let (v, q) = capture(regs, src);
                    rs.vj = v;
                    rs.qj = q;
                }
                if let Some(src) = instr.src2 {
                    let (v, q) = capture(regs, src);
                    rs.vk = v;
                    rs.qk = q;
                }
                if instr.op.is_branch() {
                    rs.a = Some(instr.immediate);
                }
            }
            rs.id
        };

        // Rename after source capture: WAR and WAW hazards die here.
        if let Some(dest) = instr.dest {
            regs.set_qi(dest, station);
        }

        let dispatched = self.dispatch_if_ready(station, pool, mem)?;

        self.cursor += 1;
        if instr.op.is_branch() {
            self.branch_pending = true;
        }
        debug!("issue: cycle {}: {} -> {}", cycle, instr, station);

        Ok(IssueOutcome::Issued {
            instr: instr.id,
            station,
            dispatched,
        })
    }

    /// Hands every ready, not-yet-dispatched memory station to the memory
    /// system. Called at issue and again by the engine after broadcasts
    /// deliver late operands. Returns the stations dispatched.
    pub fn dispatch_ready_memory(
        &self,
        pool: &mut StationPool,
        mem: &mut MemorySystem,
    ) -> Result<Vec<(StationId, u32)>, SimError> {
        let candidates: Vec<StationId> = pool
            .busy()
            .filter(|rs| rs.id.kind().is_memory() && !rs.exec_started)
            .map(|rs| rs.id)
            .collect();
        let mut dispatched = Vec::new();
        for id in candidates {
            if self.dispatch_if_ready(id, pool, mem)? {
                let instr = pool.get(id).and_then(|rs| rs.instr).unwrap_or(0);
                dispatched.push((id, instr));
            }
        }
        Ok(dispatched)
    }

    /// Dispatches one memory station if its operands are present. Loads need
    /// the base value; stores need base and data. The station's
    /// `exec_started` flag marks the hand-off so it happens exactly once.
    fn dispatch_if_ready(
        &self,
        id: StationId,
        pool: &mut StationPool,
        mem: &mut MemorySystem,
    ) -> Result<bool, SimError> {
        let (op, vj, vk, offset, dest) = match pool.get(id) {
            Some(rs) if rs.busy && !rs.exec_started => match rs.op {
                Some(op) if op.is_memory() => {
                    (op, rs.vj, rs.vk, rs.a.unwrap_or(0), rs.dest)
                }
                _ => return Ok(false),
            },
            _ => return Ok(false),
        };

        let ready = if op.is_load() {
            vj.is_some()
        } else {
            vj.is_some() && vk.is_some()
        };
        if !ready {
            return Ok(false);
        }

        let base = vj.unwrap_or_default();
        if op.is_load() {
            mem.issue_load(op, base, offset, dest, id)?;
        } else {
            mem.issue_store(op, base, offset, vk.unwrap_or_default(), id)?;
        }
        if let Some(rs) = pool.get_mut(id) {
            rs.exec_started = true;
        }
        Ok(true)
    }
}

/// Reads a source operand at issue: the value if the register is ready, the
/// producer tag otherwise.
fn capture(regs: &RegisterFile, reg: RegName) -> (Option<f64>, Option<StationId>) {
    match regs.status(reg) {
        Some(tag) => (None, Some(tag)),
        None => (Some(regs.get(reg).value), None),
    }
}
