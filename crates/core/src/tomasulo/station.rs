//! Reservation stations.
//!
//! A station is the unit of register renaming: its id is the tag that names
//! a pending result everywhere in the machine — in register `qi` fields, in
//! other stations' `Qj`/`Qk` operand slots, and on the common data bus.
//! Station ids are stable (kind, ordinal) pairs rendering as the classic
//! names `Add1`, `Mult2`, `Load1`, and so on.

use std::fmt;

use crate::common::RegName;
use crate::isa::OpCode;

/// Coarse station category; decides which bank an instruction draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StationKind {
    /// FP add/subtract stations (both precisions).
    FpAdd,
    /// FP multiply stations.
    FpMul,
    /// FP divide stations.
    FpDiv,
    /// Integer immediate add/subtract stations.
    IntAdd,
    /// Load buffers.
    Load,
    /// Store buffers.
    Store,
    /// Branch stations.
    Branch,
}

impl StationKind {
    /// All kinds in bank order; also the allocation and display order.
    pub const ALL: [StationKind; 7] = [
        StationKind::FpAdd,
        StationKind::FpMul,
        StationKind::FpDiv,
        StationKind::IntAdd,
        StationKind::Load,
        StationKind::Store,
        StationKind::Branch,
    ];

    /// The bank an opcode issues into.
    pub fn required_for(op: OpCode) -> StationKind {
        match op {
            OpCode::AddD | OpCode::AddS | OpCode::SubD | OpCode::SubS => StationKind::FpAdd,
            OpCode::MulD | OpCode::MulS => StationKind::FpMul,
            OpCode::DivD | OpCode::DivS => StationKind::FpDiv,
            OpCode::Daddi | OpCode::Dsubi => StationKind::IntAdd,
            OpCode::Lw | OpCode::Ld | OpCode::LoadS | OpCode::LoadD => StationKind::Load,
            OpCode::Sw | OpCode::Sd | OpCode::StoreS | OpCode::StoreD => StationKind::Store,
            OpCode::Beq | OpCode::Bne => StationKind::Branch,
        }
    }

    /// Station-name prefix (`Add`, `Mult`, `Div`, `IntAdd`, `Load`, `Store`,
    /// `Branch`).
    pub fn prefix(self) -> &'static str {
        match self {
            StationKind::FpAdd => "Add",
            StationKind::FpMul => "Mult",
            StationKind::FpDiv => "Div",
            StationKind::IntAdd => "IntAdd",
            StationKind::Load => "Load",
            StationKind::Store => "Store",
            StationKind::Branch => "Branch",
        }
    }

    /// True for the banks whose operations execute inside the memory system.
    pub fn is_memory(self) -> bool {
        matches!(self, StationKind::Load | StationKind::Store)
    }
}

/// Stable station identifier: the renaming tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StationId {
    kind: StationKind,
    ordinal: u8,
}

impl StationId {
    /// Builds an id from a kind and 1-based ordinal.
    pub fn new(kind: StationKind, ordinal: u8) -> Self {
        Self { kind, ordinal }
    }

    /// The station's kind.
    pub fn kind(self) -> StationKind {
        self.kind
    }

    /// 1-based position within the bank.
    pub fn ordinal(self) -> u8 {
        self.ordinal
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.ordinal)
    }
}

/// One reservation station.
///
/// For each operand slot, exactly one of `V` and `Q` is populated while the
/// station is busy: `V` once the value is captured, `Q` while a producer tag
/// is still pending. Loads only use the `j` slot (base register); stores use
/// `j` for the base and `k` for the data.
#[derive(Clone, Debug)]
pub struct ReservationStation {
    /// Stable identifier; doubles as the renaming tag.
    pub id: StationId,
    /// True while an instruction occupies this station.
    pub busy: bool,
    /// Operation bound at issue.
    pub op: Option<OpCode>,
    /// Captured first operand.
    pub vj: Option<f64>,
    /// Captured second operand.
    pub vk: Option<f64>,
    /// Pending producer of the first operand.
    pub qj: Option<StationId>,
    /// Pending producer of the second operand.
    pub qk: Option<StationId>,
    /// Immediate, memory offset, or branch target index.
    pub a: Option<i32>,
    /// Destination register this station will write, if any.
    pub dest: Option<RegName>,
    /// Bound instruction id.
    pub instr: Option<u32>,
    /// Cycle the instruction issued.
    pub issue_cycle: u64,
    /// Cycle the station last became fully ready (issue, or the broadcast
    /// that filled its final operand). Execution may start strictly after.
    pub wake_cycle: u64,
    /// For compute stations: countdown running or finished. For memory
    /// stations: the op has been handed to the memory system.
    pub exec_started: bool,
    /// Cycles of execution left once started.
    pub remaining: u64,
}

impl ReservationStation {
    /// Creates an idle station with the given id.
    pub fn new(id: StationId) -> Self {
        Self {
            id,
            busy: false,
            op: None,
            vj: None,
            vk: None,
            qj: None,
            qk: None,
            a: None,
            dest: None,
            instr: None,
            issue_cycle: 0,
            wake_cycle: 0,
            exec_started: false,
            remaining: 0,
        }
    }

    /// Ready to execute: busy, not yet started, first operand present, and
    /// (except for loads, which only need the base) second operand present.
    pub fn is_ready(&self) -> bool {
        self.busy
            && !self.exec_started
            && self.qj.is_none()
            && (self.id.kind() == StationKind::Load || self.qk.is_none())
    }

    /// Applies a CDB broadcast to this station's operand slots. If the
    /// forward completes the operand set, the wake cycle is stamped so
    /// execution starts no earlier than the next cycle.
    pub fn forward(&mut self, tag: StationId, value: f64, cycle: u64) -> bool {
        if !self.busy {
            return false;
        }
        let was_ready = self.is_ready();
        let mut filled = false;
        if self.qj == Some(tag) {
            self.vj = Some(value);
            self.qj = None;
            filled = true;
        }
        if self.qk == Some(tag) {
            self.vk = Some(value);
            self.qk = None;
            filled = true;
        }
        if filled && !was_ready && self.is_ready() {
            self.wake_cycle = cycle;
        }
        filled
    }

    /// Returns the station to the idle state.
    pub fn clear(&mut self) {
        let id = self.id;
        *self = ReservationStation::new(id);
    }
}

/// Observable state of one station, for display between cycles.
#[derive(Clone, Debug)]
pub struct StationSnapshot {
    /// Station name, e.g. `"Add2"`.
    pub name: String,
    /// Station kind.
    pub kind: StationKind,
    /// True while occupied.
    pub busy: bool,
    /// Bound opcode.
    pub op: Option<OpCode>,
    /// Captured first operand.
    pub vj: Option<f64>,
    /// Captured second operand.
    pub vk: Option<f64>,
    /// Pending first-operand producer name.
    pub qj: Option<String>,
    /// Pending second-operand producer name.
    pub qk: Option<String>,
    /// Immediate / offset / branch target.
    pub a: Option<i32>,
    /// Bound instruction id.
    pub instr: Option<u32>,
    /// Remaining execution cycles.
    pub remaining: u64,
    /// True once execution (or the memory-system hand-off) has begun.
    pub exec_started: bool,
}

impl ReservationStation {
    /// Captures the station's observable state.
    pub fn snapshot(&self) -> StationSnapshot {
        StationSnapshot {
            name: self.id.to_string(),
            kind: self.id.kind(),
            busy: self.busy,
            op: self.op,
            vj: self.vj,
            vk: self.vk,
            qj: self.qj.map(|q| q.to_string()),
            qk: self.qk.map(|q| q.to_string()),
            a: self.a,
            instr: self.instr,
            remaining: self.remaining,
            exec_started: self.exec_started,
        }
    }
}
