//! Normalized instruction records.
//!
//! An [`Instruction`] is the parsed, label-resolved form the core consumes:
//! operand registers by name, memory offsets and immediates as plain integers,
//! and branch targets already resolved to instruction indices. Pipeline
//! timestamps are tracked by the cycle engine, keyed by the instruction id,
//! so the program itself stays immutable across a run.

use std::fmt;

use crate::common::RegName;

use super::opcode::OpCode;

/// A normalized instruction in program order.
///
/// `id` is 1-based and monotonic; the instruction at program index `i` has
/// `id == i + 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    /// 1-based program-order identifier.
    pub id: u32,
    /// Operation code.
    pub op: OpCode,
    /// Destination register (absent for stores and branches).
    pub dest: Option<RegName>,
    /// First source register.
    pub src1: Option<RegName>,
    /// Second source register.
    pub src2: Option<RegName>,
    /// Base register for memory operations.
    pub base: Option<RegName>,
    /// Byte offset for memory operations.
    pub offset: i32,
    /// Immediate for DADDI/DSUBI, or the resolved target instruction index
    /// for branches.
    pub immediate: i32,
}

impl Instruction {
    /// Three-register FP arithmetic: `op dest, src1, src2`.
    pub fn compute(id: u32, op: OpCode, dest: RegName, src1: RegName, src2: RegName) -> Self {
        Self {
            id,
            op,
            dest: Some(dest),
            src1: Some(src1),
            src2: Some(src2),
            base: None,
            offset: 0,
            immediate: 0,
        }
    }

    /// Integer immediate arithmetic: `op dest, src1, imm`.
    pub fn immediate(id: u32, op: OpCode, dest: RegName, src1: RegName, imm: i32) -> Self {
        Self {
            id,
            op,
            dest: Some(dest),
            src1: Some(src1),
            src2: None,
            base: None,
            offset: 0,
            immediate: imm,
        }
    }

    /// Load: `op dest, offset(base)`.
    pub fn load(id: u32, op: OpCode, dest: RegName, offset: i32, base: RegName) -> Self {
        Self {
            id,
            op,
            dest: Some(dest),
            src1: None,
            src2: None,
            base: Some(base),
            offset,
            immediate: 0,
        }
    }

    /// Store: `op src, offset(base)`. The data register travels in `src1`.
    pub fn store(id: u32, op: OpCode, src: RegName, offset: i32, base: RegName) -> Self {
        Self {
            id,
            op,
            dest: None,
            src1: Some(src),
            src2: None,
            base: Some(base),
            offset,
            immediate: 0,
        }
    }

    /// Branch: `op src1, src2, target` with the target already resolved to an
    /// instruction index.
    pub fn branch(id: u32, op: OpCode, src1: RegName, src2: RegName, target: i32) -> Self {
        Self {
            id,
            op,
            dest: None,
            src1: Some(src1),
            src2: Some(src2),
            base: None,
            offset: 0,
            immediate: target,
        }
    }

    /// 0-based program index of this instruction.
    pub fn index(&self) -> usize {
        (self.id - 1) as usize
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op.is_memory() {
            let reg = if self.op.is_load() { self.dest } else { self.src1 };
            let reg = reg.map(|r| r.to_string()).unwrap_or_default();
            let base = self.base.map(|r| r.to_string()).unwrap_or_default();
            write!(f, "{} {}, {}({})", self.op, reg, self.offset, base)
        } else if self.op.is_branch() {
            let s1 = self.src1.map(|r| r.to_string()).unwrap_or_default();
            let s2 = self.src2.map(|r| r.to_string()).unwrap_or_default();
            write!(f, "{} {}, {}, {}", self.op, s1, s2, self.immediate)
        } else if self.op.is_integer_immediate() {
            let d = self.dest.map(|r| r.to_string()).unwrap_or_default();
            let s1 = self.src1.map(|r| r.to_string()).unwrap_or_default();
            write!(f, "{} {}, {}, {}", self.op, d, s1, self.immediate)
        } else {
            let d = self.dest.map(|r| r.to_string()).unwrap_or_default();
            let s1 = self.src1.map(|r| r.to_string()).unwrap_or_default();
            let s2 = self.src2.map(|r| r.to_string()).unwrap_or_default();
            write!(f, "{} {}, {}, {}", self.op, d, s1, s2)
        }
    }
}
