//! Instruction opcodes for the simulated MIPS subset.
//!
//! Twenty operations in six groups:
//! 1. **Integer immediate:** DADDI, DSUBI.
//! 2. **Integer memory:** LW, LD, SW, SD.
//! 3. **FP memory:** L.S, L.D, S.S, S.D.
//! 4. **FP arithmetic (double):** ADD.D, SUB.D, MUL.D, DIV.D.
//! 5. **FP arithmetic (single):** ADD.S, SUB.S, MUL.S, DIV.S.
//! 6. **Branches:** BEQ, BNE (no prediction).
//!
//! Single- and double-precision arithmetic share the same functional units;
//! the precision only changes the memory payload width for loads and stores.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::common::SimError;

/// Operation code of a simulated instruction.
///
/// The serde names are the assembly mnemonics, so per-op latency tables in a
/// JSON configuration are keyed by the exact strings a program uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum OpCode {
    /// Add immediate to integer register.
    #[serde(rename = "DADDI")]
    Daddi,
    /// Subtract immediate from integer register.
    #[serde(rename = "DSUBI")]
    Dsubi,

    /// Load word (4 bytes) into an integer register.
    #[serde(rename = "LW")]
    Lw,
    /// Load doubleword (8 bytes) into an integer register.
    #[serde(rename = "LD")]
    Ld,
    /// Store word (4 bytes) from an integer register.
    #[serde(rename = "SW")]
    Sw,
    /// Store doubleword (8 bytes) from an integer register.
    #[serde(rename = "SD")]
    Sd,

    /// Load single-precision FP value (4 bytes).
    #[serde(rename = "L.S")]
    LoadS,
    /// Load double-precision FP value (8 bytes).
    #[serde(rename = "L.D")]
    LoadD,
    /// Store single-precision FP value (4 bytes).
    #[serde(rename = "S.S")]
    StoreS,
    /// Store double-precision FP value (8 bytes).
    #[serde(rename = "S.D")]
    StoreD,

    /// FP addition, double precision.
    #[serde(rename = "ADD.D")]
    AddD,
    /// FP addition, single precision.
    #[serde(rename = "ADD.S")]
    AddS,
    /// FP subtraction, double precision.
    #[serde(rename = "SUB.D")]
    SubD,
    /// FP subtraction, single precision.
    #[serde(rename = "SUB.S")]
    SubS,
    /// FP multiplication, double precision.
    #[serde(rename = "MUL.D")]
    MulD,
    /// FP multiplication, single precision.
    #[serde(rename = "MUL.S")]
    MulS,
    /// FP division, double precision.
    #[serde(rename = "DIV.D")]
    DivD,
    /// FP division, single precision.
    #[serde(rename = "DIV.S")]
    DivS,

    /// Branch if equal.
    #[serde(rename = "BEQ")]
    Beq,
    /// Branch if not equal.
    #[serde(rename = "BNE")]
    Bne,
}

impl OpCode {
    /// Every opcode, in mnemonic-table order.
    pub const ALL: [OpCode; 20] = [
        OpCode::Daddi,
        OpCode::Dsubi,
        OpCode::Lw,
        OpCode::Ld,
        OpCode::Sw,
        OpCode::Sd,
        OpCode::LoadS,
        OpCode::LoadD,
        OpCode::StoreS,
        OpCode::StoreD,
        OpCode::AddD,
        OpCode::AddS,
        OpCode::SubD,
        OpCode::SubS,
        OpCode::MulD,
        OpCode::MulS,
        OpCode::DivD,
        OpCode::DivS,
        OpCode::Beq,
        OpCode::Bne,
    ];

    /// The assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Daddi => "DADDI",
            OpCode::Dsubi => "DSUBI",
            OpCode::Lw => "LW",
            OpCode::Ld => "LD",
            OpCode::Sw => "SW",
            OpCode::Sd => "SD",
            OpCode::LoadS => "L.S",
            OpCode::LoadD => "L.D",
            OpCode::StoreS => "S.S",
            OpCode::StoreD => "S.D",
            OpCode::AddD => "ADD.D",
            OpCode::AddS => "ADD.S",
            OpCode::SubD => "SUB.D",
            OpCode::SubS => "SUB.S",
            OpCode::MulD => "MUL.D",
            OpCode::MulS => "MUL.S",
            OpCode::DivD => "DIV.D",
            OpCode::DivS => "DIV.S",
            OpCode::Beq => "BEQ",
            OpCode::Bne => "BNE",
        }
    }

    /// True for LW, LD, L.S, L.D.
    pub fn is_load(self) -> bool {
        matches!(self, OpCode::Lw | OpCode::Ld | OpCode::LoadS | OpCode::LoadD)
    }

    /// True for SW, SD, S.S, S.D.
    pub fn is_store(self) -> bool {
        matches!(self, OpCode::Sw | OpCode::Sd | OpCode::StoreS | OpCode::StoreD)
    }

    /// True for any load or store.
    pub fn is_memory(self) -> bool {
        self.is_load() || self.is_store()
    }

    /// True for BEQ and BNE.
    pub fn is_branch(self) -> bool {
        matches!(self, OpCode::Beq | OpCode::Bne)
    }

    /// True for DADDI and DSUBI.
    pub fn is_integer_immediate(self) -> bool {
        matches!(self, OpCode::Daddi | OpCode::Dsubi)
    }

    /// True for ops executed by the execution unit (everything except loads
    /// and stores, which execute inside the memory system).
    pub fn is_compute(self) -> bool {
        !self.is_memory()
    }

    /// True for FP arithmetic (both precisions).
    pub fn is_fp_arith(self) -> bool {
        matches!(
            self,
            OpCode::AddD
                | OpCode::AddS
                | OpCode::SubD
                | OpCode::SubS
                | OpCode::MulD
                | OpCode::MulS
                | OpCode::DivD
                | OpCode::DivS
        )
    }

    /// Bytes moved by a memory operation: 4 for word ops, 8 for doubleword
    /// ops, 0 for everything else.
    pub fn mem_access_size(self) -> u32 {
        match self {
            OpCode::Lw | OpCode::Sw | OpCode::LoadS | OpCode::StoreS => 4,
            OpCode::Ld | OpCode::Sd | OpCode::LoadD | OpCode::StoreD => 8,
            _ => 0,
        }
    }

    /// True when the destination (loads) or source data (stores) is a
    /// floating-point register.
    pub fn uses_fp_payload(self) -> bool {
        matches!(
            self,
            OpCode::LoadS | OpCode::LoadD | OpCode::StoreS | OpCode::StoreD
        ) || self.is_fp_arith()
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl FromStr for OpCode {
    type Err = SimError;

    /// Parses a mnemonic, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        OpCode::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic() == upper)
            .ok_or_else(|| SimError::ParseError {
                line: 0,
                message: format!("unknown instruction '{}'", s),
            })
    }
}
