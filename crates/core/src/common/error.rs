//! Simulator error definitions.
//!
//! This module defines the error handling for the simulator core. It provides:
//! 1. **Error Representation:** One enum covering every fatal condition the core can surface.
//! 2. **Propagation Policy:** Fatal conditions flow to the engine driver as `Result` values;
//!    the engine itself has no retry logic.
//! 3. **Error Handling:** Integration with the standard Rust error traits.
//!
//! Structural hazards are deliberately *not* represented here: a full station bank or a
//! full load/store buffer stalls issue for the cycle and is reported through the issue
//! outcome, never as an error. A CDB conflict is likewise resolved by deferral and logged.

use std::fmt;

/// Fatal simulator errors.
///
/// Every variant is treated as a bug or a misconfiguration by the cycle engine;
/// none of them is recoverable mid-simulation.
#[derive(Clone, Debug, PartialEq)]
pub enum SimError {
    /// A register name did not match `^[FR]\d+$` with an index in 0..=31.
    ///
    /// The associated value is the offending name.
    UnknownRegister(String),

    /// A read of a register whose `qi` tag is still pending.
    ///
    /// Issue never reads busy registers (it captures the tag instead), so this
    /// surfacing to a caller indicates a protocol bug.
    RegisterBusy {
        /// The register that was read.
        register: String,
        /// The station tag that will produce the register's value.
        producer: String,
    },

    /// No station of the required kind was free, or the load/store buffer was full,
    /// in a context where the caller did not check availability first.
    ///
    /// The engine treats structural hazards as issue stalls; this error only
    /// appears when a component is driven out of protocol.
    StructuralHazard(String),

    /// A byte-memory access fell outside the fixed memory range.
    BadAddress {
        /// First byte of the attempted access.
        address: i64,
        /// Access width in bytes.
        len: usize,
    },

    /// A cached word access that is not 4-byte aligned.
    ///
    /// Doublewords may straddle a block boundary (they decompose into two
    /// word accesses), but each word access itself must be aligned.
    MisalignedAccess {
        /// First byte of the attempted access.
        address: i64,
    },

    /// Rejected configuration at reset (non-positive sizes, cache size not
    /// divisible by block size, missing station banks, zero latencies).
    InvalidConfiguration(String),

    /// The engine hit the configured maximum-cycle safeguard without reaching
    /// the termination predicate.
    NonTerminating {
        /// Number of cycles executed before giving up.
        cycles: u64,
    },

    /// An assembly source line could not be parsed.
    ParseError {
        /// 1-based source line number.
        line: usize,
        /// Human-readable description of the problem.
        message: String,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::UnknownRegister(name) => write!(f, "unknown register '{}'", name),
            SimError::RegisterBusy { register, producer } => {
                write!(f, "register {} is busy (waiting for {})", register, producer)
            }
            SimError::StructuralHazard(what) => write!(f, "structural hazard: {}", what),
            SimError::BadAddress { address, len } => {
                write!(f, "bad address {} ({}-byte access)", address, len)
            }
            SimError::MisalignedAccess { address } => {
                write!(f, "misaligned word access at address {}", address)
            }
            SimError::InvalidConfiguration(why) => write!(f, "invalid configuration: {}", why),
            SimError::NonTerminating { cycles } => {
                write!(f, "simulation did not terminate within {} cycles", cycles)
            }
            SimError::ParseError { line, message } => {
                write!(f, "parse error at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for SimError {}
