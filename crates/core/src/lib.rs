//! Cycle-accurate Tomasulo dynamic-scheduling simulator.
//!
//! This crate implements the core of a Tomasulo-style out-of-order machine
//! over a small MIPS subset, with the following pieces:
//! 1. **Tomasulo:** Register file + alias table, reservation station banks,
//!    in-order issue with renaming, per-station execution countdowns, and a
//!    single-broadcast-per-cycle common data bus with FCFS arbitration.
//! 2. **Memory:** 1 MiB byte memory behind a direct-mapped write-back data
//!    cache and an in-order load/store buffer with address-overlap stalling.
//! 3. **ISA:** The 20-instruction subset (integer immediates, integer/FP
//!    loads and stores, FP arithmetic in two precisions, BEQ/BNE) and an
//!    assembly front end with label resolution.
//! 4. **Engine:** The per-cycle phase ordering (Write, Execute, Memory,
//!    Issue), per-instruction timestamps, branch flush, and termination.
//! 5. **Support:** User-supplied configuration with validation, run
//!    statistics, and a bounded per-cycle event log.

/// Common types (errors, register names).
pub mod common;

/// User-supplied simulation configuration.
pub mod config;

/// The cycle engine.
pub mod engine;

/// Instruction set and assembly front end.
pub mod isa;

/// Memory hierarchy (byte memory, cache, load/store buffer).
pub mod mem;

/// Run statistics.
pub mod stats;

/// Tomasulo machinery (registers, stations, issue, execute, CDB).
pub mod tomasulo;

/// Fatal error type used across the crate.
pub use crate::common::SimError;
/// Root configuration; deserialize from JSON, then validate.
pub use crate::config::Config;
/// The simulator instance; construct with `CycleEngine::new`.
pub use crate::engine::CycleEngine;
