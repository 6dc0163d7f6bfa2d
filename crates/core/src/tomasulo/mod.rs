//! Tomasulo dynamic-scheduling machinery.
//!
//! The renaming and scheduling core:
//! 1. **Register File + RAT:** 64 registers with producer tags.
//! 2. **Stations:** Typed reservation station banks with stable names.
//! 3. **Issue:** In-order, one-per-cycle issue with renaming.
//! 4. **Execute:** Per-station latency countdowns for compute ops.
//! 5. **CDB:** Single-broadcast-per-cycle bus with FCFS arbitration.

/// Common data bus and arbitration.
pub mod cdb;

/// Execution unit for compute operations.
pub mod execute;

/// In-order issue stage.
pub mod issue;

/// Reservation station banks.
pub mod pool;

/// Register file and alias table.
pub mod regfile;

/// Reservation station records and ids.
pub mod station;

pub use cdb::{apply_broadcast, BroadcastRequest, CdbArbiter};
pub use execute::ExecutionUnit;
pub use issue::{IssueOutcome, IssueUnit, StallReason};
pub use pool::StationPool;
pub use regfile::{CdbWriteOutcome, Register, RegisterFile};
pub use station::{ReservationStation, StationId, StationKind, StationSnapshot};
