//! Configuration for the simulator core.
//!
//! This module defines the structures that parameterize a simulation run:
//! 1. **Stations:** Per-kind reservation station counts.
//! 2. **Memory:** Load/store buffer capacity and cache geometry/latencies.
//! 3. **Latencies:** Per-opcode execution latencies, keyed by mnemonic.
//!
//! Every execution parameter is user-supplied; there are no implicit
//! defaults. `Config` deserializes from JSON with all fields required, and
//! [`Config::validate`] rejects inconsistent values with
//! [`SimError::InvalidConfiguration`] before an engine can be built. The
//! only defaulted field is `max_cycles`, a runaway-simulation safeguard
//! rather than an execution parameter. Memory size is fixed at 1 MiB and is
//! intentionally not configurable.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::common::SimError;
use crate::isa::OpCode;

fn default_max_cycles() -> u64 {
    100_000
}

/// Number of reservation stations in each bank.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationCounts {
    /// FP adder stations (`Add1..AddN`), shared by ADD and SUB.
    pub fp_add: usize,
    /// FP multiplier stations (`Mult1..MultN`).
    pub fp_mul: usize,
    /// FP divider stations (`Div1..DivN`).
    pub fp_div: usize,
    /// Integer add stations (`IntAdd1..IntAddN`) for DADDI/DSUBI.
    pub int_add: usize,
    /// Load buffers (`Load1..LoadN`).
    pub load: usize,
    /// Store buffers (`Store1..StoreN`).
    pub store: usize,
    /// Branch stations (`Branch1..BranchN`).
    pub branch: usize,
}

/// Data cache geometry and timing.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Total cache size in bytes; must be a multiple of `block_size`.
    pub size_bytes: usize,
    /// Block size in bytes; must be a positive multiple of 4 so aligned
    /// word accesses never straddle a block.
    pub block_size: usize,
    /// Cycles added to a memory op's latency on a hit.
    pub hit_latency: u64,
    /// Cycles added to a memory op's latency on a miss.
    pub miss_penalty: u64,
}

/// Complete, user-supplied simulation configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Reservation station counts per kind.
    pub stations: StationCounts,
    /// Load/store buffer capacity (entries, >= 1).
    pub lsb_size: usize,
    /// Data cache parameters.
    pub cache: CacheConfig,
    /// Base latency of a load before cache latency is added (>= 1).
    pub load_latency: u64,
    /// Base latency of a store before cache latency is added (>= 1).
    pub store_latency: u64,
    /// Execution latency per compute opcode, keyed by mnemonic
    /// (e.g. `"ADD.D": 2`). An op that executes without a configured
    /// latency never starts; the execution unit warns instead.
    pub latencies: BTreeMap<OpCode, u64>,
    /// Cycle-count safeguard: `run` fails with `NonTerminating` past this.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u64,
}

impl Config {
    /// Checks structural consistency. Called by the engine constructor;
    /// an error here means the engine refuses to step.
    pub fn validate(&self) -> Result<(), SimError> {
        let fail = |why: String| Err(SimError::InvalidConfiguration(why));

        let banks = [
            ("fp_add", self.stations.fp_add),
            ("fp_mul", self.stations.fp_mul),
            ("fp_div", self.stations.fp_div),
            ("int_add", self.stations.int_add),
            ("load", self.stations.load),
            ("store", self.stations.store),
            ("branch", self.stations.branch),
        ];
        for (name, count) in banks {
            if count == 0 {
                return fail(format!("station count '{}' must be at least 1", name));
            }
        }

        if self.lsb_size == 0 {
            return fail("load/store buffer capacity must be at least 1".to_string());
        }

        let cache = &self.cache;
        if cache.block_size == 0 || cache.block_size % 4 != 0 {
            return fail(format!(
                "cache block size {} must be a positive multiple of 4",
                cache.block_size
            ));
        }
        if cache.size_bytes == 0 || cache.size_bytes % cache.block_size != 0 {
            return fail(format!(
                "cache size {} must be a positive multiple of the block size {}",
                cache.size_bytes, cache.block_size
            ));
        }

        if self.load_latency == 0 {
            return fail("load base latency must be at least 1".to_string());
        }
        if self.store_latency == 0 {
            return fail("store base latency must be at least 1".to_string());
        }

        for (op, latency) in &self.latencies {
            if op.is_memory() {
                return fail(format!(
                    "latency for {} is set by load/store base latency and the cache, \
                     not the latency table",
                    op
                ));
            }
            if *latency == 0 {
                return fail(format!("latency for {} must be at least 1", op));
            }
        }

        if self.max_cycles == 0 {
            return fail("max_cycles must be at least 1".to_string());
        }

        Ok(())
    }
}
