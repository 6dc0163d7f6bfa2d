//! Simulation statistics collection and reporting.
//!
//! Tracks the counters a run accumulates:
//! 1. **Progress:** Cycles, instructions issued and completed.
//! 2. **Hazards:** Issue stalls by cause, CDB deferrals.
//! 3. **Control:** Branches resolved, branches taken, flushed instructions.
//! 4. **Memory:** Loads and stores committed (cache hit/miss counters live
//!    with the cache and are reported alongside).

use crate::mem::CacheStats;

/// Counters for one simulation run.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimStats {
    /// Cycles stepped.
    pub cycles: u64,
    /// Instructions that entered a reservation station.
    pub instructions_issued: u64,
    /// Instructions with a recorded write-back.
    pub instructions_completed: u64,
    /// Cycles the front instruction stalled on a structural hazard.
    pub structural_stalls: u64,
    /// Cycles the front instruction stalled behind an unresolved branch.
    pub branch_stalls: u64,
    /// CDB broadcasts fired.
    pub cdb_broadcasts: u64,
    /// Eligible CDB requests pushed to a later cycle.
    pub cdb_deferrals: u64,
    /// Branches resolved.
    pub branches_resolved: u64,
    /// Branches resolved taken.
    pub branches_taken: u64,
    /// Instructions flushed by taken branches.
    pub instructions_flushed: u64,
    /// Loads committed by the memory system.
    pub loads_completed: u64,
    /// Stores committed by the memory system.
    pub stores_completed: u64,
}

impl SimStats {
    /// Prints a run summary, including the cache counters, to stdout.
    pub fn print(&self, cache: &CacheStats) {
        println!("==========================================================");
        println!("TOMASULO SIMULATION STATISTICS");
        println!("==========================================================");
        println!("sim_cycles               {}", self.cycles);
        println!("sim_insts_issued         {}", self.instructions_issued);
        println!("sim_insts_completed      {}", self.instructions_completed);
        println!("----------------------------------------------------------");
        println!("stalls.structural        {}", self.structural_stalls);
        println!("stalls.branch            {}", self.branch_stalls);
        println!("cdb.broadcasts           {}", self.cdb_broadcasts);
        println!("cdb.deferrals            {}", self.cdb_deferrals);
        println!("----------------------------------------------------------");
        println!("branch.resolved          {}", self.branches_resolved);
        println!("branch.taken             {}", self.branches_taken);
        println!("branch.flushed_insts     {}", self.instructions_flushed);
        println!("----------------------------------------------------------");
        println!("mem.loads                {}", self.loads_completed);
        println!("mem.stores               {}", self.stores_completed);
        println!(
            "cache.accesses           {} | hits: {} | miss_rate: {:.2}%",
            cache.accesses(),
            cache.hits,
            cache.miss_rate() * 100.0
        );
        println!("==========================================================");
    }
}
