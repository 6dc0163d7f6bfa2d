//! Memory system: byte memory, data cache, and load/store buffer composed.
//!
//! The memory system owns the whole data path for loads and stores:
//! 1. **Issue:** computes the effective address, freezes the operation's
//!    latency from the cache's hit/miss classification, and queues it.
//! 2. **Tick:** advances the buffer one cycle and commits finished
//!    operations against the cache.
//! 3. **Conversion:** moves values between the f64-valued register file and
//!    raw memory — FP ops move IEEE bit patterns, integer ops move numeric
//!    values.
//!
//! Latency is frozen at issue time: an operation that issues on a miss pays
//! the miss penalty even if the block has been filled by the time it commits.

use log::debug;

use crate::common::{RegName, SimError};
use crate::config::Config;
use crate::isa::OpCode;
use crate::tomasulo::station::StationId;

use super::byte_mem::ByteMemory;
use super::cache::{CacheLineSnapshot, CacheStats, DataCache};
use super::lsb::{LoadStoreBuffer, LsbEntry};

/// A memory operation that finished this cycle.
#[derive(Clone, Debug)]
pub struct CompletedOp {
    /// Station that owns the operation.
    pub station: StationId,
    /// Destination register (loads only).
    pub dest: Option<RegName>,
    /// Loaded value in register-file representation (loads only).
    pub value: f64,
    /// The memory opcode.
    pub op: OpCode,
    /// True for loads; stores finalize without a broadcast.
    pub is_load: bool,
    /// Buffer sequence number, for logging.
    pub seq: u32,
}

/// The composed memory hierarchy.
pub struct MemorySystem {
    memory: ByteMemory,
    cache: DataCache,
    lsb: LoadStoreBuffer,
    load_latency: u64,
    store_latency: u64,
}

impl MemorySystem {
    /// Builds the hierarchy from a validated configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            memory: ByteMemory::new(),
            cache: DataCache::new(&config.cache),
            lsb: LoadStoreBuffer::new(config.lsb_size),
            load_latency: config.load_latency,
            store_latency: config.store_latency,
        }
    }

    /// Computes and range-checks the effective address `base + offset`.
    pub fn effective_address(&self, base: f64, offset: i32, op: OpCode) -> Result<u32, SimError> {
        let ea = base as i64 + offset as i64;
        let size = op.mem_access_size() as i64;
        if ea < 0 || ea + size > super::byte_mem::MEMORY_SIZE as i64 {
            return Err(SimError::BadAddress {
                address: ea,
                len: size as usize,
            });
        }
        Ok(ea as u32)
    }

    /// Total frozen latency for a load at `addr`.
    pub fn load_total_latency(&self, addr: u32) -> u64 {
        self.load_latency
            + if self.cache.is_hit(addr) {
                self.cache.hit_latency()
            } else {
                self.cache.miss_penalty()
            }
    }

    /// Total frozen latency for a store at `addr`.
    pub fn store_total_latency(&self, addr: u32) -> u64 {
        self.store_latency
            + if self.cache.is_hit(addr) {
                self.cache.hit_latency()
            } else {
                self.cache.miss_penalty()
            }
    }

    /// Queues a load; returns its buffer sequence number.
    pub fn issue_load(
        &mut self,
        op: OpCode,
        base: f64,
        offset: i32,
        dest: Option<RegName>,
        station: StationId,
    ) -> Result<u32, SimError> {
        let address = self.effective_address(base, offset, op)?;
        let latency = self.load_total_latency(address);
        let seq = self.lsb.push_load(op, address, latency, dest, station)?;
        debug!(
            "mem: queued {} @{} as seq {} (latency {}, {})",
            op,
            address,
            seq,
            latency,
            if self.cache.is_hit(address) { "hit" } else { "miss" }
        );
        Ok(seq)
    }

    /// Queues a store; returns its buffer sequence number.
    pub fn issue_store(
        &mut self,
        op: OpCode,
        base: f64,
        offset: i32,
        value: f64,
        station: StationId,
    ) -> Result<u32, SimError> {
        let address = self.effective_address(base, offset, op)?;
        let latency = self.store_total_latency(address);
        let seq = self.lsb.push_store(op, address, value, latency, station)?;
        debug!(
            "mem: queued {} @{} as seq {} (latency {}, {})",
            op,
            address,
            seq,
            latency,
            if self.cache.is_hit(address) { "hit" } else { "miss" }
        );
        Ok(seq)
    }

    /// Advances the buffer one cycle and commits every finished operation.
    pub fn tick(&mut self) -> Result<Vec<CompletedOp>, SimError> {
        let completed = self.lsb.tick();
        let mut results = Vec::with_capacity(completed.len());
        for entry in completed {
            results.push(self.commit(entry)?);
        }
        Ok(results)
    }

    fn commit(&mut self, entry: LsbEntry) -> Result<CompletedOp, SimError> {
        let value = if entry.is_load {
            self.read_for_op(entry.op, entry.address)?
        } else {
            self.write_for_op(entry.op, entry.address, entry.value)?;
            0.0
        };
        Ok(CompletedOp {
            station: entry.station,
            dest: entry.dest,
            value,
            op: entry.op,
            is_load: entry.is_load,
            seq: entry.seq,
        })
    }

    fn read_for_op(&mut self, op: OpCode, addr: u32) -> Result<f64, SimError> {
        Ok(match op {
            OpCode::Lw => self.cache.read_word(addr, &mut self.memory)? as i32 as f64,
            OpCode::Ld => self.cache.read_dword(addr, &mut self.memory)? as i64 as f64,
            OpCode::LoadS => {
                f32::from_bits(self.cache.read_word(addr, &mut self.memory)?) as f64
            }
            OpCode::LoadD => f64::from_bits(self.cache.read_dword(addr, &mut self.memory)?),
            _ => {
                return Err(SimError::StructuralHazard(format!(
                    "{} committed as a load",
                    op
                )))
            }
        })
    }

    fn write_for_op(&mut self, op: OpCode, addr: u32, value: f64) -> Result<(), SimError> {
        match op {
            OpCode::Sw => self
                .cache
                .write_word(addr, value as i64 as u32, &mut self.memory),
            OpCode::Sd => self
                .cache
                .write_dword(addr, value as i64 as u64, &mut self.memory),
            OpCode::StoreS => {
                self.cache
                    .write_word(addr, (value as f32).to_bits(), &mut self.memory)
            }
            OpCode::StoreD => self.cache.write_dword(addr, value.to_bits(), &mut self.memory),
            _ => Err(SimError::StructuralHazard(format!(
                "{} committed as a store",
                op
            ))),
        }
    }

    /// True when the buffer cannot accept another operation.
    pub fn lsb_full(&self) -> bool {
        self.lsb.is_full()
    }

    /// True when no memory operations are in flight.
    pub fn lsb_empty(&self) -> bool {
        self.lsb.is_empty()
    }

    /// In-flight operations for display.
    pub fn lsb_entries(&self) -> &[LsbEntry] {
        self.lsb.entries()
    }

    /// Drops in-flight operations owned by flushed stations.
    pub fn purge_stations(&mut self, stations: &[StationId]) {
        self.lsb.purge_stations(stations);
    }

    /// Cache hit/miss counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Per-line cache state for display.
    pub fn cache_lines(&self) -> Vec<CacheLineSnapshot> {
        self.cache.line_snapshots()
    }

    /// Clears in-flight state and the cache; memory contents are preserved.
    pub fn reset(&mut self) {
        self.lsb.clear();
        self.cache.reset();
    }

    // Direct accessors bypass the cache. They exist for preloading test data
    // and inspecting results; they do not touch the hit/miss counters.

    /// Writes a raw word directly to memory.
    pub fn preload_word(&mut self, addr: u32, value: u32) -> Result<(), SimError> {
        self.memory.write_word(addr, value)
    }

    /// Writes a raw doubleword directly to memory.
    pub fn preload_dword(&mut self, addr: u32, value: u64) -> Result<(), SimError> {
        self.memory.write_dword(addr, value)
    }

    /// Writes an f64 bit pattern directly to memory.
    pub fn preload_f64(&mut self, addr: u32, value: f64) -> Result<(), SimError> {
        self.memory.write_dword(addr, value.to_bits())
    }

    /// Writes an f32 bit pattern directly to memory.
    pub fn preload_f32(&mut self, addr: u32, value: f32) -> Result<(), SimError> {
        self.memory.write_word(addr, value.to_bits())
    }

    /// Reads a raw word as the pipeline would see it (dirty cache lines
    /// included). Does not count as an access.
    pub fn inspect_word(&self, addr: u32) -> Result<u32, SimError> {
        self.cache.peek_word(addr, &self.memory)
    }

    /// Reads a raw doubleword as the pipeline would see it. Does not count
    /// as an access.
    pub fn inspect_dword(&self, addr: u32) -> Result<u64, SimError> {
        self.cache.peek_dword(addr, &self.memory)
    }

    /// Reads an f64 value as the pipeline would see it: a dirty cached copy
    /// takes precedence over backing memory. Does not count as an access.
    pub fn inspect_f64(&self, addr: u32) -> Result<f64, SimError> {
        Ok(f64::from_bits(self.cache.peek_dword(addr, &self.memory)?))
    }

    /// Reads an f32 value as the pipeline would see it. Does not count as an
    /// access.
    pub fn inspect_f32(&self, addr: u32) -> Result<f32, SimError> {
        Ok(f32::from_bits(self.cache.peek_word(addr, &self.memory)?))
    }
}
