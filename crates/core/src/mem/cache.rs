//! Direct-mapped data cache simulator.
//!
//! Write-back, write-allocate, with hit/miss classification available as a
//! pure query so the memory system can freeze an operation's latency at issue
//! time. Address fields for a `block_size`-byte block and `num_lines` lines:
//!
//! ```text
//! offset = addr % block_size
//! index  = (addr / block_size) % num_lines
//! tag    = (addr / block_size) / num_lines
//! ```
//!
//! Doubleword accesses decompose into two independent word accesses at `addr`
//! and `addr + 4`; each one hits or misses on its own, so a doubleword that
//! straddles a block boundary is legal and counts as two accesses in the
//! statistics. Hit/miss counters move only on real reads and writes, never in
//! [`DataCache::is_hit`].

use log::debug;

use crate::common::SimError;
use crate::config::CacheConfig;

use super::byte_mem::ByteMemory;

/// One cache line: tag, state bits, and a copy of the block's bytes.
#[derive(Clone)]
struct CacheBlock {
    valid: bool,
    dirty: bool,
    tag: u32,
    data: Vec<u8>,
}

impl CacheBlock {
    fn new(block_size: usize) -> Self {
        Self {
            valid: false,
            dirty: false,
            tag: 0,
            data: vec![0; block_size],
        }
    }
}

/// Observable state of one cache line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheLineSnapshot {
    /// Line index within the cache.
    pub index: usize,
    /// Valid bit.
    pub valid: bool,
    /// Dirty bit (line modified since fill).
    pub dirty: bool,
    /// Stored tag; meaningless while the line is invalid.
    pub tag: u32,
}

/// Hit/miss counters, in word-access units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of word accesses that hit.
    pub hits: u64,
    /// Number of word accesses that missed.
    pub misses: u64,
}

impl CacheStats {
    /// Total accesses performed.
    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// Miss rate in 0.0..=1.0; 0.0 before any access.
    pub fn miss_rate(&self) -> f64 {
        let total = self.accesses();
        if total == 0 {
            0.0
        } else {
            self.misses as f64 / total as f64
        }
    }
}

/// Direct-mapped, write-back, write-allocate data cache.
pub struct DataCache {
    lines: Vec<CacheBlock>,
    block_size: usize,
    num_lines: usize,
    hit_latency: u64,
    miss_penalty: u64,
    stats: CacheStats,
}

impl DataCache {
    /// Builds the cache from a validated configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let num_lines = config.size_bytes / config.block_size;
        Self {
            lines: (0..num_lines)
                .map(|_| CacheBlock::new(config.block_size))
                .collect(),
            block_size: config.block_size,
            num_lines,
            hit_latency: config.hit_latency,
            miss_penalty: config.miss_penalty,
            stats: CacheStats::default(),
        }
    }

    fn offset_of(&self, addr: u32) -> usize {
        addr as usize % self.block_size
    }

    fn index_of(&self, addr: u32) -> usize {
        (addr as usize / self.block_size) % self.num_lines
    }

    fn tag_of(&self, addr: u32) -> u32 {
        ((addr as usize / self.block_size) / self.num_lines) as u32
    }

    fn block_start(&self, addr: u32) -> u32 {
        (addr as usize / self.block_size * self.block_size) as u32
    }

    /// Pure hit query: valid line with a matching tag. No state mutates,
    /// no counter moves. Used to freeze latency at issue time; an op that
    /// issues on a miss still pays the miss penalty even if the line has
    /// been filled by the time it commits.
    pub fn is_hit(&self, addr: u32) -> bool {
        let line = &self.lines[self.index_of(addr)];
        line.valid && line.tag == self.tag_of(addr)
    }

    /// Hit latency in cycles.
    pub fn hit_latency(&self) -> u64 {
        self.hit_latency
    }

    /// Miss penalty in cycles.
    pub fn miss_penalty(&self) -> u64 {
        self.miss_penalty
    }

    fn check_aligned(addr: u32) -> Result<(), SimError> {
        if addr % 4 != 0 {
            return Err(SimError::MisalignedAccess {
                address: addr as i64,
            });
        }
        Ok(())
    }

    /// Reads a 4-byte word, filling the line from memory on a miss.
    pub fn read_word(&mut self, addr: u32, mem: &mut ByteMemory) -> Result<u32, SimError> {
        Self::check_aligned(addr)?;
        let index = self.index_of(addr);
        let tag = self.tag_of(addr);
        let offset = self.offset_of(addr);

        if !(self.lines[index].valid && self.lines[index].tag == tag) {
            self.stats.misses += 1;
            self.fetch_block(addr, mem)?;
        } else {
            self.stats.hits += 1;
        }

        let b = &self.lines[index].data[offset..offset + 4];
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Writes a 4-byte word, fetching the block first on a miss
    /// (write-allocate) and marking the line dirty.
    pub fn write_word(&mut self, addr: u32, value: u32, mem: &mut ByteMemory) -> Result<(), SimError> {
        Self::check_aligned(addr)?;
        let index = self.index_of(addr);
        let tag = self.tag_of(addr);
        let offset = self.offset_of(addr);

        if !(self.lines[index].valid && self.lines[index].tag == tag) {
            self.stats.misses += 1;
            self.fetch_block(addr, mem)?;
        } else {
            self.stats.hits += 1;
        }

        let line = &mut self.lines[index];
        line.data[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
        line.dirty = true;
        Ok(())
    }

    /// Reads an 8-byte doubleword as two word accesses (high word first).
    pub fn read_dword(&mut self, addr: u32, mem: &mut ByteMemory) -> Result<u64, SimError> {
        let high = self.read_word(addr, mem)?;
        let low = self.read_word(addr + 4, mem)?;
        Ok(((high as u64) << 32) | low as u64)
    }

    /// Writes an 8-byte doubleword as two word accesses (high word first).
    pub fn write_dword(&mut self, addr: u32, value: u64, mem: &mut ByteMemory) -> Result<(), SimError> {
        self.write_word(addr, (value >> 32) as u32, mem)?;
        self.write_word(addr + 4, value as u32, mem)
    }

    /// Fills the line for `addr` from memory, writing back the dirty victim
    /// (if any) to its reconstructed block-start address first.
    fn fetch_block(&mut self, addr: u32, mem: &mut ByteMemory) -> Result<(), SimError> {
        let index = self.index_of(addr);
        let new_tag = self.tag_of(addr);

        if self.lines[index].valid && self.lines[index].dirty {
            let old_tag = self.lines[index].tag;
            let old_block = old_tag as usize * self.num_lines + index;
            let old_start = (old_block * self.block_size) as u32;
            debug!(
                "cache: writing back dirty line {} (tag {}) to {:#x}",
                index, old_tag, old_start
            );
            let data = self.lines[index].data.clone();
            mem.write_bytes(old_start, &data)?;
        }

        let start = self.block_start(addr);
        let bytes = mem.read_bytes(start, self.block_size)?.to_vec();
        let line = &mut self.lines[index];
        line.data.copy_from_slice(&bytes);
        line.tag = new_tag;
        line.valid = true;
        line.dirty = false;
        Ok(())
    }

    /// Reads a word without counting an access or changing any state: a
    /// valid matching line supplies the bytes, otherwise backing memory does.
    /// Used by observers so inspection never skews the statistics.
    pub fn peek_word(&self, addr: u32, mem: &ByteMemory) -> Result<u32, SimError> {
        Self::check_aligned(addr)?;
        let index = self.index_of(addr);
        let line = &self.lines[index];
        if line.valid && line.tag == self.tag_of(addr) {
            let offset = self.offset_of(addr);
            let b = &line.data[offset..offset + 4];
            Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        } else {
            mem.read_word(addr)
        }
    }

    /// Doubleword form of [`DataCache::peek_word`].
    pub fn peek_dword(&self, addr: u32, mem: &ByteMemory) -> Result<u64, SimError> {
        let high = self.peek_word(addr, mem)?;
        let low = self.peek_word(addr + 4, mem)?;
        Ok(((high as u64) << 32) | low as u64)
    }

    /// Current hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Clears the hit/miss counters; cache contents are untouched.
    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    /// Invalidates every line and clears the counters.
    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.valid = false;
            line.dirty = false;
            line.tag = 0;
        }
        self.stats = CacheStats::default();
    }

    /// Number of lines.
    pub fn num_lines(&self) -> usize {
        self.num_lines
    }

    /// Block size in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Per-line observable state for display.
    pub fn line_snapshots(&self) -> Vec<CacheLineSnapshot> {
        self.lines
            .iter()
            .enumerate()
            .map(|(index, line)| CacheLineSnapshot {
                index,
                valid: line.valid,
                dirty: line.dirty,
                tag: line.tag,
            })
            .collect()
    }
}
