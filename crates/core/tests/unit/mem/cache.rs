//! Data cache unit tests.
//!
//! Exercises the direct-mapped, write-back, write-allocate cache: hit/miss
//! classification, eviction write-back, block-straddling doublewords, and
//! the purity of the issue-time hit query.
//!
//! Geometry used throughout: 256 bytes, 16-byte blocks -> 16 lines.
//!   index = (addr / 16) % 16, tag = (addr / 16) / 16
//! Addresses 256 bytes apart collide on the same line with different tags.

use tomasulo_core::config::CacheConfig;
use tomasulo_core::mem::{ByteMemory, DataCache};

fn test_cache() -> DataCache {
    DataCache::new(&CacheConfig {
        size_bytes: 256,
        block_size: 16,
        hit_latency: 1,
        miss_penalty: 10,
    })
}

#[test]
fn cold_miss_then_warm_hit() {
    let mut mem = ByteMemory::new();
    let mut cache = test_cache();
    mem.write_word(0x100, 0xDEAD_BEEF).unwrap();

    assert!(!cache.is_hit(0x100));
    assert_eq!(cache.read_word(0x100, &mut mem).unwrap(), 0xDEAD_BEEF);
    assert_eq!(cache.stats().misses, 1);

    assert!(cache.is_hit(0x100));
    assert_eq!(cache.read_word(0x100, &mut mem).unwrap(), 0xDEAD_BEEF);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().accesses(), 2);
}

#[test]
fn same_block_different_offset_hits() {
    let mut mem = ByteMemory::new();
    let mut cache = test_cache();

    cache.read_word(0x100, &mut mem).unwrap();
    // 0x10C is in the same 16-byte block as 0x100.
    cache.read_word(0x10C, &mut mem).unwrap();
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().misses, 1);
}

#[test]
fn is_hit_is_pure() {
    let mut mem = ByteMemory::new();
    let mut cache = test_cache();

    for _ in 0..5 {
        assert!(!cache.is_hit(0x40));
    }
    assert_eq!(cache.stats().accesses(), 0, "is_hit must not count accesses");

    cache.read_word(0x40, &mut mem).unwrap();
    let stats = cache.stats();
    for _ in 0..5 {
        assert!(cache.is_hit(0x40));
    }
    assert_eq!(cache.stats(), stats, "is_hit must not mutate state");
}

#[test]
fn write_allocate_fetches_then_dirties() {
    let mut mem = ByteMemory::new();
    let mut cache = test_cache();

    cache.write_word(0x80, 7, &mut mem).unwrap();
    assert_eq!(cache.stats().misses, 1, "store miss fetches the block first");
    let line = cache
        .line_snapshots()
        .into_iter()
        .find(|l| l.valid)
        .expect("one valid line");
    assert!(line.dirty, "write-back cache marks the line dirty");

    // The write hit the cache, not backing memory.
    assert_eq!(mem.read_word(0x80).unwrap(), 0);
}

#[test]
fn word_roundtrip_survives_eviction() {
    let mut mem = ByteMemory::new();
    let mut cache = test_cache();

    // Dirty the line for address 0.
    cache.write_word(0, 0x1234_5678, &mut mem).unwrap();
    // 256 maps to the same line with a different tag: evicts and writes back.
    cache.read_word(256, &mut mem).unwrap();
    assert_eq!(
        mem.read_word(0).unwrap(),
        0x1234_5678,
        "dirty victim written back to its block-start address"
    );
    // Reading address 0 again refetches the written-back data.
    assert_eq!(cache.read_word(0, &mut mem).unwrap(), 0x1234_5678);
}

#[test]
fn dword_roundtrip_survives_eviction() {
    let mut mem = ByteMemory::new();
    let mut cache = test_cache();

    cache
        .write_dword(8, 0xAABB_CCDD_1122_3344, &mut mem)
        .unwrap();
    cache.read_word(256 + 8, &mut mem).unwrap();
    assert_eq!(cache.read_dword(8, &mut mem).unwrap(), 0xAABB_CCDD_1122_3344);
}

#[test]
fn straddling_dword_is_two_independent_accesses() {
    let mut mem = ByteMemory::new();
    let mut cache = test_cache();
    mem.write_dword(12, 0x0102_0304_0506_0708).unwrap();

    // Words at 12 and 16 live in different blocks: two cold misses.
    assert_eq!(cache.read_dword(12, &mut mem).unwrap(), 0x0102_0304_0506_0708);
    assert_eq!(cache.stats().misses, 2);
    assert_eq!(cache.stats().hits, 0);

    // Both blocks now resident: two hits.
    cache.read_dword(12, &mut mem).unwrap();
    assert_eq!(cache.stats().hits, 2);
    assert_eq!(cache.stats().accesses(), 4);
}

#[test]
fn straddling_dword_can_partially_hit() {
    let mut mem = ByteMemory::new();
    let mut cache = test_cache();

    // Warm only the first of the two blocks.
    cache.read_word(12, &mut mem).unwrap();
    cache.reset_stats();

    cache.read_dword(12, &mut mem).unwrap();
    assert_eq!(cache.stats().hits, 1, "first word hits");
    assert_eq!(cache.stats().misses, 1, "second word misses");
}

#[test]
fn misaligned_word_rejected() {
    let mut mem = ByteMemory::new();
    let mut cache = test_cache();
    assert!(cache.read_word(6, &mut mem).is_err());
    assert!(cache.write_word(3, 1, &mut mem).is_err());
}

#[test]
fn peek_sees_dirty_line_without_counting() {
    let mut mem = ByteMemory::new();
    let mut cache = test_cache();

    cache.write_word(0x20, 99, &mut mem).unwrap();
    let stats = cache.stats();
    assert_eq!(cache.peek_word(0x20, &mem).unwrap(), 99);
    // Unresident address falls through to backing memory.
    mem.write_word(0x400, 55).unwrap();
    assert_eq!(cache.peek_word(0x400, &mem).unwrap(), 55);
    assert_eq!(cache.stats(), stats);
}
