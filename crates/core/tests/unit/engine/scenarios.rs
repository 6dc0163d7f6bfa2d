//! End-to-end scenarios over the reference configuration.
//!
//! Programs run to completion and assertions land on final architectural
//! state, relative timing, and counters — not on absolute cycle numbers,
//! except where the contract pins them (issue is in-order, one per cycle).

use tomasulo_core::SimError;

use crate::common::harness::{approx, engine_from_asm, engine_from_asm_with, preload, reg, scenario_config};

#[test]
fn raw_chain_with_memory_and_all_fp_units() {
    let mut engine = engine_from_asm(
        "L.D F6, 0(R2)\n\
         L.D F2, 8(R2)\n\
         MUL.D F0, F2, F4\n\
         SUB.D F8, F2, F6\n\
         DIV.D F10, F0, F6\n\
         ADD.D F6, F8, F2\n\
         S.D F6, 8(R2)\n",
    );
    preload(&mut engine, &[("R2", 1000.0), ("F4", 1.5)]);
    engine.memory_mut().preload_f64(1000, 3.14).unwrap();
    engine.memory_mut().preload_f64(1008, 2.71).unwrap();

    engine.run().unwrap();

    // Issue is strictly in-order, one instruction per cycle, no stalls here.
    for id in 1..=7u32 {
        assert_eq!(engine.timing_of(id).issue, Some(id as u64));
    }

    // Final architectural state.
    assert!(approx(engine.register_value(reg("F2")), 2.71));
    assert!(approx(engine.register_value(reg("F0")), 2.71 * 1.5));
    assert!(approx(engine.register_value(reg("F8")), 2.71 - 3.14));
    assert!(approx(
        engine.register_value(reg("F10")),
        (2.71 * 1.5) / 3.14
    ));
    // ADD.D renamed F6 after the first load; the load's late broadcast must
    // not clobber the newer value.
    assert!(approx(engine.register_value(reg("F6")), (2.71 - 3.14) + 2.71));
    // The store pushed the ADD.D result to memory.
    assert!(approx(engine.memory().inspect_f64(1008).unwrap(), 2.28));

    // MUL completes only after the second load's value is forwarded, and
    // DIV only after MUL.
    let load2_write = engine.timing_of(2).write.unwrap();
    let mul = engine.timing_of(3);
    assert!(mul.exec_start.unwrap() > load2_write);
    let div = engine.timing_of(5);
    assert!(div.exec_start.unwrap() > mul.write.unwrap());

    // Two doubleword loads and one doubleword store: 6 word accesses, of
    // which the two block fills miss.
    let cache = engine.cache_stats();
    assert_eq!(cache.accesses(), 6);
    assert_eq!(cache.misses, 2);
    assert_eq!(cache.hits, 4);
}

#[test]
fn waw_rename_keeps_younger_value() {
    let mut engine = engine_from_asm(
        "DADDI R1, R0, 5\n\
         DADDI R1, R0, 7\n",
    );
    engine.run().unwrap();

    assert!(approx(engine.register_value(reg("R1")), 7.0));
    // Both instructions still wrote back (the older broadcast was skipped
    // at the register, not dropped from the bus).
    assert!(engine.timing_of(1).write.is_some());
    assert!(engine.timing_of(2).write.is_some());
    assert!(
        engine.timing_of(1).write.unwrap() < engine.timing_of(2).write.unwrap(),
        "FCFS bus preserves completion order"
    );
}

#[test]
fn taken_beq_flushes_fallthrough() {
    // BEQ compares equal values: taken, so the R3 write must never land.
    let mut engine = engine_from_asm(
        "DADDI R1, R0, 1\n\
         DADDI R2, R0, 1\n\
         BEQ R1, R2, SKIP\n\
         DADDI R3, R0, 9\n\
         SKIP: DADDI R4, R0, 4\n",
    );
    engine.run().unwrap();

    assert!(approx(engine.register_value(reg("R3")), 0.0));
    assert!(approx(engine.register_value(reg("R4")), 4.0));
    assert_eq!(engine.stats().branches_resolved, 1);
    assert_eq!(engine.stats().branches_taken, 1);
}

#[test]
fn taken_bne_skips_flushed_instruction() {
    let mut engine = engine_from_asm(
        "DADDI R1, R0, 1\n\
         DADDI R2, R0, 2\n\
         BNE R1, R2, TGT\n\
         DADDI R3, R0, 9\n\
         TGT: DADDI R4, R0, 4\n",
    );
    engine.run().unwrap();

    assert!(approx(engine.register_value(reg("R3")), 0.0), "R3 never written");
    assert!(approx(engine.register_value(reg("R4")), 4.0));
    assert_eq!(engine.stats().branches_taken, 1);
    // Issue halted behind the branch, so the fall-through was never issued.
    assert_eq!(engine.timing_of(4).issue, None);
    // The branch's write strictly precedes the target's issue.
    let branch_write = engine.timing_of(3).write.unwrap();
    let target_issue = engine.timing_of(5).issue.unwrap();
    assert!(target_issue >= branch_write);
}

#[test]
fn not_taken_branch_leaves_no_residue() {
    let mut engine = engine_from_asm(
        "DADDI R1, R0, 1\n\
         BEQ R1, R0, 3\n\
         DADDI R3, R0, 9\n",
    );
    engine.run().unwrap();

    assert!(approx(engine.register_value(reg("R3")), 9.0));
    assert_eq!(engine.stats().branches_resolved, 1);
    assert_eq!(engine.stats().branches_taken, 0);
    assert_eq!(engine.stats().instructions_flushed, 0);

    // No pipeline side-effect beyond the branch station's lifecycle.
    assert!(engine.station_snapshots().iter().all(|s| !s.busy));
    assert!(engine
        .register_snapshots()
        .iter()
        .all(|(_, r)| r.qi.is_none()));
}

#[test]
fn backward_branch_executes_a_loop() {
    // R1 counts 3 down to 0; BNE loops back while R1 != 0.
    let mut engine = engine_from_asm(
        "DADDI R1, R0, 3\n\
         LOOP: DSUBI R1, R1, 1\n\
         BNE R1, R0, LOOP\n\
         DADDI R2, R0, 1\n",
    );
    engine.run().unwrap();

    assert!(approx(engine.register_value(reg("R1")), 0.0));
    assert!(approx(engine.register_value(reg("R2")), 1.0));
    assert_eq!(engine.stats().branches_resolved, 3);
    assert_eq!(engine.stats().branches_taken, 2);
}

#[test]
fn store_then_load_same_address_orders_and_forwards() {
    let mut engine = engine_from_asm(
        "S.D F1, 0(R2)\n\
         L.D F3, 0(R2)\n",
    );
    preload(&mut engine, &[("R2", 100.0), ("F1", 42.0)]);
    engine.run().unwrap();

    assert!(approx(engine.register_value(reg("F3")), 42.0));
    let store_commit = engine.timing_of(1).exec_end.unwrap();
    let load_commit = engine.timing_of(2).exec_end.unwrap();
    assert!(
        load_commit > store_commit,
        "overlapping ops commit in program order"
    );
}

#[test]
fn repeated_load_hits_after_cold_miss() {
    let mut engine = engine_from_asm(
        "LW R1, 0(R2)\n\
         LW R3, 0(R2)\n",
    );
    preload(&mut engine, &[("R2", 100.0)]);
    engine.memory_mut().preload_word(100, 7).unwrap();
    engine.run().unwrap();

    assert!(approx(engine.register_value(reg("R1")), 7.0));
    assert!(approx(engine.register_value(reg("R3")), 7.0));
    let cache = engine.cache_stats();
    assert_eq!(cache.misses, 1, "first access misses");
    assert_eq!(cache.hits, 1, "second access hits the filled line");
}

#[test]
fn structural_hazard_stalls_then_reuses_freed_station() {
    let mut config = scenario_config();
    config.stations.fp_add = 1;
    let mut engine = engine_from_asm_with(
        config,
        "ADD.D F2, F0, F0\n\
         ADD.D F4, F0, F0\n",
    );
    engine.run().unwrap();

    let first = engine.timing_of(1);
    let second = engine.timing_of(2);
    assert!(engine.stats().structural_stalls > 0);
    // A station freed by a broadcast in cycle N is issuable in cycle N.
    assert_eq!(second.issue.unwrap(), first.write.unwrap());
}

#[test]
fn full_lsb_blocks_memory_issue() {
    let mut config = scenario_config();
    config.lsb_size = 1;
    let mut engine = engine_from_asm_with(
        config,
        "LW R1, 0(R0)\n\
         LW R2, 64(R0)\n",
    );
    engine.run().unwrap();

    assert!(engine.stats().structural_stalls > 0);
    let first = engine.timing_of(1);
    let second = engine.timing_of(2);
    // The second load sat at the front until the buffer drained.
    assert!(second.issue.unwrap() >= first.exec_end.unwrap());
}

#[test]
fn deferred_load_waits_for_base_register() {
    // The load's base register is produced by the DADDI in front of it.
    let mut engine = engine_from_asm(
        "DADDI R2, R0, 100\n\
         LW R1, 0(R2)\n",
    );
    engine.memory_mut().preload_word(100, 5).unwrap();
    engine.run().unwrap();

    assert!(approx(engine.register_value(reg("R1")), 5.0));
    let daddi_write = engine.timing_of(1).write.unwrap();
    let load = engine.timing_of(2);
    assert!(
        load.exec_start.unwrap() > daddi_write,
        "load dispatches only after its base arrives on the bus"
    );
}

#[test]
fn deferred_store_waits_for_data_register() {
    let mut engine = engine_from_asm(
        "DADDI R3, R0, 9\n\
         SW R3, 200(R0)\n",
    );
    engine.run().unwrap();

    assert_eq!(engine.memory().inspect_word(200).unwrap(), 9);
    let daddi_write = engine.timing_of(1).write.unwrap();
    let store = engine.timing_of(2);
    assert!(store.exec_start.unwrap() > daddi_write);
}

#[test]
fn unconfigured_latency_never_terminates() {
    let mut config = scenario_config();
    config.latencies.remove(&tomasulo_core::isa::OpCode::MulD);
    config.max_cycles = 200;
    let mut engine = engine_from_asm_with(config, "MUL.D F0, F2, F4\n");

    match engine.run() {
        Err(SimError::NonTerminating { cycles }) => assert_eq!(cycles, 200),
        other => panic!("expected NonTerminating, got {:?}", other),
    }
}

#[test]
fn reset_reapplies_preloads_and_reruns() {
    let mut engine = engine_from_asm("DADDI R1, R2, 5\n");
    preload(&mut engine, &[("R2", 10.0)]);
    engine.run().unwrap();
    assert!(approx(engine.register_value(reg("R1")), 15.0));

    engine.reset();
    assert_eq!(engine.cycle(), 0);
    assert!(!engine.is_complete());
    assert!(approx(engine.register_value(reg("R2")), 10.0));
    assert!(approx(engine.register_value(reg("R1")), 0.0));

    engine.run().unwrap();
    assert!(approx(engine.register_value(reg("R1")), 15.0));
}
