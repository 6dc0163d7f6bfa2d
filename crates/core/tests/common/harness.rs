//! Test harness: reference configuration and engine builders.
//!
//! The reference configuration matches the scenario setup used throughout
//! the end-to-end tests: 4/2/2 FP add/mul/div stations, 2 integer add, 2
//! load, 2 store, 1 branch; an 8-entry load/store buffer; a 256-byte cache
//! with 16-byte blocks, hit latency 1 and miss penalty 10; load/store base
//! latency 2; and the classic compute latencies (ADD.D 2, MUL.D 10,
//! DIV.D 40, ...).

use std::collections::BTreeMap;

use tomasulo_core::common::RegName;
use tomasulo_core::isa;
use tomasulo_core::{Config, CycleEngine};

/// The reference configuration for end-to-end scenarios.
pub fn scenario_config() -> Config {
    serde_json::from_str(
        r#"{
            "stations": {
                "fp_add": 4, "fp_mul": 2, "fp_div": 2, "int_add": 2,
                "load": 2, "store": 2, "branch": 1
            },
            "lsb_size": 8,
            "cache": {
                "size_bytes": 256, "block_size": 16,
                "hit_latency": 1, "miss_penalty": 10
            },
            "load_latency": 2,
            "store_latency": 2,
            "latencies": {
                "ADD.D": 2, "SUB.D": 2, "MUL.D": 10, "DIV.D": 40,
                "ADD.S": 2, "SUB.S": 2, "MUL.S": 10, "DIV.S": 40,
                "DADDI": 1, "DSUBI": 1, "BEQ": 1, "BNE": 1
            },
            "max_cycles": 10000
        }"#,
    )
    .expect("reference config parses")
}

/// Builds an engine over the reference configuration from assembly text.
pub fn engine_from_asm(source: &str) -> CycleEngine {
    engine_from_asm_with(scenario_config(), source)
}

/// Builds an engine over a custom configuration from assembly text.
pub fn engine_from_asm_with(config: Config, source: &str) -> CycleEngine {
    let program = isa::parse_program(source).expect("program parses");
    CycleEngine::new(config, program).expect("engine builds")
}

/// Applies named register preloads.
pub fn preload(engine: &mut CycleEngine, values: &[(&str, f64)]) {
    let map: BTreeMap<RegName, f64> = values
        .iter()
        .map(|(name, value)| (reg(name), *value))
        .collect();
    engine.preload_registers(map);
}

/// Parses a register name literal.
pub fn reg(name: &str) -> RegName {
    RegName::parse(name).expect("valid register name")
}

/// Float comparison with a small absolute tolerance.
pub fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}
