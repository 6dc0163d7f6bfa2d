//! Tomasulo cycle-accurate simulator CLI.
//!
//! This binary is the driver around the simulation core. It performs:
//! 1. **Loading:** Parse an assembly program and a JSON configuration.
//! 2. **Preloading:** Apply register and memory preloads from the command line.
//! 3. **Running:** Step the engine to completion (bounded by max cycles) and
//!    print the per-instruction timing table, final registers, and statistics.

use std::collections::BTreeMap;
use std::{fs, process};

use clap::{Parser, Subcommand};

use tomasulo_core::common::RegName;
use tomasulo_core::isa;
use tomasulo_core::{Config, CycleEngine, SimError};

#[derive(Parser, Debug)]
#[command(
    name = "tomsim",
    author,
    version,
    about = "Tomasulo cycle-accurate simulator",
    long_about = "Run an assembly program through the Tomasulo core.\n\n\
        All execution parameters come from the JSON configuration; the engine\n\
        refuses to run with an incomplete one.\n\nExamples:\n  \
        tomsim run -f prog.asm -c config.json\n  \
        tomsim run -f prog.asm -c config.json --preload R2=1000 --mem 1000=f64:3.14"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a program to completion and print the results.
    Run {
        /// Assembly program to execute.
        #[arg(short, long)]
        file: String,

        /// JSON configuration (stations, cache, latencies, ...).
        #[arg(short, long)]
        config: String,

        /// Register preload, e.g. `R2=1000` or `F4=1.5`. Repeatable.
        #[arg(long = "preload", value_name = "REG=VALUE")]
        preloads: Vec<String>,

        /// Memory preload, e.g. `1000=f64:3.14`, `96=f32:1.5`, `200=w:42`,
        /// or `208=d:7`. Repeatable.
        #[arg(long = "mem", value_name = "ADDR=KIND:VALUE")]
        mem_preloads: Vec<String>,

        /// Override the configuration's cycle ceiling.
        #[arg(long)]
        max_cycles: Option<u64>,

        /// Print the engine's per-cycle event log after the run.
        #[arg(long)]
        events: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            file,
            config,
            preloads,
            mem_preloads,
            max_cycles,
            events,
        } => cmd_run(&file, &config, &preloads, &mem_preloads, max_cycles, events),
    };

    if let Err(message) = result {
        eprintln!("error: {}", message);
        process::exit(1);
    }
}

fn cmd_run(
    file: &str,
    config_path: &str,
    preloads: &[String],
    mem_preloads: &[String],
    max_cycles: Option<u64>,
    events: bool,
) -> Result<(), String> {
    let source =
        fs::read_to_string(file).map_err(|e| format!("reading program {}: {}", file, e))?;
    let config_text = fs::read_to_string(config_path)
        .map_err(|e| format!("reading config {}: {}", config_path, e))?;

    let mut config: Config =
        serde_json::from_str(&config_text).map_err(|e| format!("parsing config: {}", e))?;
    if let Some(ceiling) = max_cycles {
        config.max_cycles = ceiling;
    }

    let program = isa::parse_program(&source).map_err(|e| e.to_string())?;
    if program.is_empty() {
        return Err("program contains no instructions".to_string());
    }

    let mut engine = CycleEngine::new(config, program).map_err(|e| e.to_string())?;
    engine.preload_registers(parse_register_preloads(preloads)?);
    apply_memory_preloads(&mut engine, mem_preloads)?;

    match engine.run() {
        Ok(cycles) => println!("[*] Completed in {} cycles\n", cycles),
        Err(SimError::NonTerminating { cycles }) => {
            eprintln!("[!] Did not terminate within {} cycles", cycles);
            eprintln!("    (check that every compute op has a configured latency)");
        }
        Err(e) => return Err(e.to_string()),
    }

    print_timing_table(&engine);
    print_registers(&engine);

    if events {
        println!("EVENT LOG");
        for line in engine.events() {
            println!("  {}", line);
        }
        println!();
    }

    engine.stats().print(&engine.cache_stats());
    Ok(())
}

fn parse_register_preloads(args: &[String]) -> Result<BTreeMap<RegName, f64>, String> {
    let mut out = BTreeMap::new();
    for arg in args {
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("preload '{}' is not REG=VALUE", arg))?;
        let reg = RegName::parse(name.trim()).map_err(|e| e.to_string())?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| format!("preload '{}' has a non-numeric value", arg))?;
        out.insert(reg, value);
    }
    Ok(out)
}

fn apply_memory_preloads(engine: &mut CycleEngine, args: &[String]) -> Result<(), String> {
    for arg in args {
        let (addr, rest) = arg
            .split_once('=')
            .ok_or_else(|| format!("mem preload '{}' is not ADDR=KIND:VALUE", arg))?;
        let addr: u32 = addr
            .trim()
            .parse()
            .map_err(|_| format!("mem preload '{}' has a bad address", arg))?;
        let (kind, value) = rest
            .split_once(':')
            .ok_or_else(|| format!("mem preload '{}' is missing KIND:", arg))?;
        let mem = engine.memory_mut();
        let result = match kind.trim() {
            "f64" => value
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("bad f64 in '{}'", arg))
                .and_then(|v| mem.preload_f64(addr, v).map_err(|e| e.to_string())),
            "f32" => value
                .trim()
                .parse::<f32>()
                .map_err(|_| format!("bad f32 in '{}'", arg))
                .and_then(|v| mem.preload_f32(addr, v).map_err(|e| e.to_string())),
            "w" => value
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("bad word in '{}'", arg))
                .and_then(|v| mem.preload_word(addr, v as u32).map_err(|e| e.to_string())),
            "d" => value
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("bad doubleword in '{}'", arg))
                .and_then(|v| mem.preload_dword(addr, v as u64).map_err(|e| e.to_string())),
            other => Err(format!("unknown mem preload kind '{}'", other)),
        };
        result?;
    }
    Ok(())
}

fn print_timing_table(engine: &CycleEngine) {
    println!("INSTRUCTION TIMING");
    println!(
        "  {:<4} {:<28} {:>6} {:>11} {:>9} {:>6}",
        "id", "instruction", "issue", "exec_start", "exec_end", "write"
    );
    for instr in engine.program() {
        let t = engine.timing_of(instr.id);
        let fmt = |v: Option<u64>| v.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<4} {:<28} {:>6} {:>11} {:>9} {:>6}",
            instr.id,
            instr.to_string(),
            fmt(t.issue),
            fmt(t.exec_start),
            fmt(t.exec_end),
            fmt(t.write)
        );
    }
    println!();
}

fn print_registers(engine: &CycleEngine) {
    println!("REGISTERS (non-zero)");
    for (name, reg) in engine.register_snapshots() {
        if reg.value != 0.0 || reg.qi.is_some() {
            let qi = reg
                .qi
                .map(|t| format!(" (qi={})", t))
                .unwrap_or_default();
            println!("  {:<4} = {}{}", name.to_string(), reg.value, qi);
        }
    }
    println!();
}
