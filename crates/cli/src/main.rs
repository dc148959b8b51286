//! Memory hierarchy simulator CLI.
//!
//! This binary replays memory access traces through the cache model. It performs:
//! 1. **Trace run:** Load a JSON configuration and a JSON trace, run to
//!    completion and print per-operation results and statistics.
//! 2. **Config dump:** Print the default configuration as JSON, as a starting
//!    point for custom configurations.
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (e.g. `RUST_LOG=rvmem_core=debug`).

use std::process;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rvmem_core::config::Config;
use rvmem_core::sim::{SimReport, Simulator, Trace, TraceOutcome};
use rvmem_core::stats::STATS_SECTIONS;

#[derive(Parser, Debug)]
#[command(
    name = "memsim",
    author,
    version,
    about = "Cycle-level cache and bus simulator for a 32-bit RISC core",
    long_about = "Replay a memory access trace through instruction and data caches, a store buffer and a shared bus.\n\nExamples:\n  memsim config > system.json\n  memsim run --trace trace.json\n  memsim run --config system.json --trace trace.json --json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace.
    Run {
        /// System configuration (JSON). Built-in defaults when omitted.
        #[arg(short, long)]
        config: Option<String>,

        /// Trace to replay (JSON array of operations).
        #[arg(short, long)]
        trace: String,

        /// Override `general.max_cycles`.
        #[arg(long)]
        max_cycles: Option<u64>,

        /// Print the report as JSON instead of text.
        #[arg(long)]
        json: bool,

        /// Statistics sections to print (summary, cache, bus). All when omitted.
        #[arg(long, value_delimiter = ',')]
        sections: Vec<String>,
    },

    /// Print the default configuration as JSON.
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, trace, max_cycles, json, sections } => {
            cmd_run(config.as_deref(), &trace, max_cycles, json, &sections);
        }
        Commands::Config => cmd_config(),
    }
}

/// Loads the configuration and trace, runs the simulation and prints the report.
///
/// Exits with code 1 on configuration, trace or cycle-limit errors.
fn cmd_run(config_path: Option<&str>, trace_path: &str, max_cycles: Option<u64>, json: bool, sections: &[String]) {
    if let Some(bad) = sections.iter().find(|s| !STATS_SECTIONS.contains(&s.as_str())) {
        fail(&format!("unknown stats section '{bad}' (expected one of {})", STATS_SECTIONS.join(", ")));
    }

    let config = match config_path {
        Some(path) => Config::from_file(path).unwrap_or_else(|e| fail(&e.to_string())),
        None => Config::default(),
    };
    let trace = Trace::from_file(trace_path).unwrap_or_else(|e| fail(&e.to_string()));

    let mut sim = Simulator::new(&config).unwrap_or_else(|e| fail(&e.to_string()));
    if let Some(limit) = max_cycles {
        sim = sim.with_max_cycles(limit);
    }

    info!(trace = trace_path, ops = trace.len(), "starting simulation");
    let report = sim.run(&trace).unwrap_or_else(|e| fail(&e.to_string()));

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => fail(&e.to_string()),
        }
    } else {
        print_report(&report, sections);
    }
}

/// Prints the default configuration.
fn cmd_config() {
    match serde_json::to_string_pretty(&Config::default()) {
        Ok(text) => println!("{text}"),
        Err(e) => fail(&e.to_string()),
    }
}

fn print_report(report: &SimReport, sections: &[String]) {
    for r in &report.results {
        let outcome = match r.outcome {
            TraceOutcome::Value { value } => format!("{value:#010x}"),
            TraceOutcome::Done => "done".to_string(),
            TraceOutcome::Fault { fault } => fault.to_string(),
            TraceOutcome::Misaligned => "misaligned".to_string(),
        };
        let op = format!("{:?}", r.op);
        println!("[{:>8}] #{:<5} {op:<40} {outcome}", r.cycle, r.index);
    }
    for f in &report.faults {
        println!("[{:>8}] fault: {}", f.cycle, f.fault);
    }
    report.stats.print_sections(sections);
}

fn fail(msg: &str) -> ! {
    eprintln!("\n[!] FATAL: {msg}");
    process::exit(1);
}
