// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Retriever Node
//!
//! Entry point for the `retriever-node` binary. Parses CLI arguments,
//! initializes logging and metrics, and dispatches to a subcommand.
//!
//! The binary supports three subcommands:
//!
//! - `simulate`  : deploy a devnet in-process and drive it end to end
//! - `constants` : print the protocol constants as JSON
//! - `version`   : print build version information

mod cli;
mod logging;
mod metrics;
mod simulation;

use anyhow::{Context, Result};
use clap::Parser;

use retriever_protocol::config::ProtocolParameters;

use cli::{Commands, RetrieverNodeCli};
use logging::LogFormat;
use metrics::EngineMetrics;
use simulation::SimulationConfig;

fn main() -> Result<()> {
    let cli = RetrieverNodeCli::parse();

    match cli.command {
        Commands::Simulate(args) => simulate(args),
        Commands::Constants => print_constants(),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Runs a full devnet simulation and prints its report to stdout.
fn simulate(args: cli::SimulateArgs) -> Result<()> {
    logging::init_logging(&args.log_level, LogFormat::from_str_lossy(&args.log_format));

    tracing::info!(
        creators = args.creators,
        traders = args.traders,
        rounds = args.rounds,
        seed = args.seed,
        threads = args.threads,
        max_supply = args.max_supply,
        "starting simulation"
    );

    let metrics = EngineMetrics::new().context("failed to register metrics")?;
    let config = SimulationConfig::from(&args);
    let report = simulation::run(&config, &metrics).context("simulation failed")?;

    tracing::info!(
        elapsed_ms = report.elapsed_ms as u64,
        total_reserve = %report.market.audit.total_reserve,
        sale_remaining = %report.sale.remaining,
        "simulation complete"
    );

    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    println!("{json}");

    if args.metrics {
        let text = metrics.encode().context("failed to encode metrics")?;
        print!("{text}");
    }
    Ok(())
}

/// Prints [`ProtocolParameters::current`] as pretty JSON.
fn print_constants() -> Result<()> {
    let json = serde_json::to_string_pretty(&ProtocolParameters::current())
        .context("failed to serialize protocol parameters")?;
    println!("{json}");
    Ok(())
}

/// Prints version information for the binary and protocol.
fn print_version() {
    println!("retriever-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", retriever_protocol::config::PROTOCOL_VERSION);
    println!("rustc          {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
