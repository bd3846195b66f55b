//! # CLI Interface
//!
//! Defines the command-line argument structure for `retriever-node` using
//! `clap` derive. Supports three subcommands: `simulate`, `constants`, and
//! `version`. Every `simulate` flag can also be set through a `RETRIEVER_*`
//! environment variable.

use clap::{Parser, Subcommand};
use retriever_protocol::config::DEFAULT_MAX_SUPPLY_WHOLE;

/// Retriever devnet harness.
///
/// Deploys the RTV ledger, the oracle-priced private sale and the creator
/// market in-process, then drives them with a seeded population of
/// investors and traders.
#[derive(Parser, Debug)]
#[command(
    name = "retriever-node",
    about = "Retriever token economy devnet harness",
    version,
    propagate_version = true
)]
pub struct RetrieverNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Retriever node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy a devnet, run the private sale and a concurrent trading
    /// session, audit the market, and print a JSON report.
    Simulate(SimulateArgs),
    /// Print the protocol constants as JSON.
    Constants,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of creators onboarded to the market.
    #[arg(long, env = "RETRIEVER_CREATORS", default_value_t = 4)]
    pub creators: usize,

    /// Number of whitelisted investors who then trade creator tokens.
    #[arg(long, env = "RETRIEVER_TRADERS", default_value_t = 8)]
    pub traders: usize,

    /// Trading rounds; every trader acts once per round.
    #[arg(long, env = "RETRIEVER_ROUNDS", default_value_t = 250)]
    pub rounds: usize,

    /// RNG seed. The same seed yields the same per-trader decisions.
    #[arg(long, env = "RETRIEVER_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Worker threads the traders are split across.
    #[arg(long, env = "RETRIEVER_THREADS", default_value_t = 4)]
    pub threads: usize,

    /// RTV supply cap, in whole tokens.
    #[arg(long, env = "RETRIEVER_MAX_SUPPLY", default_value_t = DEFAULT_MAX_SUPPLY_WHOLE)]
    pub max_supply: u64,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "RETRIEVER_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(
        long,
        env = "RETRIEVER_LOG_LEVEL",
        default_value = "retriever_node=info,retriever_contracts=info"
    )]
    pub log_level: String,

    /// Print Prometheus metrics after the report.
    #[arg(long, env = "RETRIEVER_METRICS")]
    pub metrics: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        RetrieverNodeCli::command().debug_assert();
    }

    #[test]
    fn simulate_flags_parse() {
        let cli = RetrieverNodeCli::parse_from([
            "retriever-node",
            "simulate",
            "--creators",
            "2",
            "--seed",
            "7",
            "--threads",
            "1",
            "--metrics",
        ]);
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.creators, 2);
                assert_eq!(args.seed, 7);
                assert_eq!(args.threads, 1);
                assert!(args.metrics);
                assert_eq!(args.max_supply, DEFAULT_MAX_SUPPLY_WHOLE);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
