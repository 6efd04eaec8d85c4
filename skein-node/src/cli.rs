use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::simulate::{self, SimulationParams};

#[derive(Parser)]
#[command(
    name = "skein",
    about = "Skein rollup protocol: block proposal, tokenomics and verification engine",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a default skein.toml
    Init {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        dir: String,
    },
    /// Run a deterministic propose/prove/verify simulation and print a JSON report
    Simulate {
        /// Path to config file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<String>,
        /// Number of proposal attempts
        #[arg(long, default_value_t = 32)]
        blocks: u64,
        /// Prove and verify after every N proposal attempts
        #[arg(long, default_value_t = 4)]
        prove_every: u64,
        /// Seconds between proposals
        #[arg(long, default_value_t = 12)]
        block_time: u64,
        /// Seconds between proposals and their proofs
        #[arg(long, default_value_t = 30)]
        proof_delay: u64,
        /// Provers sharing each proof
        #[arg(long, default_value_t = 1)]
        provers: usize,
    },
}

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(cli: Cli) -> Result<(), NodeError> {
    match cli.command {
        Command::Init { dir } => {
            init_tracing("info");
            NodeConfig::init(&dir)?;
            tracing::info!("configuration initialized in {}", dir);
            Ok(())
        }
        Command::Simulate {
            config,
            blocks,
            prove_every,
            block_time,
            proof_delay,
            provers,
        } => {
            let config = match config {
                Some(path) => NodeConfig::load(&path)?,
                None => NodeConfig::default(),
            };
            init_tracing(&config.logging.level);

            let params = SimulationParams {
                blocks,
                prove_every,
                block_time,
                proof_delay,
                provers,
            };
            let report = simulate::run(config, params)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simulate_args() {
        let cli = Cli::parse_from([
            "skein",
            "simulate",
            "--blocks",
            "10",
            "--prove-every",
            "5",
        ]);
        match cli.command {
            Command::Simulate {
                config,
                blocks,
                prove_every,
                provers,
                ..
            } => {
                assert!(config.is_none());
                assert_eq!(blocks, 10);
                assert_eq!(prove_every, 5);
                assert_eq!(provers, 1);
            }
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn test_parse_init_default_dir() {
        let cli = Cli::parse_from(["skein", "init"]);
        assert!(matches!(cli.command, Command::Init { dir } if dir == "."));
    }
}
