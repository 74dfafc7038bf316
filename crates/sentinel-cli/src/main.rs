//! Evaluation Sentinel CLI - config validation and offline replay

mod replay;

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sentinel_core::{Sentinel, SentinelConfig};

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "Evaluation Sentinel - bias and diversity checks for evaluator agent pools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Check configuration validity
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "config/sentinel.toml")]
        config: PathBuf,
    },
    /// Replay recorded batches through a Sentinel and print the results as JSON
    Replay {
        /// JSON file with recorded batches
        #[arg(short, long)]
        input: PathBuf,
        /// Configuration file path (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Seed for the diversity perturbation
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Check { config }) => {
            let loaded = SentinelConfig::load(&config)
                .with_context(|| format!("invalid configuration {}", config.display()))?;
            println!("Configuration OK: {}", config.display());
            println!("{}", serde_json::to_string_pretty(&loaded)?);
        }
        Some(Commands::Replay {
            input,
            config,
            seed,
        }) => {
            let config = match config {
                Some(path) => SentinelConfig::load(&path)
                    .with_context(|| format!("invalid configuration {}", path.display()))?,
                None => SentinelConfig::default(),
            };
            let mut sentinel = match seed {
                Some(seed) => Sentinel::with_seed(config, seed)?,
                None => Sentinel::new(config)?,
            };

            let raw = fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let batches: replay::ReplayInput = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", input.display()))?;

            let report = replay::run(&mut sentinel, &batches);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        None => {
            println!(
                "Evaluation Sentinel v{} - Use --help for commands",
                env!("CARGO_PKG_VERSION")
            );
        }
    }

    Ok(())
}
