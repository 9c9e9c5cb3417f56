mod scenario;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use phasetrack_tracker::TrackerConfig;
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "phasetrack-cli", about = "Run cause tracking scenarios")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Tracker configuration (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the effective configuration
    Info,
    /// Run a canned scenario against a fresh world
    Scenario {
        #[arg(value_enum)]
        name: Scenario,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = match &cli.config {
        Some(path) => TrackerConfig::from_yaml_file(path)?,
        None => TrackerConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("phasetrack-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("configuration:");
            print!("{}", config.to_yaml_string()?);
        }
        Commands::Scenario { name } => {
            tracing::info!(scenario = ?name, "running scenario");
            let report = scenario::run(name, config)?;
            print!("{report}");
        }
    }

    Ok(())
}
