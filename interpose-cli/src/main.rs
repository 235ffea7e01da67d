//! # interpose CLI
//!
//! Runs interception scenarios described in YAML: an object tree, stub
//! methods, fluent rules and a list of accesses to perform through a proxy.

mod commands;
mod scenario;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "interpose")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a scenario and print step results and the event trace
    Run {
        /// Scenario file (YAML or JSON)
        scenario: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Validate a scenario without executing its steps
    Check {
        /// Scenario file (YAML or JSON)
        scenario: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine readable
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run { scenario, json } => commands::run_scenario(&scenario, json),
        Commands::Check { scenario, json } => commands::check_scenario(&scenario, json),
    }
}
