// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! chowkidar - a multi-agent smart-doorbell pipeline.
//!
//! Binary entry point. Exit codes: 0 normal, 1 configuration error,
//! 2 store corruption detected at startup, 3 fatal pipeline crash.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod serve;

/// chowkidar - a multi-agent smart-doorbell pipeline.
#[derive(Parser, Debug)]
#[command(name = "chowkidar", version, about, long_about = None)]
struct Cli {
    /// Explicit config file path (defaults to the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the doorbell pipeline and gateway.
    Serve,
    /// Print the resolved configuration (secrets redacted).
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => chowkidar_config::load_config_from_path(path),
        None => chowkidar_config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    match cli.command {
        Commands::Serve => match serve::run_serve(config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::from(e.exit_code())
            }
        },
        Commands::Config => {
            // ProviderConfig redacts the reply key from Debug output.
            println!("{config:#?}");
            ExitCode::SUCCESS
        }
    }
}
