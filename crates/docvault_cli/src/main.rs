//! DocVault command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration, start logging, and run one subcommand.
//! - Map failures to stable exit codes.

use clap::Parser;

mod cli;
mod commands;
mod config;

use crate::cli::Cli;
use crate::commands::{run, CliError};
use crate::config::CliConfig;

fn main() {
    let cli = Cli::parse();
    let config = CliConfig::from_args(&cli.global);

    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = docvault_core::init_logging(&config.log_level, log_dir) {
            let err = CliError::from(err);
            eprintln!("error: {err}");
            std::process::exit(err.exit_code());
        }
    }

    if let Err(err) = run(cli.command, &config) {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}
