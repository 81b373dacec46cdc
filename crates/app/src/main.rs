//! OffChat admin console
//!
//! Opens the configured store, hydrates the account engine from it and runs
//! one operation per invocation.

use std::process::ExitCode;

use clap::Parser;
use offchat_core::{Config, Console};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;

use cli::Cli;

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let console = match Console::open(&config) {
        Ok(console) => console,
        Err(e) => {
            tracing::error!("Failed to open account store: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match commands::run(&console, cli.command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            if e.is_fatal() {
                tracing::error!(kind = ?e.kind(), "Operation failed: {}", e);
            }
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
