//! Entry point for the argus CLI, an EVM smart contract security analyzer.
//!
//! Parses the flag surface, sets up logging, resolves environment-derived
//! configuration at the boundary and dispatches to exactly one analysis
//! mode. Every fatal error prints a plain message and terminates; there are
//! no structured exit codes.

use argus_cli::{commands, Args, Config};
use clap::Parser;
use tracing::level_filters::LevelFilter;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Log-level handling comes first, before any command short-circuits.
    init_logging(args.verbosity);
    let config = Config::from_env();

    if let Err(e) = commands::dispatch(&args, &config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbosity: Option<u8>) {
    let level = match verbosity {
        Some(0) => LevelFilter::OFF,
        Some(1) => LevelFilter::INFO,
        Some(2) => LevelFilter::DEBUG,
        // Out-of-range levels are ignored.
        _ => LevelFilter::WARN,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}
