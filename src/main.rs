//! dutil CLI entry point
//!
//! Parses arguments, sets up logging, runs the command and renders
//! failures through [`user_friendly_error`].

use clap::Parser;
use dutil::cli::{Cli, CliConfig};
use dutil::core::user_friendly_error;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &CliConfig) {
    // RUST_LOG wins unless a verbosity flag was given
    let filter = match config.log_level.as_deref() {
        Some("debug") => EnvFilter::new("dutil=debug"),
        Some(level) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        None => EnvFilter::new("error"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let config = cli.build_config();
    init_logging(&config);

    match cli.execute_with_config(&config) {
        Ok(code) => code,
        Err(e) => {
            user_friendly_error(e).display();
            ExitCode::FAILURE
        }
    }
}
