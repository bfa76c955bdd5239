//! Command-line interface for dutil.
//!
//! Each subcommand maps onto one [`DependencyStore`](crate::dependency::DependencyStore)
//! operation and works against a persistent hive file (see
//! [`FileHive`](crate::registry::FileHive)).
//!
//! # Available Commands
//!
//! ## Registration
//! - `register` - Register a dependency provider
//! - `register-dependent` - Register a package as depending on a provider
//!
//! ## Inspection
//! - `check` - Verify providers exist within a version range
//! - `dependents` - List packages still depending on a provider
//! - `info` - Show a provider's registration
//!
//! ## Removal
//! - `unregister` - Remove a provider and all its dependents
//! - `unregister-dependent` - Remove one dependent, cleaning up empty keys
//!
//! # Typical install/uninstall flow
//!
//! ```bash
//! # installer of package A publishes its provider
//! dutil register ProviderA --version 2.5 --name "Package A"
//!
//! # installer of package B verifies and records its dependency on A
//! dutil check ProviderA --min 2.0 --min-inclusive
//! dutil register-dependent ProviderA ProviderB --min 2.0 --min-inclusive
//!
//! # uninstalling A is blocked while B depends on it
//! dutil dependents ProviderA || echo "still in use"
//!
//! # uninstalling B releases its reference
//! dutil unregister-dependent ProviderA ProviderB
//! ```
//!
//! # Exit status
//!
//! 0 on success. `check` and `dependents` exit with 1 when they report
//! records; any other failure prints a friendly error and exits with 1.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

pub mod check;
pub mod common;
pub mod info;
pub mod register;
pub mod unregister;

pub use common::CommandContext;

/// Settings derived from global flags, kept separate from parsing so tests
/// can build them directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Log filter directive (`None` means errors only)
    pub log_level: Option<String>,
    /// Explicit configuration file
    pub config_path: Option<PathBuf>,
    /// Explicit hive file, overriding the configuration
    pub hive_path: Option<PathBuf>,
    /// Operate on the per-user root
    pub user: bool,
}

impl CliConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Dependency registration tool
#[derive(Parser, Debug)]
#[command(
    name = "dutil",
    about = "Register and check installer package dependencies",
    version,
    long_about = "dutil records which packages provide a dependency and which packages depend on \
                  them, so an installer can refuse to remove a package that is still in use."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file (default: ~/.dutil/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Hive file to use instead of the configured one
    #[arg(long, global = true, value_name = "FILE")]
    hive: Option<PathBuf>,

    /// Use the per-user registry root instead of the per-machine one
    #[arg(long, global = true)]
    user: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a dependency provider
    Register(register::RegisterCommand),

    /// Register a dependent against a provider
    RegisterDependent(register::RegisterDependentCommand),

    /// Check that providers are registered within a version range
    Check(check::CheckCommand),

    /// List the dependents of a provider
    Dependents(check::DependentsCommand),

    /// Show a provider's registration
    Info(info::InfoCommand),

    /// Remove a provider with all of its dependents
    Unregister(unregister::UnregisterCommand),

    /// Remove a dependent from a provider
    UnregisterDependent(unregister::UnregisterDependentCommand),
}

impl Cli {
    /// Translate global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("warn".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
            hive_path: self.hive.clone(),
            user: self.user,
        }
    }

    /// Run the selected command with flags taken from the command line.
    pub fn execute(self) -> Result<ExitCode> {
        let config = self.build_config();
        self.execute_with_config(&config)
    }

    /// Run the selected command with an explicit configuration.
    pub fn execute_with_config(self, config: &CliConfig) -> Result<ExitCode> {
        let ctx = CommandContext::from_cli_config(config)?;

        match self.command {
            Commands::Register(cmd) => cmd.execute(&ctx),
            Commands::RegisterDependent(cmd) => cmd.execute(&ctx),
            Commands::Check(cmd) => cmd.execute(&ctx),
            Commands::Dependents(cmd) => cmd.execute(&ctx),
            Commands::Info(cmd) => cmd.execute(&ctx),
            Commands::Unregister(cmd) => cmd.execute(&ctx),
            Commands::UnregisterDependent(cmd) => cmd.execute(&ctx),
        }
    }
}
