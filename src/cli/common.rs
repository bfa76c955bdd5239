//! Shared plumbing for CLI commands

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::CliConfig;
use crate::config::DutilConfig;
use crate::dependency::{DependencyAttributes, DependencyList, DependencyStore};
use crate::registry::{FileHive, RegistryRoot};
use crate::version::FourPartVersion;

/// Everything a command needs to reach the registrations.
#[derive(Debug)]
pub struct CommandContext {
    /// Loaded configuration (defaults when the file is absent)
    pub config: DutilConfig,
    /// Where the configuration was looked up
    pub config_path: PathBuf,
    /// Hive holding the registrations
    pub hive: FileHive,
    /// Registry root commands operate on
    pub root: RegistryRoot,
}

impl CommandContext {
    /// Resolve configuration, hive and root from the global flags.
    ///
    /// # Errors
    /// Returns an error if the configuration file exists but cannot be loaded
    pub fn from_cli_config(cli: &CliConfig) -> Result<Self> {
        let config_path = DutilConfig::locate(cli.config_path.as_deref())?;
        let config = DutilConfig::load_or_default(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

        let hive = match &cli.hive_path {
            Some(path) => FileHive::new(path).with_lock_timeout(config.lock_timeout()),
            None => config.open_hive(&config_path),
        };
        let root = if cli.user {
            RegistryRoot::CurrentUser
        } else {
            config.scope.root()
        };
        tracing::debug!(hive = %hive.path().display(), %root, "Using registry hive");

        Ok(Self {
            config,
            config_path,
            hive,
            root,
        })
    }

    /// Dependency store over the selected hive and root.
    pub fn store(&self) -> DependencyStore<'_> {
        DependencyStore::new(&self.hive, self.root)
    }
}

/// Output format for commands that report records
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with colors
    #[default]
    Text,
    /// JSON for automation
    Json,
}

/// Version range flags shared by `check` and `register-dependent`
#[derive(Args, Debug, Clone, Default)]
pub struct VersionBounds {
    /// Minimum acceptable provider version
    #[arg(long = "min", value_name = "VERSION")]
    pub min: Option<FourPartVersion>,

    /// Maximum acceptable provider version
    #[arg(long = "max", value_name = "VERSION")]
    pub max: Option<FourPartVersion>,

    /// Accept a provider version equal to --min
    #[arg(long)]
    pub min_inclusive: bool,

    /// Accept a provider version equal to --max
    #[arg(long)]
    pub max_inclusive: bool,
}

impl VersionBounds {
    /// Attribute bits selected by the inclusive flags.
    #[must_use]
    pub fn attributes(&self) -> DependencyAttributes {
        let mut attributes = DependencyAttributes::empty();
        attributes.set(DependencyAttributes::MIN_VERSION_INCLUSIVE, self.min_inclusive);
        attributes.set(DependencyAttributes::MAX_VERSION_INCLUSIVE, self.max_inclusive);
        attributes
    }
}

/// Print dependency records, one per line, as `key (name)`.
pub fn print_records(records: &DependencyList) {
    for record in records {
        match &record.name {
            Some(name) => println!("  {} {} ({})", "•".yellow(), record.key.bold(), name),
            None => println!("  {} {}", "•".yellow(), record.key.bold()),
        }
    }
}
