//! `register` and `register-dependent` commands.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::process::ExitCode;

use super::common::{CommandContext, VersionBounds};
use crate::dependency::DependencyAttributes;
use crate::version::FourPartVersion;

/// Register a dependency provider
#[derive(Args, Debug)]
pub struct RegisterCommand {
    /// Provider key to register
    pub provider: String,

    /// Version the provider publishes
    #[arg(long, value_name = "VERSION")]
    pub version: FourPartVersion,

    /// Display name (defaults to the provider key)
    #[arg(long)]
    pub name: Option<String>,

    /// Provider id, stored as the key's default value
    #[arg(long)]
    pub id: Option<String>,

    /// Raw attribute bitmask; 0 leaves the value unset
    #[arg(long, default_value_t = 0)]
    pub attributes: u32,
}

impl RegisterCommand {
    /// Write the provider registration.
    pub fn execute(self, ctx: &CommandContext) -> Result<ExitCode> {
        let name = self.name.as_deref().unwrap_or(&self.provider);
        let version = self.version.to_string();
        ctx.store()
            .register_dependency(
                &self.provider,
                &version,
                name,
                self.id.as_deref(),
                DependencyAttributes::from_bits_retain(self.attributes),
            )
            .with_context(|| format!("Failed to register provider '{}'", self.provider))?;

        println!(
            "{} Registered {} {} ({})",
            "✓".green(),
            self.provider.bold(),
            version,
            ctx.root
        );
        Ok(ExitCode::SUCCESS)
    }
}

/// Register a dependent against a provider
#[derive(Args, Debug)]
pub struct RegisterDependentCommand {
    /// Provider key being depended on
    pub provider: String,

    /// Provider key of the dependent package
    pub dependent: String,

    #[command(flatten)]
    pub bounds: VersionBounds,
}

impl RegisterDependentCommand {
    /// Write the dependent registration.
    pub fn execute(self, ctx: &CommandContext) -> Result<ExitCode> {
        let min = self.bounds.min.map(|v| v.to_string());
        let max = self.bounds.max.map(|v| v.to_string());
        ctx.store()
            .register_dependent(
                &self.provider,
                &self.dependent,
                min.as_deref(),
                max.as_deref(),
                self.bounds.attributes(),
            )
            .with_context(|| {
                format!(
                    "Failed to register '{}' as a dependent of '{}'",
                    self.dependent, self.provider
                )
            })?;

        println!(
            "{} Registered {} as a dependent of {}",
            "✓".green(),
            self.dependent.bold(),
            self.provider.bold()
        );
        Ok(ExitCode::SUCCESS)
    }
}
