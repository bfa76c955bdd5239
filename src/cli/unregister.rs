//! `unregister` and `unregister-dependent` commands.
//!
//! Both succeed when the registration is already gone.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::process::ExitCode;

use super::common::CommandContext;

/// Remove a provider and everything registered under it
#[derive(Args, Debug)]
pub struct UnregisterCommand {
    /// Provider key to remove
    pub provider: String,
}

impl UnregisterCommand {
    /// Delete the provider subtree.
    pub fn execute(self, ctx: &CommandContext) -> Result<ExitCode> {
        ctx.store()
            .unregister_dependency(&self.provider)
            .with_context(|| format!("Failed to unregister provider '{}'", self.provider))?;
        println!("{} Unregistered {}", "✓".green(), self.provider.bold());
        Ok(ExitCode::SUCCESS)
    }
}

/// Remove one dependent from a provider
#[derive(Args, Debug)]
pub struct UnregisterDependentCommand {
    /// Provider key being depended on
    pub provider: String,

    /// Provider key of the dependent package
    pub dependent: String,
}

impl UnregisterDependentCommand {
    /// Delete the dependent and clean up empty keys.
    pub fn execute(self, ctx: &CommandContext) -> Result<ExitCode> {
        let store = ctx.store();
        let existed = store.provider_exists(&self.provider)?;
        store.unregister_dependent(&self.provider, &self.dependent).with_context(|| {
            format!(
                "Failed to unregister '{}' as a dependent of '{}'",
                self.dependent, self.provider
            )
        })?;

        println!(
            "{} {} no longer depends on {}",
            "✓".green(),
            self.dependent.bold(),
            self.provider.bold()
        );
        if existed && !store.provider_exists(&self.provider)? {
            println!("  Removed empty provider key {}", self.provider);
        }
        Ok(ExitCode::SUCCESS)
    }
}
