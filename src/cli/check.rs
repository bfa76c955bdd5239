//! `check` and `dependents` commands.
//!
//! Both exit with status 1 when they report anything: `check` when a
//! provider is missing or outside the version range, `dependents` when
//! dependents other than the ignored ones remain.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::process::ExitCode;

use super::common::{CommandContext, OutputFormat, VersionBounds, print_records};
use crate::dependency::DependencyList;
use crate::dict::{DictFlags, StringDict};

/// Check that providers are registered within a version range
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Provider keys to check
    #[arg(required = true)]
    pub providers: Vec<String>,

    #[command(flatten)]
    pub bounds: VersionBounds,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl CheckCommand {
    /// Check every provider in one pass, reporting each failing key once.
    pub fn execute(self, ctx: &CommandContext) -> Result<ExitCode> {
        let store = ctx.store();
        let attributes = self.bounds.attributes();
        let mut seen =
            StringDict::create_string_list(self.providers.len(), DictFlags::CASE_INSENSITIVE)?;
        let mut failed = DependencyList::new();

        for provider in &self.providers {
            match store.check_dependency(
                provider,
                self.bounds.min,
                self.bounds.max,
                attributes,
                &mut seen,
                &mut failed,
            ) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to check '{provider}'"));
                }
            }
        }

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&failed)?),
            OutputFormat::Text if failed.is_empty() => {
                println!("{} All dependencies satisfied", "✓".green());
            }
            OutputFormat::Text => {
                println!("{} Missing or incompatible dependencies:", "✗".red());
                print_records(&failed);
            }
        }

        Ok(if failed.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}

/// List the dependents still registered against a provider
#[derive(Args, Debug)]
pub struct DependentsCommand {
    /// Provider key whose dependents to list
    pub provider: String,

    /// Dependent keys to leave out (repeatable)
    #[arg(long = "ignore", value_name = "KEY")]
    pub ignore: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl DependentsCommand {
    /// Report remaining dependents.
    pub fn execute(self, ctx: &CommandContext) -> Result<ExitCode> {
        let ignore = StringDict::from_array(&self.ignore, DictFlags::CASE_INSENSITIVE)?;
        let mut dependents = DependencyList::new();
        ctx.store()
            .check_dependents(&self.provider, Some(&ignore), &mut dependents)
            .with_context(|| format!("Failed to list dependents of '{}'", self.provider))?;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&dependents)?),
            OutputFormat::Text if dependents.is_empty() => {
                println!("{} No dependents of {}", "✓".green(), self.provider.bold());
            }
            OutputFormat::Text => {
                println!("{} {} is still required by:", "✗".red(), self.provider.bold());
                print_records(&dependents);
            }
        }

        Ok(if dependents.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}
