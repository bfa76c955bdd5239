//! `info` command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::process::ExitCode;

use super::common::{CommandContext, OutputFormat};

/// Show a provider's registration
#[derive(Args, Debug)]
pub struct InfoCommand {
    /// Provider key to show
    pub provider: String,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl InfoCommand {
    /// Print id, name and version; absent values are shown as such.
    pub fn execute(self, ctx: &CommandContext) -> Result<ExitCode> {
        let info = ctx
            .store()
            .get_provider_information(&self.provider)
            .with_context(|| format!("Failed to read provider '{}'", self.provider))?;

        if self.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&info)?);
            return Ok(ExitCode::SUCCESS);
        }

        let unset = || "(not set)".dimmed().to_string();
        println!("{} ({})", self.provider.bold(), ctx.root);
        println!("  Id:          {}", info.id.unwrap_or_else(unset));
        println!("  DisplayName: {}", info.name.unwrap_or_else(unset));
        println!(
            "  Version:     {}",
            info.version.map_or_else(unset, |version| version.to_string())
        );
        if info.version.is_none() {
            println!("{} Provider has no version and is treated as absent", "⚠".yellow());
        }
        Ok(ExitCode::SUCCESS)
    }
}
