//! Targets subcommand implementation.

use crate::cli::{open_store, OutputFormat};
use crate::config::{AppSettings, Paths};
use crate::error::CliResult;
use crate::output;
use crate::storage::TargetStore;
use clap::Parser;

/// List stored targets.
#[derive(Parser, Debug)]
pub struct TargetsCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,
}

impl TargetsCommand {
    /// Execute the targets command.
    pub async fn execute(&self, settings: &AppSettings, paths: &Paths) -> CliResult<()> {
        let store = open_store(settings, paths)?;
        let targets = store.list_all().await?;
        output::format_targets(&targets, self.output)?;
        Ok(())
    }
}
