//! Submit subcommand implementation.
//!
//! Handles `targetscan submit <INPUT>...`: runs the expansion pipeline
//! against the local database, the same way `POST /parse` does.

use crate::cli::{build_pipeline, open_store, OutputFormat};
use crate::config::{AppSettings, Paths};
use crate::error::CliResult;
use crate::output;
use crate::storage::TargetStore;
use clap::Parser;

/// Expand and store targets.
#[derive(Parser, Debug)]
pub struct SubmitCommand {
    /// Raw inputs (domain, *.domain, IPv4 address or CIDR subnet)
    ///
    /// Examples:
    ///   example.com        Domain
    ///   *.example.com      Wildcard, expanded by subdomain discovery
    ///   192.168.1.1        Single IP address
    ///   192.168.1.0/24     CIDR range
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<String>,

    /// Output format for the stored target list
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,
}

impl SubmitCommand {
    /// Execute the submit command.
    pub async fn execute(&self, settings: &AppSettings, paths: &Paths, quiet: bool) -> CliResult<()> {
        let store = open_store(settings, paths)?;
        let before = store.list_all().await?.len();

        let pipeline = build_pipeline(settings, store);
        let targets = pipeline.process(&self.inputs).await?;

        if !quiet {
            output::print_success(&format!(
                "Stored {} new targets from {} inputs",
                targets.len().saturating_sub(before),
                self.inputs.len()
            ));
        }

        output::format_targets(&targets, self.output)?;
        Ok(())
    }
}
