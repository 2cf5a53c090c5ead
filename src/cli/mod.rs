//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `targetscan serve` - Run the HTTP and WebSocket server
//! - `targetscan submit <INPUT>...` - Expand and store targets directly
//! - `targetscan targets` - List stored targets

mod serve;
mod submit;
mod targets;

pub use serve::ServeCommand;
pub use submit::SubmitCommand;
pub use targets::TargetsCommand;

use crate::config::{AppSettings, Paths};
use crate::discovery::SubfinderDiscovery;
use crate::error::CliResult;
use crate::pipeline::ExpansionPipeline;
use crate::storage::SqliteStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// targetscan - recon target expansion and live scan streaming.
///
/// Accepts domains, wildcard domains, IPv4 addresses and CIDR subnets,
/// expands them into concrete targets, and streams an external scanner's
/// output for the stored targets over a WebSocket.
#[derive(Parser, Debug)]
#[command(name = "targetscan")]
#[command(author = "HueCodes <huecodes@proton.me>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Recon target expansion and live scan streaming", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to custom configuration file
    #[arg(long, global = true, value_name = "PATH", env = "TARGETSCAN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP and WebSocket server
    Serve(ServeCommand),

    /// Expand and store targets without going through the server
    #[command(alias = "s")]
    Submit(SubmitCommand),

    /// List stored targets
    #[command(alias = "t")]
    Targets(TargetsCommand),
}

impl Cli {
    /// Resolve directories and load settings, honouring `--config`.
    pub fn load_settings(&self) -> CliResult<(AppSettings, Paths)> {
        let paths = Paths::new()?;
        let settings = match &self.config {
            Some(path) => AppSettings::load_from(path)?,
            None => AppSettings::load(&paths)?,
        };
        Ok((settings, paths))
    }

    /// Log filter implied by the global flags.
    pub fn log_filter(&self, settings: &AppSettings) -> String {
        if self.verbose {
            "debug".to_string()
        } else if self.quiet {
            "warn".to_string()
        } else {
            settings.log_level.clone()
        }
    }

    /// Run the selected subcommand.
    pub async fn execute(self, settings: AppSettings, paths: Paths) -> CliResult<()> {
        match self.command {
            Commands::Serve(cmd) => cmd.execute(settings, &paths, self.quiet).await,
            Commands::Submit(cmd) => cmd.execute(&settings, &paths, self.quiet).await,
            Commands::Targets(cmd) => cmd.execute(&settings, &paths).await,
        }
    }
}

/// Output format for target listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Open the configured target database.
fn open_store(settings: &AppSettings, paths: &Paths) -> CliResult<Arc<SqliteStore>> {
    let path = settings.database_file(paths);
    tracing::debug!(path = %path.display(), "opening target database");
    Ok(Arc::new(SqliteStore::open(&path)?))
}

/// Build the expansion pipeline over `store`.
fn build_pipeline(settings: &AppSettings, store: Arc<SqliteStore>) -> ExpansionPipeline {
    ExpansionPipeline::from_settings(
        store,
        Arc::new(SubfinderDiscovery::from_settings(settings)),
        settings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "targetscan",
            "serve",
            "--bind",
            "127.0.0.1:9000",
            "--scanner",
            "/usr/local/bin/nmap",
        ])
        .unwrap();

        match cli.command {
            Commands::Serve(cmd) => {
                assert_eq!(cmd.bind.as_deref(), Some("127.0.0.1:9000"));
                assert_eq!(cmd.scanner.as_deref(), Some("/usr/local/bin/nmap"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_submit_requires_input() {
        assert!(Cli::try_parse_from(["targetscan", "submit"]).is_err());
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["targetscan", "-v", "-q", "targets"]).is_err());
    }

    #[test]
    fn test_log_filter() {
        let settings = AppSettings::default();
        let cli = Cli::try_parse_from(["targetscan", "targets"]).unwrap();
        assert_eq!(cli.log_filter(&settings), "info");

        let cli = Cli::try_parse_from(["targetscan", "-v", "targets"]).unwrap();
        assert_eq!(cli.log_filter(&settings), "debug");
    }
}
