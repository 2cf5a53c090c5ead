//! Serve subcommand implementation.
//!
//! Handles the `targetscan serve` command: opens the target database and
//! runs the HTTP and WebSocket server until interrupted.

use crate::cli::{build_pipeline, open_store};
use crate::config::{AppSettings, Paths};
use crate::error::CliResult;
use crate::output;
use crate::server::{self, AppState};
use clap::Parser;
use std::path::PathBuf;

/// Run the HTTP and WebSocket server.
#[derive(Parser, Debug)]
pub struct ServeCommand {
    /// Address to listen on (e.g., "0.0.0.0:8000")
    #[arg(short, long, env = "TARGETSCAN_BIND", value_name = "ADDR")]
    pub bind: Option<String>,

    /// Path of the SQLite target database
    #[arg(short, long, env = "TARGETSCAN_DATABASE", value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Scanner executable fed the target list on stdin
    #[arg(short, long, env = "TARGETSCAN_SCANNER", value_name = "PROGRAM")]
    pub scanner: Option<String>,
}

impl ServeCommand {
    /// Apply command-line overrides on top of loaded settings.
    pub fn apply(&self, mut settings: AppSettings) -> CliResult<AppSettings> {
        if let Some(bind) = &self.bind {
            settings.bind_address = bind.clone();
        }
        if let Some(database) = &self.database {
            settings.database_path = Some(database.clone());
        }
        if let Some(scanner) = &self.scanner {
            settings.scanner_program = scanner.clone();
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Execute the serve command.
    pub async fn execute(&self, settings: AppSettings, paths: &Paths, quiet: bool) -> CliResult<()> {
        let settings = self.apply(settings)?;
        let addr = settings.socket_addr()?;
        let database = settings.database_file(paths);

        let store = open_store(&settings, paths)?;
        let pipeline = build_pipeline(&settings, store.clone());

        if !quiet {
            output::print_serve_header(addr, &database, &settings.scanner_program);
        }

        let state = AppState::new(settings, store, pipeline);
        server::serve(state, addr).await?;

        if !quiet {
            output::print_info("Server stopped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CliError, ConfigError};

    fn command(bind: Option<&str>, scanner: Option<&str>) -> ServeCommand {
        ServeCommand {
            bind: bind.map(str::to_string),
            database: Some(PathBuf::from("/tmp/targets.db")),
            scanner: scanner.map(str::to_string),
        }
    }

    #[test]
    fn test_overrides_applied() {
        let settings = command(Some("127.0.0.1:9000"), Some("masscan"))
            .apply(AppSettings::default())
            .unwrap();

        assert_eq!(settings.bind_address, "127.0.0.1:9000");
        assert_eq!(settings.scanner_program, "masscan");
        assert_eq!(settings.database_path, Some(PathBuf::from("/tmp/targets.db")));
    }

    #[test]
    fn test_defaults_kept_without_overrides() {
        let settings = command(None, None).apply(AppSettings::default()).unwrap();
        assert_eq!(settings.bind_address, "0.0.0.0:8000");
        assert_eq!(settings.scanner_program, "nmap");
    }

    #[test]
    fn test_invalid_bind_rejected() {
        let err = command(Some("not-an-address"), None)
            .apply(AppSettings::default())
            .unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::Invalid(_))));
    }
}
