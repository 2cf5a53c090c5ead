//! Application settings and paths.
//!
//! Manages XDG-compliant paths for configuration and data, and the JSON
//! settings file that configures the server, scanner and discovery tool.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory paths following XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/targetscan)
    pub config_dir: PathBuf,
    /// Data directory (~/.local/share/targetscan)
    pub data_dir: PathBuf,
}

impl Paths {
    /// Resolve paths using XDG directories, creating them if missing.
    pub fn new() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "targetscan", "targetscan")
            .ok_or(ConfigError::DirectoryNotFound)?;

        let paths = Self {
            config_dir: project.config_dir().to_path_buf(),
            data_dir: project.data_dir().to_path_buf(),
        };

        fs::create_dir_all(&paths.config_dir)?;
        fs::create_dir_all(&paths.data_dir)?;

        Ok(paths)
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    /// Get the default path of the target database.
    pub fn database_file(&self) -> PathBuf {
        self.data_dir.join("targets.db")
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Address the HTTP server listens on.
    pub bind_address: String,
    /// Target database location; defaults to the XDG data directory.
    pub database_path: Option<PathBuf>,
    /// Scanner executable fed with targets on stdin.
    pub scanner_program: String,
    /// Fixed flags passed to the scanner.
    pub scanner_args: Vec<String>,
    /// Size of each scanner output read, in bytes.
    pub output_chunk_size: usize,
    /// Messages queued for a client before pumps wait.
    pub client_buffer: usize,
    /// Subdomain discovery executable.
    pub discovery_program: String,
    /// Discovery worker threads.
    pub discovery_threads: u32,
    /// Per-source discovery timeout in seconds.
    pub discovery_source_timeout_secs: u64,
    /// Overall time budget for one wildcard domain, in seconds.
    pub discovery_budget_secs: u64,
    /// Largest subnet the expansion pipeline will enumerate.
    pub max_subnet_hosts: u64,
    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            database_path: None,
            scanner_program: "nmap".to_string(),
            scanner_args: ["-A", "-Pn", "-T4", "-iL", "-"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_chunk_size: 1024,
            client_buffer: 64,
            discovery_program: "subfinder".to_string(),
            discovery_threads: 10,
            discovery_source_timeout_secs: 30,
            discovery_budget_secs: 600,
            max_subnet_hosts: 16_777_216,
            log_level: "info".to_string(),
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, falling back to defaults.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let file = paths.settings_file();

        if !file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a file.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Check values that would make the server unusable.
    pub fn validate(&self) -> ConfigResult<()> {
        self.socket_addr()?;
        if self.scanner_program.trim().is_empty() {
            return Err(ConfigError::Invalid("scanner_program is empty".to_string()));
        }
        if self.output_chunk_size == 0 {
            return Err(ConfigError::Invalid("output_chunk_size must be > 0".to_string()));
        }
        if self.client_buffer == 0 {
            return Err(ConfigError::Invalid("client_buffer must be > 0".to_string()));
        }
        Ok(())
    }

    /// Parsed listen address.
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        self.bind_address
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bind_address '{}'", self.bind_address)))
    }

    /// Database path, resolved against the XDG data directory if unset.
    pub fn database_file(&self, paths: &Paths) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| paths.database_file())
    }

    /// Discovery budget as a duration.
    pub fn discovery_budget(&self) -> Duration {
        Duration::from_secs(self.discovery_budget_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.scanner_program, "nmap");
        assert_eq!(settings.scanner_args, vec!["-A", "-Pn", "-T4", "-iL", "-"]);
        assert_eq!(settings.output_chunk_size, 1024);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("settings.json");
        fs::write(&file, r#"{"bind_address": "127.0.0.1:9000", "max_subnet_hosts": 256}"#).unwrap();

        let settings = AppSettings::load_from(&file).unwrap();
        assert_eq!(settings.socket_addr().unwrap().port(), 9000);
        assert_eq!(settings.max_subnet_hosts, 256);
        assert_eq!(settings.discovery_program, "subfinder");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("settings.json");

        let settings = AppSettings {
            scanner_program: "/usr/local/bin/nmap".to_string(),
            ..AppSettings::default()
        };
        settings.save_to(&file).unwrap();

        let loaded = AppSettings::load_from(&file).unwrap();
        assert_eq!(loaded.scanner_program, "/usr/local/bin/nmap");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let settings = AppSettings {
            bind_address: "not an address".to_string(),
            ..AppSettings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));

        let settings = AppSettings {
            output_chunk_size: 0,
            ..AppSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("settings.json");
        fs::write(&file, "{ nope").unwrap();

        assert!(matches!(
            AppSettings::load_from(&file),
            Err(ConfigError::InvalidFormat(_))
        ));
    }
}
