//! Discovery through the `subfinder` command-line tool.

use crate::config::AppSettings;
use crate::discovery::Discovery;
use crate::error::{DiscoveryError, DiscoveryResult};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Runs `subfinder -d <apex> -silent` and collects one hostname per line.
#[derive(Debug, Clone)]
pub struct SubfinderDiscovery {
    program: String,
    threads: u32,
    source_timeout: Duration,
}

impl SubfinderDiscovery {
    /// Create a discovery runner for the given executable.
    pub fn new(program: impl Into<String>, threads: u32, source_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            threads,
            source_timeout,
        }
    }

    /// Build from application settings.
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(
            settings.discovery_program.clone(),
            settings.discovery_threads,
            Duration::from_secs(settings.discovery_source_timeout_secs),
        )
    }

    fn command_args(&self, apex: &str, budget: Duration) -> Vec<String> {
        // subfinder takes its enumeration limit in whole minutes.
        let minutes = budget.as_secs().div_ceil(60).max(1);
        vec![
            "-d".to_string(),
            apex.to_string(),
            "-silent".to_string(),
            "-t".to_string(),
            self.threads.to_string(),
            "-timeout".to_string(),
            self.source_timeout.as_secs().to_string(),
            "-max-time".to_string(),
            minutes.to_string(),
        ]
    }
}

#[async_trait]
impl Discovery for SubfinderDiscovery {
    async fn discover(&self, apex: &str, budget: Duration) -> DiscoveryResult<Vec<String>> {
        let child = Command::new(&self.program)
            .args(self.command_args(apex, budget))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DiscoveryError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        tracing::debug!(apex, program = %self.program, "running subdomain discovery");

        let output = match timeout(budget, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(DiscoveryError::Timeout {
                    apex: apex.to_string(),
                    secs: budget.as_secs(),
                })
            }
        };

        if !output.status.success() {
            return Err(DiscoveryError::ToolFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let names = parse_hostnames(&String::from_utf8_lossy(&output.stdout));
        tracing::debug!(apex, found = names.len(), "subdomain discovery finished");
        Ok(names)
    }
}

/// One hostname per non-blank line.
fn parse_hostnames(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
