//! Scanner subprocess handling.

use crate::config::AppSettings;
use crate::error::{SessionError, SessionResult};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// The external scanner executable and its fixed flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerCommand {
    program: String,
    args: Vec<String>,
}

impl ScannerCommand {
    /// Create a scanner command.
    pub fn new<I, A>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from application settings.
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(settings.scanner_program.clone(), settings.scanner_args.clone())
    }

    /// Executable name or path.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Start the scanner with piped stdin and stdout.
    pub fn spawn(&self) -> SessionResult<(ScanProcess, ScanPipes)> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SessionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(SessionError::Pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(SessionError::Pipe("stdout"))?;

        Ok((
            ScanProcess {
                child,
                exit: None,
                killed: false,
            },
            ScanPipes { stdin, stdout },
        ))
    }
}

/// The scanner's input and output streams, handed to the pumps.
pub struct ScanPipes {
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
}

/// A running scanner owned by exactly one session.
///
/// Killing and reaping are idempotent; dropping the handle kills the
/// process if it is still running.
pub struct ScanProcess {
    child: Child,
    exit: Option<ExitStatus>,
    killed: bool,
}

impl ScanProcess {
    /// OS process id, if still known.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Exit status, once observed.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit
    }

    /// Wait for the scanner to exit on its own. Cancel-safe.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        if let Some(status) = self.exit {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.exit = Some(status);
        Ok(status)
    }

    /// Forcefully kill the scanner and reap it.
    ///
    /// Returns `true` only for the call that actually delivered the kill.
    pub async fn kill(&mut self) -> bool {
        if self.killed || self.exit.is_some() {
            return false;
        }

        if let Ok(Some(status)) = self.child.try_wait() {
            self.exit = Some(status);
            return false;
        }

        if let Err(e) = self.child.start_kill() {
            tracing::warn!(error = %e, "failed to kill scanner");
            return false;
        }
        self.killed = true;

        if let Err(e) = self.wait().await {
            tracing::warn!(error = %e, "failed to reap killed scanner");
        }
        true
    }

    /// Make sure the process is gone and reaped.
    pub async fn release(&mut self) {
        if self.exit.is_none() {
            self.kill().await;
        }
    }
}
