//! Scanner module - streams a scan of the stored targets to one client.
//!
//! A session spawns the external scanner, feeds it every target while
//! announcing each one to the client, and relays the scanner's output back
//! as it is produced. The session ends when the scanner finishes, the
//! client disconnects, or any stream fails.

mod process;
mod pumps;
mod session;
pub mod traits;

use crate::types::SessionId;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub use process::{ScanPipes, ScanProcess, ScannerCommand};
pub use session::ScanSession;
pub use traits::{ClientEvents, ClientMessage, ClientSink};

/// Lifecycle of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Created, scanner not yet started
    #[default]
    Idle,
    /// Scanner running, pumps active
    Running,
    /// Scanner exited after its output was fully relayed
    Completed,
    /// Client disconnected; scanner killed
    Cancelled,
    /// Scanner failed to start or a stream failed
    Failed,
}

impl SessionState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Move to `next` if the lifecycle allows it.
    ///
    /// Returns whether the state changed. Terminal states never change.
    pub fn advance(&mut self, next: SessionState) -> bool {
        let allowed = matches!(
            (*self, next),
            (Self::Idle, Self::Running)
                | (Self::Idle, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Cancelled)
                | (Self::Running, Self::Failed)
        );
        if allowed {
            *self = next;
        }
        allowed
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Running => write!(f, "running"),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Cancelled => write!(f, "cancelled"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// Summary of a finished scan session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub id: SessionId,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub targets_total: usize,
    pub targets_fed: usize,
    pub chunks_relayed: u64,
    pub bytes_relayed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub killed: bool,
}

impl SessionReport {
    fn new(id: SessionId, targets_total: usize) -> Self {
        Self {
            id,
            state: SessionState::Idle,
            started_at: Utc::now(),
            finished_at: None,
            targets_total,
            targets_fed: 0,
            chunks_relayed: 0,
            bytes_relayed: 0,
            exit_code: None,
            killed: false,
        }
    }

    /// Wall-clock duration in milliseconds, once finished.
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}
