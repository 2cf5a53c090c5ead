//! # targetscan - Recon target expansion and live scan streaming
//!
//! targetscan turns loosely specified recon inputs into concrete scan
//! targets and streams an external scanner's results for them to a client
//! in real time.
//!
//! ## Features
//!
//! - **Classification**: domains, wildcard domains, IPv4 addresses and CIDR subnets
//! - **Expansion**: wildcard domains via subdomain discovery, subnets into every address
//! - **Persistence**: append-only SQLite target store
//! - **Live scans**: scanner stdin/stdout bridged to a WebSocket, with cancellation
//!   on disconnect
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use targetscan::types::{classify, expand, TargetKind};
//!
//! assert_eq!(classify("*.example.com"), TargetKind::WildcardDomain);
//! assert_eq!(expand("10.0.0.0/30")?.len(), 4);
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Target classification, address ranges and subnet math
//! - [`pipeline`] - Batch expansion and persistence
//! - [`discovery`] - Subdomain discovery through an external tool
//! - [`storage`] - Target persistence
//! - [`scanner`] - Scan sessions bridging a scanner process to a client
//! - [`server`] - HTTP and WebSocket routes
//! - [`config`] - Application settings
//! - [`error`] - Error types
//! - [`cli`] / [`output`] - Command-line front end

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod scanner;
pub mod server;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{ApiError, CliError, SessionError, StorageError, TargetError};
pub use pipeline::ExpansionPipeline;
pub use scanner::{ScanSession, SessionReport, SessionState};
pub use types::{classify, expand, TargetKind, TargetRecord, TargetType};
