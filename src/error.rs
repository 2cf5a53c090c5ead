//! Error types for targetscan.
//!
//! Uses `thiserror` for ergonomic error definitions. Each concern gets its
//! own enum; [`ApiError`] converts them into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Classification and subnet expansion failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("range start {start} is above range end {end}")]
    RangeOrder { start: String, end: String },

    #[error("range endpoints {start} and {end} belong to different address families")]
    FamilyMismatch { start: String, end: String },

    #[error("subnet {cidr} holds {hosts} addresses (max: {max})")]
    SubnetTooLarge { cidr: String, hosts: u128, max: u128 },
}

/// Result type alias for target operations.
pub type TargetResult<T> = Result<T, TargetError>;

/// Subdomain discovery failures.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("discovery for {apex} exceeded its {secs}s budget")]
    Timeout { apex: String, secs: u64 },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Target persistence failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("failed to create data directory: {0}")]
    DirectoryError(String),
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Live scan session failures.
///
/// These never escape a pump; they end up in the session report.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to spawn scanner {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("client channel closed")]
    ClientClosed,

    #[error("client write failed: {0}")]
    ClientWrite(String),

    #[error("scanner {0} pipe was not captured")]
    Pipe(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Configuration loading and saving failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine a home directory for configuration")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by the command-line front end.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Error returned by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();

        let (status, message, code, detail) = match &self {
            ApiError::InvalidJson(reason) => {
                tracing::warn!(error_id = %error_id, error = %reason, "rejected request body");
                (
                    StatusCode::BAD_REQUEST,
                    "Invalid JSON",
                    "INVALID_JSON",
                    Some(reason.clone()),
                )
            }
            ApiError::Storage(err) => {
                tracing::error!(error_id = %error_id, error = %err, "storage error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to retrieve targets from database",
                    "STORE_UNAVAILABLE",
                    None,
                )
            }
            ApiError::Internal(reason) => {
                tracing::error!(error_id = %error_id, error = %reason, "internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    "INTERNAL_ERROR",
                    None,
                )
            }
        };

        let body = json!({
            "message": message,
            "code": code,
            "detail": detail,
            "error_id": error_id,
        });

        (status, Json(body)).into_response()
    }
}
