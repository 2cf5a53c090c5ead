//! Target persistence.
//!
//! The [`TargetStore`] trait is the append/list repository the expansion
//! pipeline writes to and scan sessions read from. [`SqliteStore`] backs it
//! with a single SQLite table.

mod sqlite_store;

pub use sqlite_store::SqliteStore;

use crate::error::StorageResult;
use crate::types::{TargetRecord, TargetType};
use async_trait::async_trait;

/// Keyed append/list repository of concrete targets.
///
/// Duplicates are kept; `list_all` returns targets in insertion order.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Store a single target.
    async fn put(&self, kind: TargetType, value: String) -> StorageResult<()>;

    /// Store many targets of one kind.
    async fn put_all(&self, kind: TargetType, values: Vec<String>) -> StorageResult<()>;

    /// Every stored target.
    async fn list_all(&self) -> StorageResult<Vec<TargetRecord>>;
}
