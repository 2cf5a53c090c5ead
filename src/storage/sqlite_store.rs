//! SQLite-backed target storage.
//!
//! A single `targets` table holds every stored target. Calls run on the
//! blocking pool since `rusqlite` is synchronous.

use crate::error::{StorageError, StorageResult};
use crate::storage::TargetStore;
use crate::types::{TargetRecord, TargetType};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

const MIG_0001_TARGETS: &str = r#"
BEGIN;

CREATE TABLE targets (
  id     INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
  type   TEXT NOT NULL,
  value  TEXT NOT NULL
);

CREATE INDEX idx_targets_type ON targets(type);

COMMIT;
"#;

/// SQLite target store. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::DirectoryError(e.to_string()))?;
        }

        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        migrate(&conn)?;

        tracing::debug!(path = %path.display(), "opened target store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StorageError::Unavailable("connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await?
    }
}

fn apply_pragmas(conn: &Connection) -> StorageResult<()> {
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

fn migrate(conn: &Connection) -> StorageResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name='targets'",
        [],
        |r| r.get(0),
    )?;
    if exists == 0 {
        conn.execute_batch(MIG_0001_TARGETS)?;
    }
    Ok(())
}

#[async_trait]
impl TargetStore for SqliteStore {
    async fn put(&self, kind: TargetType, value: String) -> StorageResult<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO targets(type, value) VALUES (?1, ?2)",
                params![kind.as_str(), value],
            )?;
            Ok(())
        })
        .await
    }

    async fn put_all(&self, kind: TargetType, values: Vec<String>) -> StorageResult<()> {
        if values.is_empty() {
            return Ok(());
        }

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare("INSERT INTO targets(type, value) VALUES (?1, ?2)")?;
                for value in &values {
                    stmt.execute(params![kind.as_str(), value])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn list_all(&self) -> StorageResult<Vec<TargetRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT type, value FROM targets ORDER BY id")?;
            let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?;

            let mut targets = Vec::new();
            for row in rows {
                let (kind, value) = row?;
                match kind.parse::<TargetType>() {
                    Ok(kind) => targets.push(TargetRecord::new(kind, value)),
                    Err(e) => tracing::warn!(error = %e, value = %value, "skipping stored row"),
                }
            }
            Ok(targets)
        })
        .await
    }
}
