//! Durable single-slot store for the in-flight terminal transaction
//!
//! The slot outlives crashes and reloads: it is written before the reader
//! prompt starts and cleared only after backend confirmation or explicit
//! operator action. Everything else about the register is reconstructable,
//! so this is the only state the register persists locally.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tillpoint_core::checkout::ports::PendingTransactionStore;
use tillpoint_domain::constants::PENDING_TRANSACTION_SLOT;
use tillpoint_domain::{PendingTerminalTransaction, PosError, Result};
use tracing::info;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS register_slots (
    slot TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// SQLite-backed implementation of [`PendingTransactionStore`].
///
/// All rusqlite work runs on the blocking pool; the connection is shared
/// behind a mutex since slot traffic is one row at a time.
pub struct PendingTransactionRepository {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl PendingTransactionRepository {
    /// Open (or create) the register database at `path` and ensure the
    /// slot table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(map_sql_error)?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;

        info!(db_path = %path.display(), "register database opened");
        Ok(Self { conn: Arc::new(Mutex::new(conn)), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = match conn.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            f(&guard).map_err(map_sql_error)
        })
        .await
        .map_err(|e| PosError::Internal(format!("storage task failed: {e}")))?
    }
}

#[async_trait]
impl PendingTransactionStore for PendingTransactionRepository {
    async fn write(&self, record: &PendingTerminalTransaction) -> Result<()> {
        let payload = serde_json::to_string(record)
            .map_err(|e| PosError::Storage(format!("failed to serialize slot payload: {e}")))?;
        let updated_at = record.created_at.to_rfc3339();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO register_slots (slot, payload, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(slot) DO UPDATE SET
                     payload = excluded.payload,
                     updated_at = excluded.updated_at",
                params![PENDING_TRANSACTION_SLOT, payload, updated_at],
            )?;
            Ok(())
        })
        .await
    }

    async fn read(&self) -> Result<Option<PendingTerminalTransaction>> {
        let payload: Option<String> = self
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT payload FROM register_slots WHERE slot = ?1",
                    params![PENDING_TRANSACTION_SLOT],
                    |row| row.get(0),
                )
                .optional()
            })
            .await?;

        match payload {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| PosError::Storage(format!("corrupt slot payload: {e}"))),
            None => Ok(None),
        }
    }

    async fn clear(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM register_slots WHERE slot = ?1",
                params![PENDING_TRANSACTION_SLOT],
            )?;
            Ok(())
        })
        .await
    }
}

fn map_sql_error(err: rusqlite::Error) -> PosError {
    PosError::Storage(err.to_string())
}
