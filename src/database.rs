//! SQLite database backing the status store.
//!
//! Holds one `status_records` row per tracked entity. The connection is
//! opened once at process start and shared behind a mutex.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StoreError;
use crate::store::{Status, StatusRecord, StatusStore};

/// Database wrapper with thread-safe connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens or creates the database at `path`.
    pub fn open(path: &Path) -> SqlResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        tracing::info!(path = ?path, "Opening database");

        let conn = Connection::open(path)?;

        // Enable WAL mode for better crash safety
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::from_connection(conn)
    }

    /// Opens an in-memory database (for testing).
    #[cfg(test)]
    pub fn open_in_memory() -> SqlResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> SqlResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS status_records (
                id TEXT PRIMARY KEY,
                status INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        tracing::debug!("Database schema initialized");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn record_from_row(row: &Row<'_>) -> SqlResult<(String, i64, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn into_record((id, code, updated_at): (String, i64, String)) -> Result<StatusRecord, StoreError> {
    let status = Status::from_code(code).ok_or_else(|| {
        StoreError::InvalidData(format!("record `{id}` holds unknown status {code}"))
    })?;
    Ok(StatusRecord {
        id,
        status,
        updated_at,
    })
}

impl StatusStore for Database {
    fn fetch(&self, id: &str) -> Result<Option<StatusRecord>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, status, updated_at FROM status_records WHERE id = ?1",
                params![id],
                record_from_row,
            )
            .optional()?;

        row.map(into_record).transpose()
    }

    fn update(&self, id: &str, status: Status) -> Result<Vec<StatusRecord>, StoreError> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let mut stmt = conn.prepare(
            "UPDATE status_records SET status = ?1, updated_at = ?2 WHERE id = ?3
             RETURNING id, status, updated_at",
        )?;
        let rows = stmt
            .query_map(params![status.code(), &now, id], record_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;

        rows.into_iter().map(into_record).collect()
    }

    fn provision(&self, id: &str, status: Status) -> Result<StatusRecord, StoreError> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR REPLACE INTO status_records (id, status, updated_at) VALUES (?1, ?2, ?3)",
            params![id, status.code(), &now],
        )?;
        tracing::info!(id, status = status.code(), "Provisioned status record");

        Ok(StatusRecord {
            id: id.to_string(),
            status,
            updated_at: now,
        })
    }
}
