// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All access is serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::time::Duration;

use rollbot_core::RollbotError;
use thiserror::Error;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::migrations;

/// Errors raised on the database thread.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] refinery::Error),

    #[error("WRONGTYPE key `{key}` holds a {actual}, not a {expected}")]
    WrongType {
        key: String,
        expected: &'static str,
        actual: String,
    },

    #[error("value at key `{key}` is not an integer")]
    NotInteger { key: String },
}

/// Convert a tokio-rusqlite error into `RollbotError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<DatabaseError>) -> RollbotError {
    RollbotError::storage(e)
}

/// An open, migrated SQLite database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and run migrations.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, RollbotError> {
        if path != ":memory:"
            && let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(RollbotError::storage)?;
        }

        let conn = Connection::open(path).await.map_err(RollbotError::storage)?;

        conn.call(move |conn| -> Result<(), DatabaseError> {
            if wal_mode {
                let mode: String =
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
                debug!(journal_mode = %mode, "journal mode set");
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", true)?;
            conn.busy_timeout(Duration::from_secs(5))?;
            migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        info!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), RollbotError> {
        self.conn
            .call(|conn| -> Result<(), DatabaseError> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_parent_dirs_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/rollbot.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, DatabaseError> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 'kv_%' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .unwrap();

        assert_eq!(
            tables,
            vec!["kv_hashes", "kv_keys", "kv_sets", "kv_strings", "kv_zsets"]
        );
        db.checkpoint().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollbot.db");
        let path = path.to_str().unwrap();
        drop(Database::open(path, true).await.unwrap());
        assert!(Database::open(path, true).await.is_ok());
    }
}
