// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable keyed store backends for Rollbot.
//!
//! [`SqliteStore`] persists the keyspace in a WAL-mode SQLite database with
//! embedded migrations and a single-writer connection via `tokio-rusqlite`.
//! [`MemoryStore`] keeps it in process, for tests and throwaway runs.

pub mod database;
pub mod memory;
pub mod migrations;
pub mod sqlite;

use std::sync::Arc;

use rollbot_config::model::{StorageBackend, StorageConfig};
use rollbot_core::{KeyValueStore, RollbotError};

pub use database::Database;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Build the store backend selected by `config.backend`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, RollbotError> {
    match config.backend {
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStore::open(config.clone()).await?)),
        StorageBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
