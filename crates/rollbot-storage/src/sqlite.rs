// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the `KeyValueStore` trait.
//!
//! Each batch runs in one transaction on the database thread. Expired keys
//! are purged at the start of every batch, so commands never see them.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{OptionalExtension, Transaction, params};
use tokio::sync::OnceCell;
use tracing::debug;

use rollbot_config::model::StorageConfig;
use rollbot_core::traits::store::rank_bounds;
use rollbot_core::{
    AdapterType, Command, HealthStatus, KeyValueStore, PluginAdapter, Reply, RollbotError,
};

use crate::database::{Database, DatabaseError, map_tr_err};

/// The type of value a key holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    ZSet,
    Hash,
    Set,
}

impl Kind {
    fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::ZSet => "zset",
            Self::Hash => "hash",
            Self::Set => "set",
        }
    }

    fn table(self) -> &'static str {
        match self {
            Self::String => "kv_strings",
            Self::ZSet => "kv_zsets",
            Self::Hash => "kv_hashes",
            Self::Set => "kv_sets",
        }
    }
}

/// SQLite-backed keyed store.
///
/// The database is opened lazily by [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations.
    pub async fn initialize(&self) -> Result<(), RollbotError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| {
            RollbotError::storage("store already initialized")
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    /// Convenience constructor: build and initialize in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, RollbotError> {
        let store = Self::new(config);
        store.initialize().await?;
        Ok(store)
    }

    fn db(&self) -> Result<&Database, RollbotError> {
        self.db
            .get()
            .ok_or_else(|| RollbotError::storage("store not initialized -- call initialize() first"))
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn expiry(now: i64, ttl: Duration) -> i64 {
    now.saturating_add(ttl.as_millis() as i64)
}

fn kind_of(tx: &Transaction<'_>, key: &str) -> Result<Option<Kind>, DatabaseError> {
    let kind: Option<String> = tx
        .query_row("SELECT kind FROM kv_keys WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(match kind.as_deref() {
        None => None,
        Some("string") => Some(Kind::String),
        Some("zset") => Some(Kind::ZSet),
        Some("hash") => Some(Kind::Hash),
        Some(_) => Some(Kind::Set),
    })
}

/// `Ok(true)` when `key` holds `want`, `Ok(false)` when it does not exist.
fn holds(tx: &Transaction<'_>, key: &str, want: Kind) -> Result<bool, DatabaseError> {
    match kind_of(tx, key)? {
        None => Ok(false),
        Some(kind) if kind == want => Ok(true),
        Some(kind) => Err(DatabaseError::WrongType {
            key: key.to_string(),
            expected: want.as_str(),
            actual: kind.as_str().to_string(),
        }),
    }
}

/// Create `key` as an empty `kind` unless it already holds one.
fn ensure(tx: &Transaction<'_>, key: &str, kind: Kind) -> Result<(), DatabaseError> {
    if !holds(tx, key, kind)? {
        tx.execute(
            "INSERT INTO kv_keys (key, kind, expires_at) VALUES (?1, ?2, NULL)",
            params![key, kind.as_str()],
        )?;
    }
    Ok(())
}

fn delete_key(tx: &Transaction<'_>, key: &str) -> Result<bool, DatabaseError> {
    Ok(tx.execute("DELETE FROM kv_keys WHERE key = ?1", params![key])? > 0)
}

/// Collections never exist empty.
fn drop_if_empty(tx: &Transaction<'_>, key: &str, kind: Kind) -> Result<(), DatabaseError> {
    let sql = format!(
        "DELETE FROM kv_keys WHERE key = ?1 AND NOT EXISTS (SELECT 1 FROM {} WHERE key = ?1)",
        kind.table()
    );
    tx.execute(&sql, params![key])?;
    Ok(())
}

fn count(tx: &Transaction<'_>, key: &str, kind: Kind) -> Result<i64, DatabaseError> {
    if !holds(tx, key, kind)? {
        return Ok(0);
    }
    let sql = format!("SELECT COUNT(*) FROM {} WHERE key = ?1", kind.table());
    Ok(tx.query_row(&sql, params![key], |row| row.get(0))?)
}

fn strings(
    tx: &Transaction<'_>,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = tx.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(rows)
}

fn apply(tx: &Transaction<'_>, command: Command, now: i64) -> Result<Reply, DatabaseError> {
    let reply = match command {
        Command::Get { key } => {
            if !holds(tx, &key, Kind::String)? {
                return Ok(Reply::Nil);
            }
            let value: String = tx.query_row(
                "SELECT value FROM kv_strings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )?;
            Reply::Value(value)
        }
        Command::Set { key, value, ttl } => {
            delete_key(tx, &key)?;
            tx.execute(
                "INSERT INTO kv_keys (key, kind, expires_at) VALUES (?1, 'string', ?2)",
                params![key, ttl.map(|t| expiry(now, t))],
            )?;
            tx.execute(
                "INSERT INTO kv_strings (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            Reply::Ok
        }
        Command::Incr { key } => {
            let current = if holds(tx, &key, Kind::String)? {
                let raw: String = tx.query_row(
                    "SELECT value FROM kv_strings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )?;
                raw.parse::<i64>()
                    .map_err(|_| DatabaseError::NotInteger { key: key.clone() })?
            } else {
                ensure(tx, &key, Kind::String)?;
                0
            };
            let next = current
                .checked_add(1)
                .ok_or_else(|| DatabaseError::NotInteger { key: key.clone() })?;
            tx.execute(
                "INSERT INTO kv_strings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, next.to_string()],
            )?;
            Reply::Int(next)
        }
        Command::Del { keys } => {
            let mut removed = 0;
            for key in &keys {
                if delete_key(tx, key)? {
                    removed += 1;
                }
            }
            Reply::Int(removed)
        }
        Command::Expire { key, ttl } => {
            let changed = tx.execute(
                "UPDATE kv_keys SET expires_at = ?2 WHERE key = ?1",
                params![key, expiry(now, ttl)],
            )?;
            Reply::Bool(changed > 0)
        }
        Command::ZAdd { key, score, member } => {
            ensure(tx, &key, Kind::ZSet)?;
            let existed: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM kv_zsets WHERE key = ?1 AND member = ?2)",
                params![key, member],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO kv_zsets (key, member, score) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key, member) DO UPDATE SET score = excluded.score",
                params![key, member, score],
            )?;
            Reply::Bool(!existed)
        }
        Command::ZRevRange { key, start, stop } => {
            let len = count(tx, &key, Kind::ZSet)?;
            match rank_bounds(len as usize, start, stop) {
                None => Reply::List(Vec::new()),
                Some((from, to)) => Reply::List(strings(
                    tx,
                    "SELECT member FROM kv_zsets WHERE key = ?1
                     ORDER BY score DESC, member DESC LIMIT ?2 OFFSET ?3",
                    params![key, (to - from + 1) as i64, from as i64],
                )?),
            }
        }
        Command::ZRemRangeByRank { key, start, stop } => {
            let len = count(tx, &key, Kind::ZSet)?;
            let removed = match rank_bounds(len as usize, start, stop) {
                None => 0,
                Some((from, to)) => tx.execute(
                    "DELETE FROM kv_zsets WHERE key = ?1 AND member IN (
                         SELECT member FROM kv_zsets WHERE key = ?1
                         ORDER BY score ASC, member ASC LIMIT ?2 OFFSET ?3)",
                    params![key, (to - from + 1) as i64, from as i64],
                )?,
            };
            drop_if_empty(tx, &key, Kind::ZSet)?;
            Reply::Int(removed as i64)
        }
        Command::ZRemRangeByScore { key, min, max } => {
            if !holds(tx, &key, Kind::ZSet)? {
                return Ok(Reply::Int(0));
            }
            let removed = tx.execute(
                "DELETE FROM kv_zsets WHERE key = ?1 AND score >= ?2 AND score <= ?3",
                params![key, min, max],
            )?;
            drop_if_empty(tx, &key, Kind::ZSet)?;
            Reply::Int(removed as i64)
        }
        Command::ZCard { key } => Reply::Int(count(tx, &key, Kind::ZSet)?),
        Command::HSet { key, field, value } => {
            ensure(tx, &key, Kind::Hash)?;
            let existed: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM kv_hashes WHERE key = ?1 AND field = ?2)",
                params![key, field],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO kv_hashes (key, field, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
                params![key, field, value],
            )?;
            Reply::Bool(!existed)
        }
        Command::HSetBounded {
            key,
            field,
            value,
            max_len,
        } => {
            let len = count(tx, &key, Kind::Hash)?;
            let existed: bool = len > 0
                && tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM kv_hashes WHERE key = ?1 AND field = ?2)",
                    params![key, field],
                    |row| row.get(0),
                )?;
            if !existed && len >= i64::try_from(max_len).unwrap_or(i64::MAX) {
                return Ok(Reply::Nil);
            }
            ensure(tx, &key, Kind::Hash)?;
            tx.execute(
                "INSERT INTO kv_hashes (key, field, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
                params![key, field, value],
            )?;
            Reply::Bool(!existed)
        }
        Command::HGet { key, field } => {
            if !holds(tx, &key, Kind::Hash)? {
                return Ok(Reply::Nil);
            }
            let value: Option<String> = tx
                .query_row(
                    "SELECT value FROM kv_hashes WHERE key = ?1 AND field = ?2",
                    params![key, field],
                    |row| row.get(0),
                )
                .optional()?;
            value.map_or(Reply::Nil, Reply::Value)
        }
        Command::HGetAll { key } => {
            if !holds(tx, &key, Kind::Hash)? {
                return Ok(Reply::Map(Vec::new()));
            }
            let mut stmt =
                tx.prepare("SELECT field, value FROM kv_hashes WHERE key = ?1 ORDER BY field")?;
            let entries = stmt
                .query_map(params![key], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<(String, String)>, _>>()?;
            Reply::Map(entries)
        }
        Command::HDel { key, field } => {
            if !holds(tx, &key, Kind::Hash)? {
                return Ok(Reply::Bool(false));
            }
            let removed = tx.execute(
                "DELETE FROM kv_hashes WHERE key = ?1 AND field = ?2",
                params![key, field],
            )?;
            drop_if_empty(tx, &key, Kind::Hash)?;
            Reply::Bool(removed > 0)
        }
        Command::HLen { key } => Reply::Int(count(tx, &key, Kind::Hash)?),
        Command::SAdd { key, member } => {
            ensure(tx, &key, Kind::Set)?;
            let added = tx.execute(
                "INSERT OR IGNORE INTO kv_sets (key, member) VALUES (?1, ?2)",
                params![key, member],
            )?;
            Reply::Bool(added > 0)
        }
        Command::SRem { key, member } => {
            if !holds(tx, &key, Kind::Set)? {
                return Ok(Reply::Bool(false));
            }
            let removed = tx.execute(
                "DELETE FROM kv_sets WHERE key = ?1 AND member = ?2",
                params![key, member],
            )?;
            drop_if_empty(tx, &key, Kind::Set)?;
            Reply::Bool(removed > 0)
        }
        Command::SIsMember { key, member } => {
            if !holds(tx, &key, Kind::Set)? {
                return Ok(Reply::Bool(false));
            }
            let found: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM kv_sets WHERE key = ?1 AND member = ?2)",
                params![key, member],
                |row| row.get(0),
            )?;
            Reply::Bool(found)
        }
        Command::SMembers { key } => {
            if !holds(tx, &key, Kind::Set)? {
                return Ok(Reply::List(Vec::new()));
            }
            Reply::List(strings(
                tx,
                "SELECT member FROM kv_sets WHERE key = ?1 ORDER BY member",
                params![key],
            )?)
        }
        Command::SCard { key } => Reply::Int(count(tx, &key, Kind::Set)?),
    };
    Ok(reply)
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, RollbotError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("store not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), DatabaseError> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RollbotError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn execute(&self, commands: Vec<Command>) -> Result<Vec<Reply>, RollbotError> {
        for command in &commands {
            metrics::counter!(
                "rollbot_store_ops_total",
                "backend" => "sqlite",
                "op" => command.name()
            )
            .increment(1);
        }

        self.db()?
            .connection()
            .call(move |conn| -> Result<Vec<Reply>, DatabaseError> {
                let now = now_millis();
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM kv_keys WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                    params![now],
                )?;
                let mut replies = Vec::with_capacity(commands.len());
                for command in commands {
                    replies.push(apply(&tx, command, now)?);
                }
                tx.commit()?;
                Ok(replies)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, RollbotError> {
        let prefix = prefix.to_string();
        self.db()?
            .connection()
            .call(move |conn| -> Result<Vec<String>, DatabaseError> {
                let mut stmt = conn.prepare(
                    "SELECT key FROM kv_keys
                     WHERE substr(key, 1, ?2) = ?1
                       AND (expires_at IS NULL OR expires_at > ?3)
                     ORDER BY key",
                )?;
                let keys = stmt
                    .query_map(
                        params![prefix, prefix.chars().count() as i64, now_millis()],
                        |row| row.get(0),
                    )?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store(dir: &tempfile::TempDir) -> SqliteStore {
        let config = StorageConfig {
            database_path: dir.path().join("kv.db").to_string_lossy().into_owned(),
            ..StorageConfig::default()
        };
        SqliteStore::open(config).await.unwrap()
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open_store(&dir).await;
            store
                .run(Command::HSet {
                    key: "saved:1".into(),
                    field: "Fireball".into(),
                    value: "{}".into(),
                })
                .await
                .unwrap();
            store.shutdown().await.unwrap();
        }

        let store = open_store(&dir).await;
        let all = store
            .run(Command::HGetAll {
                key: "saved:1".into(),
            })
            .await
            .unwrap()
            .into_map()
            .unwrap();
        assert_eq!(all, vec![("Fireball".to_string(), "{}".to_string())]);
    }

    #[tokio::test]
    async fn uninitialized_store_reports_errors() {
        let store = SqliteStore::new(StorageConfig::default());
        assert!(store.run(Command::Get { key: "k".into() }).await.is_err());
        assert!(matches!(
            store.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }

    #[tokio::test]
    async fn expired_keys_are_purged() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store
            .execute(vec![
                Command::SAdd {
                    key: "pref:1".into(),
                    member: "x".into(),
                },
                Command::Expire {
                    key: "pref:1".into(),
                    ttl: Duration::from_millis(1),
                },
            ])
            .await
            .unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let card = store
            .run(Command::SCard {
                key: "pref:1".into(),
            })
            .await
            .unwrap();
        assert_eq!(card, Reply::Int(0));
        assert!(store.scan_prefix("pref:").await.unwrap().is_empty());
    }
}
