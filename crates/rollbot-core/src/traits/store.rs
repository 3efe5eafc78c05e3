// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed store trait with strings, sorted sets, hashes, sets, and per-key TTL.
//!
//! Every call goes through [`KeyValueStore::execute`], which applies a batch
//! of [`Command`]s atomically: either every command takes effect or none do,
//! and no other batch observes an intermediate state.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::RollbotError;
use crate::traits::adapter::PluginAdapter;

/// A single store command.
///
/// Sorted-set ranks follow the usual convention: rank 0 is the lowest score,
/// negative ranks count from the end (-1 is the highest score), and both
/// bounds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Reply: `Value` or `Nil`.
    Get { key: String },
    /// Reply: `Ok`. Replaces any existing key of any type.
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    /// Reply: `Int` (the new value). A missing key counts as 0.
    Incr { key: String },
    /// Reply: `Int` (number of keys removed).
    Del { keys: Vec<String> },
    /// Reply: `Bool` (false when the key does not exist).
    Expire { key: String, ttl: Duration },
    /// Reply: `Bool` (true when the member is new). Updates the score of an existing member.
    ZAdd {
        key: String,
        score: f64,
        member: String,
    },
    /// Reply: `List` of members, highest score first.
    ZRevRange { key: String, start: i64, stop: i64 },
    /// Reply: `Int` (members removed).
    ZRemRangeByRank { key: String, start: i64, stop: i64 },
    /// Reply: `Int` (members removed). Both bounds inclusive.
    ZRemRangeByScore { key: String, min: f64, max: f64 },
    /// Reply: `Int`.
    ZCard { key: String },
    /// Reply: `Bool` (true when the field is new).
    HSet {
        key: String,
        field: String,
        value: String,
    },
    /// Like `HSet`, but a new field is only added while the hash holds
    /// fewer than `max_len` fields. Reply: `Bool` (true when the field is
    /// new), or `Nil` when the hash is full and nothing was written.
    HSetBounded {
        key: String,
        field: String,
        value: String,
        max_len: usize,
    },
    /// Reply: `Value` or `Nil`.
    HGet { key: String, field: String },
    /// Reply: `Map`, ordered by field.
    HGetAll { key: String },
    /// Reply: `Bool` (true when the field existed).
    HDel { key: String, field: String },
    /// Reply: `Int`.
    HLen { key: String },
    /// Reply: `Bool` (true when the member is new).
    SAdd { key: String, member: String },
    /// Reply: `Bool` (true when the member existed).
    SRem { key: String, member: String },
    /// Reply: `Bool`.
    SIsMember { key: String, member: String },
    /// Reply: `List`, ordered by member.
    SMembers { key: String },
    /// Reply: `Int`.
    SCard { key: String },
}

impl Command {
    /// Lower-case command name, used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "get",
            Self::Set { .. } => "set",
            Self::Incr { .. } => "incr",
            Self::Del { .. } => "del",
            Self::Expire { .. } => "expire",
            Self::ZAdd { .. } => "zadd",
            Self::ZRevRange { .. } => "zrevrange",
            Self::ZRemRangeByRank { .. } => "zremrangebyrank",
            Self::ZRemRangeByScore { .. } => "zremrangebyscore",
            Self::ZCard { .. } => "zcard",
            Self::HSet { .. } => "hset",
            Self::HSetBounded { .. } => "hsetbounded",
            Self::HGet { .. } => "hget",
            Self::HGetAll { .. } => "hgetall",
            Self::HDel { .. } => "hdel",
            Self::HLen { .. } => "hlen",
            Self::SAdd { .. } => "sadd",
            Self::SRem { .. } => "srem",
            Self::SIsMember { .. } => "sismember",
            Self::SMembers { .. } => "smembers",
            Self::SCard { .. } => "scard",
        }
    }
}

/// The result of one [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Nil,
    Ok,
    Int(i64),
    Bool(bool),
    Value(String),
    List(Vec<String>),
    Map(Vec<(String, String)>),
}

impl Reply {
    fn unexpected(&self, wanted: &str) -> RollbotError {
        RollbotError::Internal(format!("expected {wanted} reply, got {self:?}"))
    }

    pub fn into_int(self) -> Result<i64, RollbotError> {
        match self {
            Self::Int(n) => Ok(n),
            other => Err(other.unexpected("integer")),
        }
    }

    pub fn into_bool(self) -> Result<bool, RollbotError> {
        match self {
            Self::Bool(b) => Ok(b),
            other => Err(other.unexpected("boolean")),
        }
    }

    /// `Nil` becomes `None`.
    pub fn into_value(self) -> Result<Option<String>, RollbotError> {
        match self {
            Self::Value(v) => Ok(Some(v)),
            Self::Nil => Ok(None),
            other => Err(other.unexpected("value")),
        }
    }

    pub fn into_list(self) -> Result<Vec<String>, RollbotError> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(other.unexpected("list")),
        }
    }

    pub fn into_map(self) -> Result<Vec<(String, String)>, RollbotError> {
        match self {
            Self::Map(entries) => Ok(entries),
            other => Err(other.unexpected("map")),
        }
    }
}

/// Resolves an inclusive rank range against a collection of `len` items.
///
/// Returns `None` when the range selects nothing.
pub fn rank_bounds(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// A keyed store supporting atomic multi-command batches.
#[async_trait]
pub trait KeyValueStore: PluginAdapter {
    /// Executes `commands` as one atomic batch, returning one reply per command.
    ///
    /// Fails as a whole if any command fails (for example a command applied
    /// to a key holding a different type); no command of a failed batch
    /// takes effect.
    async fn execute(&self, commands: Vec<Command>) -> Result<Vec<Reply>, RollbotError>;

    /// Lists the live keys starting with `prefix`, in key order.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, RollbotError>;

    /// Executes a single command.
    async fn run(&self, command: Command) -> Result<Reply, RollbotError> {
        let name = command.name();
        self.execute(vec![command])
            .await?
            .pop()
            .ok_or_else(|| RollbotError::Internal(format!("no reply for {name}")))
    }
}
