// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process implementation of the `KeyValueStore` trait.
//!
//! Holds the whole keyspace behind one mutex, so every batch is trivially
//! isolated. A failed batch is rolled back from an undo journal of the keys
//! it touched. Expiry uses `tokio::time`, which lets tests pause and advance
//! the clock.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use rollbot_core::traits::store::rank_bounds;
use rollbot_core::{
    AdapterType, Command, HealthStatus, KeyValueStore, PluginAdapter, Reply, RollbotError,
};

#[derive(Debug, Clone)]
enum Value {
    String(String),
    /// Kept sorted by (score, member).
    ZSet(Vec<(f64, String)>),
    Hash(BTreeMap<String, String>),
    Set(BTreeSet<String>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::ZSet(_) => "zset",
            Self::Hash(_) => "hash",
            Self::Set(_) => "set",
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::String(_) => false,
            Self::ZSet(z) => z.is_empty(),
            Self::Hash(h) => h.is_empty(),
            Self::Set(s) => s.is_empty(),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct Keyspace {
    entries: HashMap<String, Entry>,
}

fn wrong_type(key: &str, expected: &str, actual: &Value) -> RollbotError {
    RollbotError::storage(format!(
        "WRONGTYPE key `{key}` holds a {}, not a {expected}",
        actual.kind()
    ))
}

macro_rules! typed {
    ($fn_name:ident, $fn_mut:ident, $variant:ident, $ty:ty, $label:literal) => {
        fn $fn_name(&self, key: &str) -> Result<Option<&$ty>, RollbotError> {
            match self.entries.get(key).map(|e| &e.value) {
                None => Ok(None),
                Some(Value::$variant(v)) => Ok(Some(v)),
                Some(other) => Err(wrong_type(key, $label, other)),
            }
        }

        fn $fn_mut(&mut self, key: &str) -> Result<&mut $ty, RollbotError> {
            let entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
                value: Value::$variant(Default::default()),
                expires_at: None,
            });
            match &mut entry.value {
                Value::$variant(v) => Ok(v),
                other => Err(wrong_type(key, $label, other)),
            }
        }
    };
}

impl Keyspace {
    typed!(zset, zset_mut, ZSet, Vec<(f64, String)>, "zset");
    typed!(hash, hash_mut, Hash, BTreeMap<String, String>, "hash");
    typed!(set, set_mut, Set, BTreeSet<String>, "set");

    fn purge_expired(&mut self, now: Instant) {
        self.entries
            .retain(|_, e| e.expires_at.is_none_or(|at| at > now));
    }

    fn drop_if_empty(&mut self, key: &str) {
        if self.entries.get(key).is_some_and(|e| e.value.is_empty()) {
            self.entries.remove(key);
        }
    }

    fn apply(&mut self, command: Command, now: Instant) -> Result<Reply, RollbotError> {
        let reply = match command {
            Command::Get { key } => match self.entries.get(&key).map(|e| &e.value) {
                None => Reply::Nil,
                Some(Value::String(v)) => Reply::Value(v.clone()),
                Some(other) => return Err(wrong_type(&key, "string", other)),
            },
            Command::Set { key, value, ttl } => {
                self.entries.insert(
                    key,
                    Entry {
                        value: Value::String(value),
                        expires_at: ttl.map(|t| now + t),
                    },
                );
                Reply::Ok
            }
            Command::Incr { key } => {
                let entry = self.entries.entry(key.clone()).or_insert_with(|| Entry {
                    value: Value::String("0".into()),
                    expires_at: None,
                });
                let raw = match &mut entry.value {
                    Value::String(raw) => raw,
                    other => return Err(wrong_type(&key, "string", other)),
                };
                let next = raw
                    .parse::<i64>()
                    .ok()
                    .and_then(|n| n.checked_add(1))
                    .ok_or_else(|| {
                        RollbotError::storage(format!("value at key `{key}` is not an integer"))
                    })?;
                *raw = next.to_string();
                Reply::Int(next)
            }
            Command::Del { keys } => {
                let removed = keys
                    .iter()
                    .filter(|k| self.entries.remove(k.as_str()).is_some())
                    .count();
                Reply::Int(removed as i64)
            }
            Command::Expire { key, ttl } => match self.entries.get_mut(&key) {
                Some(entry) => {
                    entry.expires_at = Some(now + ttl);
                    Reply::Bool(true)
                }
                None => Reply::Bool(false),
            },
            Command::ZAdd { key, score, member } => {
                let zset = self.zset_mut(&key)?;
                let existed = match zset.iter().position(|(_, m)| *m == member) {
                    Some(i) => {
                        zset.remove(i);
                        true
                    }
                    None => false,
                };
                let at = zset.partition_point(|(s, m)| {
                    s.total_cmp(&score).then_with(|| m.cmp(&member)).is_lt()
                });
                zset.insert(at, (score, member));
                Reply::Bool(!existed)
            }
            Command::ZRevRange { key, start, stop } => {
                let members = self.zset(&key)?.map_or_else(Vec::new, |zset| {
                    rank_bounds(zset.len(), start, stop).map_or_else(Vec::new, |(from, to)| {
                        zset.iter()
                            .rev()
                            .skip(from)
                            .take(to - from + 1)
                            .map(|(_, m)| m.clone())
                            .collect()
                    })
                });
                Reply::List(members)
            }
            Command::ZRemRangeByRank { key, start, stop } => {
                let len = self.zset(&key)?.map_or(0, Vec::len);
                let removed = match rank_bounds(len, start, stop) {
                    None => 0,
                    Some((from, to)) => {
                        self.zset_mut(&key)?.drain(from..=to);
                        to - from + 1
                    }
                };
                self.drop_if_empty(&key);
                Reply::Int(removed as i64)
            }
            Command::ZRemRangeByScore { key, min, max } => {
                if self.zset(&key)?.is_none() {
                    return Ok(Reply::Int(0));
                }
                let zset = self.zset_mut(&key)?;
                let before = zset.len();
                zset.retain(|(s, _)| *s < min || *s > max);
                let removed = before - zset.len();
                self.drop_if_empty(&key);
                Reply::Int(removed as i64)
            }
            Command::ZCard { key } => Reply::Int(self.zset(&key)?.map_or(0, |z| z.len() as i64)),
            Command::HSet { key, field, value } => {
                Reply::Bool(self.hash_mut(&key)?.insert(field, value).is_none())
            }
            Command::HSetBounded {
                key,
                field,
                value,
                max_len,
            } => {
                let (len, exists) = self
                    .hash(&key)?
                    .map_or((0, false), |h| (h.len(), h.contains_key(&field)));
                if !exists && len >= max_len {
                    Reply::Nil
                } else {
                    Reply::Bool(self.hash_mut(&key)?.insert(field, value).is_none())
                }
            }
            Command::HGet { key, field } => self
                .hash(&key)?
                .and_then(|h| h.get(&field).cloned())
                .map_or(Reply::Nil, Reply::Value),
            Command::HGetAll { key } => Reply::Map(self.hash(&key)?.map_or_else(Vec::new, |h| {
                h.iter().map(|(f, v)| (f.clone(), v.clone())).collect()
            })),
            Command::HDel { key, field } => {
                if self.hash(&key)?.is_none() {
                    return Ok(Reply::Bool(false));
                }
                let removed = self.hash_mut(&key)?.remove(&field).is_some();
                self.drop_if_empty(&key);
                Reply::Bool(removed)
            }
            Command::HLen { key } => Reply::Int(self.hash(&key)?.map_or(0, |h| h.len() as i64)),
            Command::SAdd { key, member } => Reply::Bool(self.set_mut(&key)?.insert(member)),
            Command::SRem { key, member } => {
                if self.set(&key)?.is_none() {
                    return Ok(Reply::Bool(false));
                }
                let removed = self.set_mut(&key)?.remove(&member);
                self.drop_if_empty(&key);
                Reply::Bool(removed)
            }
            Command::SIsMember { key, member } => {
                Reply::Bool(self.set(&key)?.is_some_and(|s| s.contains(&member)))
            }
            Command::SMembers { key } => Reply::List(
                self.set(&key)?
                    .map_or_else(Vec::new, |s| s.iter().cloned().collect()),
            ),
            Command::SCard { key } => Reply::Int(self.set(&key)?.map_or(0, |s| s.len() as i64)),
        };
        Ok(reply)
    }
}

/// Keys a command may modify.
fn touched_keys(command: &Command) -> Vec<&str> {
    match command {
        Command::Del { keys } => keys.iter().map(String::as_str).collect(),
        Command::Get { key }
        | Command::Set { key, .. }
        | Command::Incr { key }
        | Command::Expire { key, .. }
        | Command::ZAdd { key, .. }
        | Command::ZRevRange { key, .. }
        | Command::ZRemRangeByRank { key, .. }
        | Command::ZRemRangeByScore { key, .. }
        | Command::ZCard { key }
        | Command::HSet { key, .. }
        | Command::HSetBounded { key, .. }
        | Command::HGet { key, .. }
        | Command::HGetAll { key }
        | Command::HDel { key, .. }
        | Command::HLen { key }
        | Command::SAdd { key, .. }
        | Command::SRem { key, .. }
        | Command::SIsMember { key, .. }
        | Command::SMembers { key }
        | Command::SCard { key } => vec![key.as_str()],
    }
}

/// In-memory keyed store.
#[derive(Default)]
pub struct MemoryStore {
    keyspace: Mutex<Keyspace>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Keyspace>, RollbotError> {
        self.keyspace
            .lock()
            .map_err(|_| RollbotError::Internal("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, RollbotError> {
        self.lock()?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RollbotError> {
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn execute(&self, commands: Vec<Command>) -> Result<Vec<Reply>, RollbotError> {
        let now = Instant::now();
        let mut keyspace = self.lock()?;
        keyspace.purge_expired(now);

        let mut journal: HashMap<String, Option<Entry>> = HashMap::new();
        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            metrics::counter!(
                "rollbot_store_ops_total",
                "backend" => "memory",
                "op" => command.name()
            )
            .increment(1);

            for key in touched_keys(&command) {
                if !journal.contains_key(key) {
                    journal.insert(key.to_string(), keyspace.entries.get(key).cloned());
                }
            }

            match keyspace.apply(command, now) {
                Ok(reply) => replies.push(reply),
                Err(e) => {
                    for (key, previous) in journal {
                        match previous {
                            Some(entry) => keyspace.entries.insert(key, entry),
                            None => keyspace.entries.remove(&key),
                        };
                    }
                    return Err(e);
                }
            }
        }
        Ok(replies)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, RollbotError> {
        let mut keyspace = self.lock()?;
        keyspace.purge_expired(Instant::now());
        let mut keys: Vec<String> = keyspace
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SECOND: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn keys_expire_with_tokio_clock() {
        let store = MemoryStore::new();
        store
            .run(Command::Set {
                key: "k".into(),
                value: "v".into(),
                ttl: Some(10 * SECOND),
            })
            .await
            .unwrap();

        tokio::time::advance(9 * SECOND).await;
        assert_eq!(
            store.run(Command::Get { key: "k".into() }).await.unwrap(),
            Reply::Value("v".into())
        );

        tokio::time::advance(2 * SECOND).await;
        assert_eq!(
            store.run(Command::Get { key: "k".into() }).await.unwrap(),
            Reply::Nil
        );
    }

    #[tokio::test]
    async fn zadd_keeps_score_order_with_member_tiebreak() {
        let store = MemoryStore::new();
        let add = |score: f64, member: &str| Command::ZAdd {
            key: "z".into(),
            score,
            member: member.into(),
        };
        store
            .execute(vec![add(2.0, "b"), add(1.0, "z"), add(2.0, "a"), add(0.5, "b")])
            .await
            .unwrap();
        let members = store
            .run(Command::ZRevRange {
                key: "z".into(),
                start: 0,
                stop: -1,
            })
            .await
            .unwrap()
            .into_list()
            .unwrap();
        assert_eq!(members, vec!["a", "z", "b"]);
    }
}
