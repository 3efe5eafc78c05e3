// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Which guilds each shard is serving, persisted per shard generation.

use std::sync::Arc;

use tracing::debug;

use rollbot_core::{Command, GuildId, KeyValueStore, RollbotError, ShardId};

const PREFIX: &str = "shard:";
const SUFFIX: &str = ":guilds";

/// Set of guild IDs served by `shard`.
pub fn guild_key(shard: ShardId) -> String {
    format!("{PREFIX}{shard}{SUFFIX}")
}

/// Guild membership sets, one per shard.
#[derive(Clone)]
pub struct Membership {
    store: Arc<dyn KeyValueStore>,
}

impl Membership {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Records that `guild` is served by `shard`. Returns whether it was new.
    pub async fn add_guild(&self, shard: ShardId, guild: &GuildId) -> Result<bool, RollbotError> {
        self.store
            .run(Command::SAdd {
                key: guild_key(shard),
                member: guild.0.clone(),
            })
            .await?
            .into_bool()
    }

    /// Forgets `guild` on `shard`. Returns whether it was present.
    pub async fn remove_guild(&self, shard: ShardId, guild: &GuildId) -> Result<bool, RollbotError> {
        self.store
            .run(Command::SRem {
                key: guild_key(shard),
                member: guild.0.clone(),
            })
            .await?
            .into_bool()
    }

    /// Guild count for each of `shards`, in the same order.
    pub async fn guild_counts(&self, shards: &[ShardId]) -> Result<Vec<(ShardId, i64)>, RollbotError> {
        if shards.is_empty() {
            return Ok(Vec::new());
        }
        let commands = shards
            .iter()
            .map(|id| Command::SCard { key: guild_key(*id) })
            .collect();
        let replies = self.store.execute(commands).await?;
        shards
            .iter()
            .zip(replies)
            .map(|(id, reply)| Ok((*id, reply.into_int()?)))
            .collect()
    }

    /// Shards that currently have a membership set, in shard order.
    pub async fn known_shards(&self) -> Result<Vec<ShardId>, RollbotError> {
        let mut shards: Vec<ShardId> = self
            .store
            .scan_prefix(PREFIX)
            .await?
            .iter()
            .filter_map(|key| key.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?.parse::<u32>().ok())
            .map(ShardId)
            .collect();
        shards.sort();
        Ok(shards)
    }

    /// Deletes every shard's membership set. Returns how many were removed.
    pub async fn clear_all(&self) -> Result<i64, RollbotError> {
        let keys: Vec<String> = self
            .store
            .scan_prefix(PREFIX)
            .await?
            .into_iter()
            .filter(|key| key.ends_with(SUFFIX))
            .collect();
        if keys.is_empty() {
            return Ok(0);
        }
        debug!(count = keys.len(), "clearing stale shard membership");
        self.store.run(Command::Del { keys }).await?.into_int()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout() {
        assert_eq!(guild_key(ShardId(4)), "shard:4:guilds");
    }
}
