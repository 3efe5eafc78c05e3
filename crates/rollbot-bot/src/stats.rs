// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage statistics shown to owners and by the operator CLI.

use std::fmt;

use rollbot_core::{Deadline, RollbotError, ShardId};
use rollbot_history::{RollStore, UsageStats};
use rollbot_shard::{Membership, ShardState};

/// One shard's line in the report. `state` is unknown outside the bot process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardStats {
    pub id: ShardId,
    pub state: Option<ShardState>,
    pub guilds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsReport {
    pub usage: UsageStats,
    pub shards: Vec<ShardStats>,
}

impl StatsReport {
    /// Gathers usage numbers and guild counts for `shards`.
    pub async fn collect(
        rolls: &RollStore,
        membership: &Membership,
        shards: Vec<(ShardId, Option<ShardState>)>,
        deadline: Deadline,
    ) -> Result<Self, RollbotError> {
        let usage = rolls.usage_stats(deadline).await?;
        let ids: Vec<ShardId> = shards.iter().map(|(id, _)| *id).collect();
        let counts = tokio::time::timeout_at(deadline.instant(), membership.guild_counts(&ids))
            .await
            .map_err(|_| RollbotError::Timeout {
                duration: deadline.remaining(),
            })??;
        let shards = shards
            .into_iter()
            .zip(counts)
            .map(|((id, state), (_, guilds))| ShardStats { id, state, guilds })
            .collect();
        Ok(Self { usage, shards })
    }

    pub fn total_guilds(&self) -> i64 {
        self.shards.iter().map(|s| s.guilds).sum()
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rolls: {}", self.usage.total_rolls)?;
        writeln!(
            f,
            "Saved expressions: {} across {} users",
            self.usage.total_saved, self.usage.users_with_saved
        )?;
        write!(f, "Guilds: {}", self.total_guilds())?;
        for shard in &self.shards {
            write!(f, "\n  shard {}: {} guilds", shard.id, shard.guilds)?;
            if let Some(state) = shard.state {
                write!(f, " ({state})")?;
            }
        }
        Ok(())
    }
}
