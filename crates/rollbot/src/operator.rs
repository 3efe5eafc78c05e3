// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator commands that work directly against the store.
//!
//! These run outside the bot process, so shard states are unknown and
//! reported only by their guild membership.

use std::sync::Arc;
use std::time::Duration;

use rollbot_bot::StatsReport;
use rollbot_config::RollbotConfig;
use rollbot_core::{
    AutocompleteField, Choice, Deadline, HealthStatus, KeyValueStore, RollbotError, UserId,
};
use rollbot_history::{RollInput, RollStore};
use rollbot_shard::Membership;
use rollbot_suggest::{suggest_labels, suggest_names, suggest_removals, suggest_rolls};
use tracing::{debug, warn};

/// Store health plus usage numbers, as shown by `rollbot status`.
#[derive(Debug)]
pub struct Status {
    pub backend: String,
    pub health: HealthStatus,
    pub report: StatsReport,
}

/// Direct access to one user's data and the bot's bookkeeping.
pub struct Operator {
    store: Arc<dyn KeyValueStore>,
    rolls: RollStore,
    membership: Membership,
    timeout: Duration,
}

impl Operator {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &RollbotConfig) -> Self {
        Self {
            rolls: RollStore::new(Arc::clone(&store), config),
            membership: Membership::new(Arc::clone(&store)),
            store,
            timeout: config.bot.request_timeout(),
        }
    }

    /// Opens the configured store backend.
    pub async fn open(config: &RollbotConfig) -> Result<Self, RollbotError> {
        let store = rollbot_storage::open_store(&config.storage).await?;
        Ok(Self::new(store, config))
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.timeout)
    }

    pub async fn status(&self) -> Result<Status, RollbotError> {
        let health = self.store.health_check().await?;
        let shards = self
            .membership
            .known_shards()
            .await?
            .into_iter()
            .map(|id| (id, None))
            .collect();
        let report =
            StatsReport::collect(&self.rolls, &self.membership, shards, self.deadline()).await?;
        Ok(Status {
            backend: self.store.name().to_string(),
            health,
            report,
        })
    }

    pub async fn history(&self, user: &UserId) -> Result<Vec<RollInput>, RollbotError> {
        self.rolls.recent_rolls(user, self.deadline()).await
    }

    pub async fn saved(&self, user: &UserId) -> Result<Vec<RollInput>, RollbotError> {
        self.rolls.saved_expressions(user, self.deadline()).await
    }

    /// The suggestions `user` would see when typing `partial` into `field`.
    pub async fn suggest(
        &self,
        user: &UserId,
        field: AutocompleteField,
        partial: &str,
    ) -> Result<Vec<Choice>, RollbotError> {
        let deadline = self.deadline();
        let saved = self.rolls.saved_expressions(user, deadline).await?;
        let choices = match field {
            AutocompleteField::Roll => {
                let recent = self.rolls.recent_rolls(user, deadline).await?;
                suggest_rolls(partial, &recent, &saved)
            }
            AutocompleteField::Unsave => suggest_removals(partial, &saved),
            AutocompleteField::SaveName => suggest_names(partial, &saved),
            AutocompleteField::Label => {
                let recent = self.rolls.recent_rolls(user, deadline).await?;
                suggest_labels(partial, &recent, &saved)
            }
        };
        debug!(user = %user, field = %field, count = choices.len(), "suggestions built");
        Ok(choices)
    }

    pub async fn export(&self, user: &UserId) -> Result<Vec<u8>, RollbotError> {
        self.rolls.export_saved(user, self.deadline()).await
    }

    /// Replaces the user's saved expressions with `data`. Returns the new total.
    pub async fn import(&self, user: &UserId, data: &str) -> Result<i64, RollbotError> {
        self.rolls.import_saved(user, data, self.deadline()).await
    }

    /// Returns whether history and saved expressions existed before clearing.
    pub async fn clear(
        &self,
        user: &UserId,
        history: bool,
        saved: bool,
    ) -> Result<(bool, bool), RollbotError> {
        let deadline = self.deadline();
        let had_history = if history {
            self.rolls.clear_history(user, deadline).await?
        } else {
            false
        };
        let had_saved = if saved {
            self.rolls.clear_saved(user, deadline).await?
        } else {
            false
        };
        Ok((had_history, had_saved))
    }

    pub async fn close(&self) {
        if let Err(e) = self.store.shutdown().await {
            warn!(error = %e, "error closing store");
        }
    }
}
