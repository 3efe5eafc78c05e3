// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user roll history, saved expressions, preferences and roll counters.
//!
//! Every multi-step mutation is sent to the store as one batch, so a reader
//! never sees a half-pruned history and a cancelled request never leaves a
//! partial write behind. Reads go through the [`ReadThroughCache`]. A write
//! invalidates the keys it touches before the batch is sent and again once
//! the store has finished with it. The batch runs on its own task, so the
//! second invalidation happens even when the request that issued the write
//! has already given up on it.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use rollbot_config::{HistoryConfig, RollbotConfig};
use rollbot_core::{Command, Deadline, KeyValueStore, Preference, Reply, RollbotError, UserId};

use crate::cache::ReadThroughCache;
use crate::clock::{Clock, SystemClock};
use crate::keys;
use crate::roll::RollInput;
use crate::transfer;

/// Aggregate usage numbers reported by the stats command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageStats {
    pub total_rolls: i64,
    pub users_with_saved: usize,
    pub total_saved: i64,
}

/// The Roll History & Suggestion Store.
pub struct RollStore {
    store: Arc<dyn KeyValueStore>,
    cache: Arc<ReadThroughCache<Reply>>,
    clock: Arc<dyn Clock>,
    limits: HistoryConfig,
    op_timeout: Duration,
}

impl RollStore {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &RollbotConfig) -> Self {
        Self {
            store,
            cache: Arc::new(ReadThroughCache::new(config.cache.capacity, config.cache.ttl())),
            clock: Arc::new(SystemClock),
            limits: config.history.clone(),
            op_timeout: config.storage.op_timeout(),
        }
    }

    /// Replaces the wall clock used to score history entries.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn limits(&self) -> &HistoryConfig {
        &self.limits
    }

    /// Runs one store call under `min(op_timeout, time left before deadline)`.
    async fn bounded<T>(
        &self,
        deadline: Deadline,
        call: impl Future<Output = Result<T, RollbotError>>,
    ) -> Result<T, RollbotError> {
        if deadline.is_expired() {
            return Err(RollbotError::Timeout {
                duration: Duration::ZERO,
            });
        }
        let budget = deadline.budget(self.op_timeout);
        tokio::time::timeout(budget, call)
            .await
            .map_err(|_| RollbotError::Timeout { duration: budget })?
    }

    async fn exec(
        &self,
        deadline: Deadline,
        commands: Vec<Command>,
    ) -> Result<Vec<Reply>, RollbotError> {
        self.bounded(deadline, self.store.execute(commands)).await
    }

    async fn exec_one(&self, deadline: Deadline, command: Command) -> Result<Reply, RollbotError> {
        self.bounded(deadline, self.store.run(command)).await
    }

    /// Executes a write batch that changes the cached `dirty` keys.
    ///
    /// The keys are invalidated before the batch is sent and again when the
    /// store returns, whatever the outcome. The second invalidation runs on
    /// the batch's task, so it still happens when this future is dropped or
    /// times out while the store is committing.
    async fn write(
        &self,
        deadline: Deadline,
        dirty: &[String],
        commands: Vec<Command>,
    ) -> Result<Vec<Reply>, RollbotError> {
        if deadline.is_expired() {
            return Err(RollbotError::Timeout {
                duration: Duration::ZERO,
            });
        }
        for key in dirty {
            self.cache.invalidate(key);
        }

        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        let touched = dirty.to_vec();
        let batch = tokio::spawn(async move {
            let result = store.execute(commands).await;
            for key in &touched {
                cache.invalidate(key);
            }
            result
        });

        self.bounded(deadline, async move {
            batch
                .await
                .map_err(|e| RollbotError::Internal(format!("store write task failed: {e}")))?
        })
        .await
    }

    async fn cached(
        &self,
        deadline: Deadline,
        key: &str,
        command: Command,
    ) -> Result<Reply, RollbotError> {
        self.cache
            .get_or_fetch(key, || self.exec_one(deadline, command))
            .await
    }

    /// Appends `input` to the user's recent rolls and prunes the history.
    ///
    /// Returns `false` without touching the store when the user has opted
    /// out of history or the input would not fit in a suggestion.
    pub async fn record_roll(
        &self,
        user: &UserId,
        input: &RollInput,
        deadline: Deadline,
    ) -> Result<bool, RollbotError> {
        if input.expression.is_empty() || !input.fits_suggestion_limit() {
            debug!(user = %user, "roll not recorded: does not fit a suggestion");
            return Ok(false);
        }
        if self
            .has_preference(user, Preference::NoRecentHistory, deadline)
            .await?
        {
            return Ok(false);
        }

        let recent = keys::recent(user);
        let now = self.clock.now_millis();
        let window = i64::try_from(self.limits.recent_window().as_millis()).unwrap_or(i64::MAX);
        let cutoff = now.saturating_sub(window);
        let keep = i64::try_from(self.limits.max_history).unwrap_or(i64::MAX);
        let commands = vec![
            Command::ZAdd {
                key: recent.clone(),
                score: now as f64,
                member: input.serialize(),
            },
            Command::Expire {
                key: recent.clone(),
                ttl: self.limits.history_ttl(),
            },
            Command::Expire {
                key: keys::saved(user),
                ttl: self.limits.data_ttl(),
            },
            // Newest `keep` by rank, then nothing older than the window.
            Command::ZRemRangeByRank {
                key: recent.clone(),
                start: 0,
                stop: -keep - 1,
            },
            Command::ZRemRangeByScore {
                key: recent.clone(),
                min: f64::NEG_INFINITY,
                max: cutoff as f64,
            },
        ];
        self.write(deadline, &[recent], commands).await?;
        Ok(true)
    }

    /// The user's recent rolls, most recent first.
    pub async fn recent_rolls(
        &self,
        user: &UserId,
        deadline: Deadline,
    ) -> Result<Vec<RollInput>, RollbotError> {
        let key = keys::recent(user);
        let members = self
            .cached(
                deadline,
                &key,
                Command::ZRevRange {
                    key: key.clone(),
                    start: 0,
                    stop: -1,
                },
            )
            .await?
            .into_list()?;
        Ok(members
            .iter()
            .map(|m| RollInput::decode_member(m))
            .filter(|roll| !roll.expression.is_empty())
            .collect())
    }

    /// The user's saved expressions, ordered by ID.
    pub async fn saved_expressions(
        &self,
        user: &UserId,
        deadline: Deadline,
    ) -> Result<Vec<RollInput>, RollbotError> {
        let key = keys::saved(user);
        let entries = self
            .cached(deadline, &key, Command::HGetAll { key: key.clone() })
            .await?
            .into_map()?;
        let mut rolls = Vec::with_capacity(entries.len());
        for (field, value) in entries {
            match RollInput::from_json(&value) {
                Ok(roll) => rolls.push(roll),
                Err(e) => {
                    warn!(user = %user, field = %field, error = %e, "skipping unreadable saved expression")
                }
            }
        }
        Ok(rolls)
    }

    /// Saves (or overwrites by ID) one expression.
    ///
    /// Fails with a quota error when the user is at `max_expressions` and
    /// `input` would add a new ID. Returns the cleaned input as stored.
    pub async fn save_expression(
        &self,
        user: &UserId,
        mut input: RollInput,
        deadline: Deadline,
    ) -> Result<RollInput, RollbotError> {
        input.prepare_for_storage()?;
        let key = keys::saved(user);
        let id = input.id();

        let limit = self.limits.max_expressions;
        let commands = vec![
            Command::HSetBounded {
                key: key.clone(),
                field: id,
                value: input.to_json()?,
                max_len: limit,
            },
            Command::Expire {
                key: key.clone(),
                ttl: self.limits.data_ttl(),
            },
        ];
        let mut replies = self
            .write(deadline, std::slice::from_ref(&key), commands)
            .await?
            .into_iter();
        if next_reply(&mut replies)? == Reply::Nil {
            return Err(RollbotError::QuotaExceeded { limit });
        }
        Ok(input)
    }

    /// Removes one saved expression by ID. Returns whether it existed.
    pub async fn unsave_expression(
        &self,
        user: &UserId,
        id: &str,
        deadline: Deadline,
    ) -> Result<bool, RollbotError> {
        let key = keys::saved(user);
        let command = Command::HDel {
            key: key.clone(),
            field: id.to_string(),
        };
        let mut replies = self.write(deadline, &[key], vec![command]).await?.into_iter();
        next_reply(&mut replies)?.into_bool()
    }

    /// Deletes the user's whole history. Returns whether there was any.
    pub async fn clear_history(&self, user: &UserId, deadline: Deadline) -> Result<bool, RollbotError> {
        self.delete_key(keys::recent(user), deadline).await
    }

    /// Deletes every saved expression of the user. Returns whether there were any.
    pub async fn clear_saved(&self, user: &UserId, deadline: Deadline) -> Result<bool, RollbotError> {
        self.delete_key(keys::saved(user), deadline).await
    }

    async fn delete_key(&self, key: String, deadline: Deadline) -> Result<bool, RollbotError> {
        let command = Command::Del {
            keys: vec![key.clone()],
        };
        let mut replies = self.write(deadline, &[key], vec![command]).await?.into_iter();
        Ok(next_reply(&mut replies)?.into_int()? > 0)
    }

    /// The user's saved expressions as CSV.
    pub async fn export_saved(&self, user: &UserId, deadline: Deadline) -> Result<Vec<u8>, RollbotError> {
        let rolls = self.saved_expressions(user, deadline).await?;
        transfer::export_csv(&rolls)
    }

    /// Replaces the user's saved expressions with the rows of `data`.
    ///
    /// Nothing is written unless every row validates and the row count is
    /// within `max_expressions`. Returns the number of saved expressions
    /// afterwards.
    pub async fn import_saved(
        &self,
        user: &UserId,
        data: &str,
        deadline: Deadline,
    ) -> Result<i64, RollbotError> {
        let rolls = transfer::import_csv(data, self.limits.max_expressions)?;
        let key = keys::saved(user);

        let mut commands = Vec::with_capacity(rolls.len() + 3);
        commands.push(Command::Del {
            keys: vec![key.clone()],
        });
        for roll in &rolls {
            commands.push(Command::HSet {
                key: key.clone(),
                field: roll.id(),
                value: roll.to_json()?,
            });
        }
        commands.push(Command::Expire {
            key: key.clone(),
            ttl: self.limits.data_ttl(),
        });
        commands.push(Command::HLen { key: key.clone() });

        let replies = self.write(deadline, &[key], commands).await?;
        replies
            .into_iter()
            .next_back()
            .ok_or_else(|| RollbotError::Internal("no reply for hlen".into()))?
            .into_int()
    }

    /// Turns a preference flag on or off.
    ///
    /// Turning `no-recent-history` on also deletes the existing history in
    /// the same batch.
    pub async fn set_preference(
        &self,
        user: &UserId,
        preference: Preference,
        enabled: bool,
        deadline: Deadline,
    ) -> Result<(), RollbotError> {
        let key = keys::preferences(user);
        let member = preference.to_string();
        let clears_history = enabled && preference == Preference::NoRecentHistory;

        let mut commands = vec![if enabled {
            Command::SAdd {
                key: key.clone(),
                member,
            }
        } else {
            Command::SRem {
                key: key.clone(),
                member,
            }
        }];
        if clears_history {
            commands.push(Command::Del {
                keys: vec![keys::recent(user)],
            });
        }

        let mut touched = vec![key];
        if clears_history {
            touched.push(keys::recent(user));
        }
        self.write(deadline, &touched, commands).await.map(|_| ())
    }

    /// The user's enabled preference flags. Unknown stored flags are ignored.
    pub async fn preferences(
        &self,
        user: &UserId,
        deadline: Deadline,
    ) -> Result<Vec<Preference>, RollbotError> {
        let key = keys::preferences(user);
        let members = self
            .cached(deadline, &key, Command::SMembers { key: key.clone() })
            .await?
            .into_list()?;
        Ok(members
            .iter()
            .filter_map(|m| Preference::from_str(m).ok())
            .collect())
    }

    pub async fn has_preference(
        &self,
        user: &UserId,
        preference: Preference,
        deadline: Deadline,
    ) -> Result<bool, RollbotError> {
        Ok(self
            .preferences(user, deadline)
            .await?
            .contains(&preference))
    }

    /// Counts one successful roll for `user` and overall. Returns the user's total.
    pub async fn increment_roll_count(
        &self,
        user: &UserId,
        deadline: Deadline,
    ) -> Result<i64, RollbotError> {
        let commands = vec![
            Command::Incr {
                key: keys::ROLLS_TOTAL.to_string(),
            },
            Command::Incr {
                key: keys::user_rolls(user),
            },
        ];
        self.exec(deadline, commands)
            .await?
            .pop()
            .ok_or_else(|| RollbotError::Internal("no reply for incr".into()))?
            .into_int()
    }

    /// Total rolls, users with saved expressions and total saved expressions.
    pub async fn usage_stats(&self, deadline: Deadline) -> Result<UsageStats, RollbotError> {
        let mut commands = vec![Command::Get {
            key: keys::ROLLS_TOTAL.to_string(),
        }];
        let saved_keys = self
            .bounded(deadline, self.store.scan_prefix(keys::SAVED_PREFIX))
            .await?;
        commands.extend(saved_keys.iter().map(|key| Command::HLen { key: key.clone() }));

        let mut replies = self.exec(deadline, commands).await?.into_iter();
        let total_rolls = match next_reply(&mut replies)?.into_value()? {
            Some(v) => v
                .parse()
                .map_err(|_| RollbotError::Internal(format!("{} is not an integer", keys::ROLLS_TOTAL)))?,
            None => 0,
        };
        let mut stats = UsageStats {
            total_rolls,
            ..UsageStats::default()
        };
        for reply in replies {
            let count = reply.into_int()?;
            if count > 0 {
                stats.users_with_saved += 1;
                stats.total_saved += count;
            }
        }
        Ok(stats)
    }
}

fn next_reply(replies: &mut impl Iterator<Item = Reply>) -> Result<Reply, RollbotError> {
    replies
        .next()
        .ok_or_else(|| RollbotError::Internal("store returned too few replies".into()))
}
