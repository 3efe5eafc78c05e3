// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Rollbot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Rollbot configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RollbotConfig {
    /// Bot identity and request handling settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Gateway and sharding settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Durable store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// In-process read-through cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Roll history and saved expression limits.
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Bot identity and request handling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name of the bot.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// User IDs allowed to run administrative commands.
    #[serde(default)]
    pub owners: Vec<String>,

    /// Deadline for ordinary commands, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Deadline for autocomplete requests, in milliseconds.
    #[serde(default = "default_autocomplete_timeout_ms")]
    pub autocomplete_timeout_ms: u64,

    /// Largest number of dice a single roll may request.
    #[serde(default = "default_max_dice")]
    pub max_dice: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
            owners: Vec::new(),
            request_timeout_ms: default_request_timeout_ms(),
            autocomplete_timeout_ms: default_autocomplete_timeout_ms(),
            max_dice: default_max_dice(),
        }
    }
}

impl BotConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn autocomplete_timeout(&self) -> Duration {
        Duration::from_millis(self.autocomplete_timeout_ms)
    }

    /// Whether `user` may run administrative commands.
    pub fn is_owner(&self, user: &str) -> bool {
        self.owners.iter().any(|o| o == user)
    }
}

fn default_bot_name() -> String {
    "rollbot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_autocomplete_timeout_ms() -> u64 {
    2_000
}

fn default_max_dice() -> u64 {
    1_000
}

/// Gateway and sharding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Bot token. `None` requires the `ROLLBOT_GATEWAY_TOKEN` environment variable.
    #[serde(default)]
    pub token: Option<String>,

    /// Lower bound on the shard count, regardless of the platform recommendation.
    #[serde(default = "default_min_shards")]
    pub min_shards: u32,

    /// How long startup waits for shard 0 to resolve the bot's own user.
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            token: None,
            min_shards: default_min_shards(),
            ready_timeout_secs: default_ready_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }
}

fn default_min_shards() -> u32 {
    2
}

fn default_ready_timeout_secs() -> u64 {
    10
}

/// Which durable store implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Upper bound on a single store call, in milliseconds.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

impl StorageConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("rollbot").join("rollbot.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("rollbot.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_op_timeout_ms() -> u64 {
    2_000
}

/// Read-through cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of cached keys.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Lifetime of a cached entry, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn default_cache_capacity() -> usize {
    1_000
}

fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

/// Roll history and saved expression limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    /// Number of recent rolls kept per user.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Rolls older than this are pruned from the recent list.
    #[serde(default = "default_recent_window_hours")]
    pub recent_window_hours: u64,

    /// Idle lifetime of a user's recent-roll key.
    #[serde(default = "default_history_ttl_hours")]
    pub history_ttl_hours: u64,

    /// Idle lifetime of a user's saved-expression key.
    #[serde(default = "default_data_ttl_hours")]
    pub data_ttl_hours: u64,

    /// Maximum number of saved expressions per user.
    #[serde(default = "default_max_expressions")]
    pub max_expressions: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            recent_window_hours: default_recent_window_hours(),
            history_ttl_hours: default_history_ttl_hours(),
            data_ttl_hours: default_data_ttl_hours(),
            max_expressions: default_max_expressions(),
        }
    }
}

const HOUR: u64 = 60 * 60;

impl HistoryConfig {
    pub fn recent_window(&self) -> Duration {
        Duration::from_secs(self.recent_window_hours.saturating_mul(HOUR))
    }

    pub fn history_ttl(&self) -> Duration {
        Duration::from_secs(self.history_ttl_hours.saturating_mul(HOUR))
    }

    pub fn data_ttl(&self) -> Duration {
        Duration::from_secs(self.data_ttl_hours.saturating_mul(HOUR))
    }
}

fn default_max_history() -> usize {
    25
}

fn default_recent_window_hours() -> u64 {
    7 * 24
}

fn default_history_ttl_hours() -> u64 {
    14 * 24
}

fn default_data_ttl_hours() -> u64 {
    93 * 24
}

fn default_max_expressions() -> usize {
    50
}
