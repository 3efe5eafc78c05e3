// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::{RollbotConfig, StorageBackend};

/// The platform drops autocomplete responses slower than this.
pub const PLATFORM_INTERACTION_TIMEOUT_MS: u64 = 3_000;

/// Upper bound for request, store and readiness timeouts (15 minutes).
const MAX_TIMEOUT_MS: u64 = 15 * 60 * 1000;

/// Upper bound for windows and TTLs given in hours (ten years).
const MAX_HOURS: u64 = 10 * 365 * 24;

/// Upper bound for per-user history and saved-expression counts.
const MAX_ENTRIES: u64 = 10_000;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns all collected validation errors rather than failing fast.
pub fn validate_config(config: &RollbotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let mut in_range = |key: &str, value: u64, max: u64| {
        if value == 0 {
            errors.push(ConfigError::validation(key, "must be greater than zero"));
        } else if value > max {
            errors.push(ConfigError::validation(
                key,
                format!("must be at most {max}, got {value}"),
            ));
        }
    };
    in_range("bot.request_timeout_ms", config.bot.request_timeout_ms, MAX_TIMEOUT_MS);
    in_range("bot.autocomplete_timeout_ms", config.bot.autocomplete_timeout_ms, u64::MAX);
    in_range("bot.max_dice", config.bot.max_dice, u64::MAX);
    in_range("gateway.min_shards", u64::from(config.gateway.min_shards), u64::MAX);
    in_range(
        "gateway.ready_timeout_secs",
        config.gateway.ready_timeout_secs,
        MAX_TIMEOUT_MS / 1000,
    );
    in_range("storage.op_timeout_ms", config.storage.op_timeout_ms, MAX_TIMEOUT_MS);
    in_range("cache.capacity", config.cache.capacity as u64, u64::MAX);
    in_range("cache.ttl_secs", config.cache.ttl_secs, MAX_HOURS * 3600);
    in_range("history.max_history", config.history.max_history as u64, MAX_ENTRIES);
    in_range("history.recent_window_hours", config.history.recent_window_hours, MAX_HOURS);
    in_range("history.history_ttl_hours", config.history.history_ttl_hours, MAX_HOURS);
    in_range("history.data_ttl_hours", config.history.data_ttl_hours, MAX_HOURS);
    in_range("history.max_expressions", config.history.max_expressions as u64, MAX_ENTRIES);

    if config.bot.autocomplete_timeout_ms >= PLATFORM_INTERACTION_TIMEOUT_MS {
        errors.push(ConfigError::validation(
            "bot.autocomplete_timeout_ms",
            format!(
                "must be below the platform's {PLATFORM_INTERACTION_TIMEOUT_MS} ms interaction limit, got {}",
                config.bot.autocomplete_timeout_ms
            ),
        ));
    }

    if !LOG_LEVELS.contains(&config.bot.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::validation(
            "bot.log_level",
            format!(
                "`{}` is not one of {}",
                config.bot.log_level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    for (i, owner) in config.bot.owners.iter().enumerate() {
        if owner.trim().is_empty() {
            errors.push(ConfigError::validation(
                &format!("bot.owners[{i}]"),
                "must not be empty",
            ));
        }
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "storage.database_path",
            "must not be empty when storage.backend is \"sqlite\"",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
