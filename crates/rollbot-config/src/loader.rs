// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./rollbot.toml` > `~/.config/rollbot/rollbot.toml` > `/etc/rollbot/rollbot.toml`
//! with environment variable overrides via `ROLLBOT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RollbotConfig;

/// Config sections that environment variables can address.
const SECTIONS: &[&str] = &["bot", "gateway", "storage", "cache", "history"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/rollbot/rollbot.toml` (system-wide)
/// 3. `~/.config/rollbot/rollbot.toml` (user XDG config)
/// 4. `./rollbot.toml` (local directory)
/// 5. `ROLLBOT_*` environment variables
pub fn load_config() -> Result<RollbotConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
pub fn load_config_from_str(toml_content: &str) -> Result<RollbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RollbotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RollbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RollbotConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RollbotConfig::default()))
        .merge(Toml::file("/etc/rollbot/rollbot.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("rollbot/rollbot.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("rollbot.toml"))
        .merge(env_provider())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config path.
///
/// Only the first `<section>_` is turned into a dot, so
/// `history_max_history` becomes `history.max_history`, not
/// `history.max.history`.
pub fn env_key_path(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("ROLLBOT_").map(|key| env_key_path(key.as_str()).into())
}
