// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Rollbot configuration system.

use std::time::Duration;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use rollbot_config::diagnostic::ConfigError;
use rollbot_config::{
    RollbotConfig, StorageBackend, load_and_validate_path, load_and_validate_str,
    load_config_from_str,
};

#[test]
fn valid_toml_deserializes_into_rollbot_config() {
    let toml = r#"
[bot]
name = "dicebot"
log_level = "debug"
owners = ["1001", "1002"]
request_timeout_ms = 4000
autocomplete_timeout_ms = 1500
max_dice = 500

[gateway]
token = "abc.def"
min_shards = 4
ready_timeout_secs = 20

[storage]
backend = "memory"
database_path = "/tmp/rollbot.db"
wal_mode = false
op_timeout_ms = 750

[cache]
capacity = 10
ttl_secs = 60

[history]
max_history = 10
recent_window_hours = 24
history_ttl_hours = 48
data_ttl_hours = 720
max_expressions = 20
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.bot.name, "dicebot");
    assert_eq!(config.bot.owners, vec!["1001", "1002"]);
    assert_eq!(config.bot.request_timeout(), Duration::from_secs(4));
    assert_eq!(config.bot.autocomplete_timeout(), Duration::from_millis(1500));
    assert_eq!(config.bot.max_dice, 500);
    assert_eq!(config.gateway.token.as_deref(), Some("abc.def"));
    assert_eq!(config.gateway.min_shards, 4);
    assert_eq!(config.gateway.ready_timeout(), Duration::from_secs(20));
    assert_eq!(config.storage.backend, StorageBackend::Memory);
    assert!(!config.storage.wal_mode);
    assert_eq!(config.storage.op_timeout(), Duration::from_millis(750));
    assert_eq!(config.cache.capacity, 10);
    assert_eq!(config.cache.ttl(), Duration::from_secs(60));
    assert_eq!(config.history.max_history, 10);
    assert_eq!(config.history.recent_window(), Duration::from_secs(24 * 3600));
    assert_eq!(config.history.max_expressions, 20);
}

#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML is valid");

    assert_eq!(config.bot.name, "rollbot");
    assert_eq!(config.bot.log_level, "info");
    assert!(config.bot.owners.is_empty());
    assert_eq!(config.bot.request_timeout_ms, 5_000);
    assert_eq!(config.bot.autocomplete_timeout_ms, 2_000);
    assert_eq!(config.bot.max_dice, 1_000);
    assert!(config.gateway.token.is_none());
    assert_eq!(config.gateway.min_shards, 2);
    assert_eq!(config.gateway.ready_timeout_secs, 10);
    assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    assert!(config.storage.database_path.ends_with("rollbot.db"));
    assert!(config.storage.wal_mode);
    assert_eq!(config.storage.op_timeout_ms, 2_000);
    assert_eq!(config.cache.capacity, 1_000);
    assert_eq!(config.cache.ttl_secs, 1_800);
    assert_eq!(config.history.max_history, 25);
    assert_eq!(config.history.recent_window_hours, 168);
    assert_eq!(config.history.history_ttl_hours, 336);
    assert_eq!(config.history.data_ttl_hours, 2_232);
    assert_eq!(config.history.max_expressions, 50);
}

#[test]
fn env_style_override_wins_over_toml() {
    let config: RollbotConfig = Figment::new()
        .merge(Serialized::defaults(RollbotConfig::default()))
        .merge(Toml::string("[history]\nmax_history = 10\n"))
        .merge(("history.max_history", 3))
        .extract()
        .expect("should merge override");

    assert_eq!(config.history.max_history, 3);
}

#[test]
fn missing_config_files_silently_skipped() {
    let config: RollbotConfig = Figment::new()
        .merge(Serialized::defaults(RollbotConfig::default()))
        .merge(Toml::file("/nonexistent/path/rollbot.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.bot.name, "rollbot");
}

#[test]
fn unknown_key_suggests_correction() {
    let errors = load_and_validate_str("[history]\nmax_histroy = 3\n").unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            valid_keys,
            ..
        } => {
            assert_eq!(key, "max_histroy");
            assert_eq!(suggestion.as_deref(), Some("max_history"));
            assert!(valid_keys.contains("max_expressions"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let errors = load_and_validate_str("[telegram]\nbot_token = \"x\"\n").unwrap_err();
    assert!(matches!(&errors[0], ConfigError::UnknownKey { key, .. } if key == "telegram"));
}

#[test]
fn invalid_type_is_reported_with_path() {
    let errors = load_and_validate_str("[cache]\ncapacity = \"lots\"\n").unwrap_err();
    assert!(
        matches!(&errors[0], ConfigError::InvalidType { key, .. } if key == "cache.capacity"),
        "got {errors:?}"
    );
}

#[test]
fn unknown_backend_is_reported() {
    let errors = load_and_validate_str("[storage]\nbackend = \"redis\"\n").unwrap_err();
    match &errors[0] {
        ConfigError::UnknownVariant {
            value, expected, ..
        } => {
            assert_eq!(value, "redis");
            assert!(expected.contains("sqlite"));
            assert!(expected.contains("memory"));
        }
        other => panic!("expected UnknownVariant, got {other:?}"),
    }
}

#[test]
fn semantic_errors_surface_after_parse() {
    let errors = load_and_validate_str("[bot]\nautocomplete_timeout_ms = 5000\n").unwrap_err();
    assert!(matches!(
        &errors[0],
        ConfigError::Validation { key, .. } if key == "bot.autocomplete_timeout_ms"
    ));
}

#[test]
fn explicit_path_is_loaded_and_validated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollbot.toml");
    std::fs::write(&path, "[gateway]\nmin_shards = 3\n").unwrap();

    let config = load_and_validate_path(&path).expect("file should load");
    assert_eq!(config.gateway.min_shards, 3);
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let errors = load_and_validate_str("[cache]\ncapasity = 5\n").unwrap_err();
    let mut buf = String::new();
    let diagnostic: &dyn Diagnostic = &errors[0];
    GraphicalReportHandler::new()
        .render_report(&mut buf, diagnostic)
        .expect("should render");
    assert!(buf.contains("capasity"));
    assert!(buf.contains("capacity"));
}
