// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RollStore behaviour against the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rollbot_config::RollbotConfig;
use rollbot_core::{
    AdapterType, Command, Deadline, HealthStatus, KeyValueStore, PluginAdapter, Preference, Reply,
    RollbotError, UserId,
};
use rollbot_history::{ManualClock, RollInput, RollStore};
use rollbot_storage::MemoryStore;

const START: i64 = 1_700_000_000_000;

struct Fixture {
    rolls: RollStore,
    clock: Arc<ManualClock>,
    backend: Arc<MemoryStore>,
}

fn fixture(configure: impl FnOnce(&mut RollbotConfig)) -> Fixture {
    let mut config = RollbotConfig::default();
    configure(&mut config);
    let backend = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(START));
    let rolls = RollStore::new(backend.clone(), &config).with_clock(clock.clone());
    Fixture {
        rolls,
        clock,
        backend,
    }
}

fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(5))
}

fn user() -> UserId {
    UserId::from("1001")
}

fn named(expression: &str, name: &str) -> RollInput {
    RollInput::new(expression, None, Some(name.to_string()))
}

fn expressions(rolls: &[RollInput]) -> Vec<&str> {
    rolls.iter().map(|r| r.expression.as_str()).collect()
}

async fn roll(f: &Fixture, expression: &str) {
    assert!(
        f.rolls
            .record_roll(&user(), &RollInput::plain(expression), deadline())
            .await
            .unwrap()
    );
    f.clock.advance(Duration::from_secs(1));
}

#[tokio::test]
async fn recent_rolls_are_most_recent_first() {
    let f = fixture(|_| {});
    roll(&f, "1d20").await;
    roll(&f, "2d6+3").await;

    let recent = f.rolls.recent_rolls(&user(), deadline()).await.unwrap();
    assert_eq!(expressions(&recent), ["2d6+3", "1d20"]);
}

#[tokio::test]
async fn rerolling_moves_an_entry_to_the_front() {
    let f = fixture(|_| {});
    roll(&f, "1d20").await;
    roll(&f, "1d8").await;
    roll(&f, "1d20").await;

    let recent = f.rolls.recent_rolls(&user(), deadline()).await.unwrap();
    assert_eq!(expressions(&recent), ["1d20", "1d8"]);
}

#[tokio::test]
async fn history_is_bounded_by_count() {
    let f = fixture(|c| c.history.max_history = 3);
    for n in 1..=10 {
        roll(&f, &format!("{n}d6")).await;
        let recent = f.rolls.recent_rolls(&user(), deadline()).await.unwrap();
        assert!(recent.len() <= 3);
    }
    let recent = f.rolls.recent_rolls(&user(), deadline()).await.unwrap();
    assert_eq!(expressions(&recent), ["10d6", "9d6", "8d6"]);
}

#[tokio::test]
async fn history_is_bounded_by_age() {
    let f = fixture(|c| c.history.recent_window_hours = 1);
    roll(&f, "1d4").await;
    roll(&f, "1d6").await;

    f.clock.advance(Duration::from_secs(60 * 60));
    roll(&f, "1d8").await;

    let recent = f.rolls.recent_rolls(&user(), deadline()).await.unwrap();
    assert_eq!(expressions(&recent), ["1d8"]);
}

#[tokio::test]
async fn oversized_rolls_are_not_recorded() {
    let f = fixture(|_| {});
    let long = RollInput::new("1".repeat(90), Some("l".repeat(30)), None);
    let recorded = f.rolls.record_roll(&user(), &long, deadline()).await.unwrap();
    assert!(!recorded);
    assert!(f.rolls.recent_rolls(&user(), deadline()).await.unwrap().is_empty());
}

#[tokio::test]
async fn opting_out_clears_and_stops_history() {
    let f = fixture(|_| {});
    roll(&f, "1d20").await;
    // Warm the cache so the clear has to invalidate it.
    assert_eq!(f.rolls.recent_rolls(&user(), deadline()).await.unwrap().len(), 1);

    f.rolls
        .set_preference(&user(), Preference::NoRecentHistory, true, deadline())
        .await
        .unwrap();
    assert!(f.rolls.recent_rolls(&user(), deadline()).await.unwrap().is_empty());

    let recorded = f
        .rolls
        .record_roll(&user(), &RollInput::plain("1d4"), deadline())
        .await
        .unwrap();
    assert!(!recorded);

    f.rolls
        .set_preference(&user(), Preference::NoRecentHistory, false, deadline())
        .await
        .unwrap();
    roll(&f, "1d6").await;
    let recent = f.rolls.recent_rolls(&user(), deadline()).await.unwrap();
    assert_eq!(expressions(&recent), ["1d6"]);
}

#[tokio::test]
async fn preferences_are_set_membership() {
    let f = fixture(|_| {});
    let u = user();
    assert!(f.rolls.preferences(&u, deadline()).await.unwrap().is_empty());

    f.rolls
        .set_preference(&u, Preference::DetailedOutput, true, deadline())
        .await
        .unwrap();
    assert!(
        f.rolls
            .has_preference(&u, Preference::DetailedOutput, deadline())
            .await
            .unwrap()
    );

    f.rolls
        .set_preference(&u, Preference::DetailedOutput, false, deadline())
        .await
        .unwrap();
    assert!(f.rolls.preferences(&u, deadline()).await.unwrap().is_empty());
}

#[tokio::test]
async fn saving_by_name_overwrites() {
    let f = fixture(|_| {});
    f.rolls
        .save_expression(&user(), named("8d6", "Fireball"), deadline())
        .await
        .unwrap();
    f.rolls
        .save_expression(&user(), named("10d6", "Fireball"), deadline())
        .await
        .unwrap();

    let saved = f.rolls.saved_expressions(&user(), deadline()).await.unwrap();
    assert_eq!(saved, vec![named("10d6", "Fireball")]);
}

#[tokio::test]
async fn save_rejects_invalid_input() {
    let f = fixture(|_| {});
    let err = f
        .rolls
        .save_expression(&user(), named("1d4", &"n".repeat(40)), deadline())
        .await
        .unwrap_err();
    assert!(matches!(err, RollbotError::Validation(_)));
}

#[tokio::test]
async fn quota_blocks_new_ids_only() {
    let f = fixture(|c| c.history.max_expressions = 2);
    f.rolls
        .save_expression(&user(), named("1d4", "a"), deadline())
        .await
        .unwrap();
    f.rolls
        .save_expression(&user(), named("1d6", "b"), deadline())
        .await
        .unwrap();

    let err = f
        .rolls
        .save_expression(&user(), named("1d8", "c"), deadline())
        .await
        .unwrap_err();
    assert!(matches!(err, RollbotError::QuotaExceeded { limit: 2 }));

    // Overwriting an existing ID is still allowed at the limit.
    f.rolls
        .save_expression(&user(), named("2d6", "b"), deadline())
        .await
        .unwrap();

    let saved = f.rolls.saved_expressions(&user(), deadline()).await.unwrap();
    assert_eq!(saved, vec![named("1d4", "a"), named("2d6", "b")]);
}

#[tokio::test]
async fn unsave_missing_id_is_harmless() {
    let f = fixture(|_| {});
    f.rolls
        .save_expression(&user(), named("1d4", "a"), deadline())
        .await
        .unwrap();

    let removed = f.rolls.unsave_expression(&user(), "zzz", deadline()).await.unwrap();
    assert!(!removed);
    assert_eq!(f.rolls.saved_expressions(&user(), deadline()).await.unwrap().len(), 1);

    let removed = f.rolls.unsave_expression(&user(), "a", deadline()).await.unwrap();
    assert!(removed);
    assert!(f.rolls.saved_expressions(&user(), deadline()).await.unwrap().is_empty());
}

#[tokio::test]
async fn saved_and_history_are_independent() {
    let f = fixture(|_| {});
    roll(&f, "1d20").await;
    f.rolls
        .save_expression(&user(), RollInput::plain("1d20"), deadline())
        .await
        .unwrap();

    assert!(f.rolls.clear_saved(&user(), deadline()).await.unwrap());
    assert_eq!(f.rolls.recent_rolls(&user(), deadline()).await.unwrap().len(), 1);

    assert!(f.rolls.clear_history(&user(), deadline()).await.unwrap());
    assert!(!f.rolls.clear_history(&user(), deadline()).await.unwrap());
}

#[tokio::test]
async fn import_replaces_only_when_every_row_is_valid() {
    let f = fixture(|_| {});
    f.rolls
        .save_expression(&user(), named("1d4", "old"), deadline())
        .await
        .unwrap();

    let bad = format!("expression,name\n1d6,ok\n{},too-long\n", "d".repeat(200));
    assert!(f.rolls.import_saved(&user(), &bad, deadline()).await.is_err());
    let saved = f.rolls.saved_expressions(&user(), deadline()).await.unwrap();
    assert_eq!(saved, vec![named("1d4", "old")]);

    let good = "expression,name,label\n8d6,Fireball,fire\n1d20+5,,\n";
    let count = f.rolls.import_saved(&user(), good, deadline()).await.unwrap();
    assert_eq!(count, 2);
    let saved = f.rolls.saved_expressions(&user(), deadline()).await.unwrap();
    assert_eq!(expressions(&saved), ["1d20+5", "8d6"]);
}

#[tokio::test]
async fn import_over_quota_changes_nothing() {
    let f = fixture(|c| c.history.max_expressions = 1);
    let err = f
        .rolls
        .import_saved(&user(), "expression\n1d4\n1d6\n", deadline())
        .await
        .unwrap_err();
    assert!(err.is_user_facing());
    assert!(f.rolls.saved_expressions(&user(), deadline()).await.unwrap().is_empty());
}

#[tokio::test]
async fn export_round_trips_through_import() {
    let f = fixture(|_| {});
    f.rolls
        .save_expression(&user(), named("8d6", "Fireball"), deadline())
        .await
        .unwrap();
    let csv = f.rolls.export_saved(&user(), deadline()).await.unwrap();

    let other = UserId::from("2002");
    let data = String::from_utf8(csv).unwrap();
    f.rolls.import_saved(&other, &data, deadline()).await.unwrap();
    assert_eq!(
        f.rolls.saved_expressions(&other, deadline()).await.unwrap(),
        vec![named("8d6", "Fireball")]
    );
}

#[tokio::test]
async fn legacy_json_members_are_read() {
    let f = fixture(|_| {});
    f.backend
        .run(Command::ZAdd {
            key: "recent:1001".into(),
            score: START as f64,
            member: r#"{"e":"3d10","l":"necrotic dmg"}"#.into(),
        })
        .await
        .unwrap();

    let recent = f.rolls.recent_rolls(&user(), deadline()).await.unwrap();
    assert_eq!(recent[0].to_string(), "3d10, necrotic dmg");
}

#[tokio::test]
async fn usage_stats_count_rolls_and_saved() {
    let f = fixture(|_| {});
    let other = UserId::from("2002");
    f.rolls.increment_roll_count(&user(), deadline()).await.unwrap();
    let mine = f.rolls.increment_roll_count(&user(), deadline()).await.unwrap();
    f.rolls.increment_roll_count(&other, deadline()).await.unwrap();
    assert_eq!(mine, 2);

    f.rolls
        .save_expression(&user(), named("1d4", "a"), deadline())
        .await
        .unwrap();
    f.rolls
        .save_expression(&user(), named("1d6", "b"), deadline())
        .await
        .unwrap();
    f.rolls
        .save_expression(&other, named("1d8", "c"), deadline())
        .await
        .unwrap();

    let stats = f.rolls.usage_stats(deadline()).await.unwrap();
    assert_eq!(stats.total_rolls, 3);
    assert_eq!(stats.users_with_saved, 2);
    assert_eq!(stats.total_saved, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rolls_are_all_kept() {
    let f = Arc::new(fixture(|_| {}));
    let mut tasks = Vec::new();
    for n in 1..=8 {
        let f = f.clone();
        tasks.push(tokio::spawn(async move {
            f.clock.advance(Duration::from_millis(n));
            f.rolls
                .record_roll(&user(), &RollInput::plain(format!("{n}d6")), deadline())
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    let recent = f.rolls.recent_rolls(&user(), deadline()).await.unwrap();
    assert_eq!(recent.len(), 8);
}

/// A store whose calls never complete.
struct StalledStore;

#[async_trait]
impl PluginAdapter for StalledStore {
    fn name(&self) -> &str {
        "stalled"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 0, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, RollbotError> {
        Ok(HealthStatus::Unhealthy("stalled".into()))
    }

    async fn shutdown(&self) -> Result<(), RollbotError> {
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for StalledStore {
    async fn execute(&self, _commands: Vec<Command>) -> Result<Vec<Reply>, RollbotError> {
        std::future::pending().await
    }

    async fn scan_prefix(&self, _prefix: &str) -> Result<Vec<String>, RollbotError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out_within_the_request_deadline() {
    let rolls = RollStore::new(Arc::new(StalledStore), &RollbotConfig::default());
    let deadline = Deadline::after(Duration::from_millis(500));

    let started = tokio::time::Instant::now();
    let err = rolls.recent_rolls(&user(), deadline).await.unwrap_err();
    assert!(matches!(err, RollbotError::Timeout { .. }));
    assert!(started.elapsed() <= Duration::from_millis(500));

    // An expired deadline stops further calls outright.
    let err = rolls
        .save_expression(&user(), RollInput::plain("1d4"), deadline)
        .await
        .unwrap_err();
    assert!(matches!(err, RollbotError::Timeout { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_saves_never_pass_the_quota() {
    let f = Arc::new(fixture(|c| c.history.max_expressions = 3));
    let mut tasks = Vec::new();
    for n in 1..=10 {
        let f = f.clone();
        tasks.push(tokio::spawn(async move {
            f.rolls
                .save_expression(&user(), named("1d6", &format!("slot {n}")), deadline())
                .await
        }));
    }
    let mut saved = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => saved += 1,
            Err(e) => assert!(matches!(e, RollbotError::QuotaExceeded { limit: 3 }), "{e}"),
        }
    }
    assert_eq!(saved, 3);
    let stored = f.rolls.saved_expressions(&user(), deadline()).await.unwrap();
    assert_eq!(stored.len(), 3);
}

/// A memory store that takes `lag` to finish every batch that writes.
///
/// With `commit_first` the batch is applied before the lag, so it is
/// already durable while the caller is still waiting for the reply.
struct LaggingStore {
    inner: MemoryStore,
    lag: Duration,
    commit_first: bool,
}

fn is_read(command: &Command) -> bool {
    matches!(
        command,
        Command::Get { .. }
            | Command::ZRevRange { .. }
            | Command::ZCard { .. }
            | Command::HGet { .. }
            | Command::HGetAll { .. }
            | Command::HLen { .. }
            | Command::SIsMember { .. }
            | Command::SMembers { .. }
            | Command::SCard { .. }
    )
}

#[async_trait]
impl PluginAdapter for LaggingStore {
    fn name(&self) -> &str {
        "lagging"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 0, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, RollbotError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), RollbotError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl KeyValueStore for LaggingStore {
    async fn execute(&self, commands: Vec<Command>) -> Result<Vec<Reply>, RollbotError> {
        if commands.iter().all(is_read) {
            return self.inner.execute(commands).await;
        }
        if self.commit_first {
            let replies = self.inner.execute(commands).await;
            tokio::time::sleep(self.lag).await;
            replies
        } else {
            tokio::time::sleep(self.lag).await;
            self.inner.execute(commands).await
        }
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, RollbotError> {
        self.inner.scan_prefix(prefix).await
    }
}

fn lagging(commit_first: bool) -> RollStore {
    let store = LaggingStore {
        inner: MemoryStore::new(),
        lag: Duration::from_secs(3),
        commit_first,
    };
    RollStore::new(Arc::new(store), &RollbotConfig::default())
        .with_clock(Arc::new(ManualClock::new(START)))
}

#[tokio::test(start_paused = true)]
async fn abandoned_write_that_already_committed_is_visible() {
    let rolls = lagging(true);
    assert!(rolls.recent_rolls(&user(), deadline()).await.unwrap().is_empty());

    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        rolls.record_roll(&user(), &RollInput::plain("1d20"), deadline()),
    )
    .await;
    assert!(abandoned.is_err());

    let recent = rolls.recent_rolls(&user(), deadline()).await.unwrap();
    assert_eq!(expressions(&recent), vec!["1d20"]);
}

#[tokio::test(start_paused = true)]
async fn abandoned_write_that_commits_later_becomes_visible() {
    let rolls = lagging(false);
    assert!(rolls.recent_rolls(&user(), deadline()).await.unwrap().is_empty());

    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        rolls.record_roll(&user(), &RollInput::plain("1d20"), deadline()),
    )
    .await;
    assert!(abandoned.is_err());

    // Not applied yet; this read caches the old, empty history again.
    assert!(rolls.recent_rolls(&user(), deadline()).await.unwrap().is_empty());

    // Once the store has applied the batch, that cached value is dropped.
    tokio::time::sleep(Duration::from_secs(4)).await;
    let recent = rolls.recent_rolls(&user(), deadline()).await.unwrap();
    assert_eq!(expressions(&recent), vec!["1d20"]);
}

#[tokio::test(start_paused = true)]
async fn abandoned_preference_change_is_visible() {
    let rolls = lagging(true);
    assert!(rolls.preferences(&user(), deadline()).await.unwrap().is_empty());

    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        rolls.set_preference(&user(), Preference::DetailedOutput, true, deadline()),
    )
    .await;
    assert!(abandoned.is_err());

    let prefs = rolls.preferences(&user(), deadline()).await.unwrap();
    assert_eq!(prefs, vec![Preference::DetailedOutput]);
}
