// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One behavioural suite, run against every store backend.

use std::sync::Arc;
use std::time::Duration;

use rollbot_config::model::StorageConfig;
use rollbot_core::{Command, KeyValueStore, Reply};
use rollbot_storage::{MemoryStore, SqliteStore};
use tempfile::TempDir;

async fn sqlite() -> (Arc<dyn KeyValueStore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        database_path: dir.path().join("kv.db").to_string_lossy().into_owned(),
        ..StorageConfig::default()
    };
    (Arc::new(SqliteStore::open(config).await.unwrap()), dir)
}

fn memory() -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::new())
}

/// Runs `$body` once per backend with `$store` bound to it.
macro_rules! conformance {
    ($name:ident, |$store:ident| $body:block) => {
        mod $name {
            use super::*;

            #[tokio::test]
            async fn memory_backend() {
                let $store = memory();
                $body
            }

            #[tokio::test]
            async fn sqlite_backend() {
                let ($store, _dir) = sqlite().await;
                $body
            }
        }
    };
}

fn zadd(key: &str, score: f64, member: &str) -> Command {
    Command::ZAdd {
        key: key.into(),
        score,
        member: member.into(),
    }
}

fn zrevrange_all(key: &str) -> Command {
    Command::ZRevRange {
        key: key.into(),
        start: 0,
        stop: -1,
    }
}

async fn list(store: &Arc<dyn KeyValueStore>, command: Command) -> Vec<String> {
    store.run(command).await.unwrap().into_list().unwrap()
}

conformance!(strings_get_set_incr, |store| {
    assert_eq!(
        store.run(Command::Get { key: "s".into() }).await.unwrap(),
        Reply::Nil
    );
    store
        .run(Command::Set {
            key: "s".into(),
            value: "hello".into(),
            ttl: None,
        })
        .await
        .unwrap();
    assert_eq!(
        store.run(Command::Get { key: "s".into() }).await.unwrap(),
        Reply::Value("hello".into())
    );

    let replies = store
        .execute(vec![
            Command::Incr { key: "rolls:total".into() },
            Command::Incr { key: "rolls:total".into() },
        ])
        .await
        .unwrap();
    assert_eq!(replies, vec![Reply::Int(1), Reply::Int(2)]);
    assert!(store.run(Command::Incr { key: "s".into() }).await.is_err());
});

conformance!(sorted_set_ranges, |store| {
    store
        .execute(vec![
            zadd("recent:1", 1.0, "1d20"),
            zadd("recent:1", 2.0, "2d6+3"),
            zadd("recent:1", 3.0, "4d6"),
        ])
        .await
        .unwrap();
    assert_eq!(list(&store, zrevrange_all("recent:1")).await, vec!["4d6", "2d6+3", "1d20"]);
    assert_eq!(
        list(
            &store,
            Command::ZRevRange {
                key: "recent:1".into(),
                start: 0,
                stop: 1
            }
        )
        .await,
        vec!["4d6", "2d6+3"]
    );

    // Re-adding an existing member moves it instead of duplicating it.
    let added = store.run(zadd("recent:1", 4.0, "1d20")).await.unwrap();
    assert_eq!(added, Reply::Bool(false));
    assert_eq!(list(&store, zrevrange_all("recent:1")).await, vec!["1d20", "4d6", "2d6+3"]);
    assert_eq!(
        store.run(Command::ZCard { key: "recent:1".into() }).await.unwrap(),
        Reply::Int(3)
    );
});

conformance!(sorted_set_trims, |store| {
    let adds = (1..=5).map(|i| zadd("z", f64::from(i), &format!("m{i}"))).collect();
    store.execute(adds).await.unwrap();

    // Keep the newest three.
    let removed = store
        .run(Command::ZRemRangeByRank {
            key: "z".into(),
            start: 0,
            stop: -4,
        })
        .await
        .unwrap();
    assert_eq!(removed, Reply::Int(2));
    assert_eq!(list(&store, zrevrange_all("z")).await, vec!["m5", "m4", "m3"]);

    let removed = store
        .run(Command::ZRemRangeByScore {
            key: "z".into(),
            min: f64::NEG_INFINITY,
            max: 4.0,
        })
        .await
        .unwrap();
    assert_eq!(removed, Reply::Int(2));
    assert_eq!(list(&store, zrevrange_all("z")).await, vec!["m5"]);

    // Emptying a collection removes the key.
    store
        .run(Command::ZRemRangeByRank {
            key: "z".into(),
            start: 0,
            stop: -1,
        })
        .await
        .unwrap();
    assert!(store.scan_prefix("z").await.unwrap().is_empty());
});

conformance!(hashes, |store| {
    let hset = |field: &str, value: &str| Command::HSet {
        key: "saved:1".into(),
        field: field.into(),
        value: value.into(),
    };
    let replies = store
        .execute(vec![hset("b", "2"), hset("a", "1"), hset("b", "3")])
        .await
        .unwrap();
    assert_eq!(replies, vec![Reply::Bool(true), Reply::Bool(true), Reply::Bool(false)]);

    assert_eq!(
        store.run(Command::HGetAll { key: "saved:1".into() }).await.unwrap(),
        Reply::Map(vec![("a".into(), "1".into()), ("b".into(), "3".into())])
    );
    assert_eq!(
        store
            .run(Command::HGet {
                key: "saved:1".into(),
                field: "missing".into()
            })
            .await
            .unwrap(),
        Reply::Nil
    );

    let hdel = |field: &str| Command::HDel {
        key: "saved:1".into(),
        field: field.into(),
    };
    assert_eq!(store.run(hdel("missing")).await.unwrap(), Reply::Bool(false));
    assert_eq!(store.run(hdel("a")).await.unwrap(), Reply::Bool(true));
    assert_eq!(
        store.run(Command::HLen { key: "saved:1".into() }).await.unwrap(),
        Reply::Int(1)
    );
});

conformance!(bounded_hash_set, |store| {
    let hset = |field: &str, value: &str| Command::HSetBounded {
        key: "saved:2".into(),
        field: field.into(),
        value: value.into(),
        max_len: 2,
    };
    let replies = store
        .execute(vec![hset("a", "1"), hset("b", "2"), hset("c", "3"), hset("b", "4")])
        .await
        .unwrap();
    // A full hash refuses new fields but still accepts overwrites.
    assert_eq!(
        replies,
        vec![Reply::Bool(true), Reply::Bool(true), Reply::Nil, Reply::Bool(false)]
    );
    assert_eq!(
        store.run(Command::HGetAll { key: "saved:2".into() }).await.unwrap(),
        Reply::Map(vec![("a".into(), "1".into()), ("b".into(), "4".into())])
    );

    // A zero limit never creates the key.
    let refused = store
        .run(Command::HSetBounded {
            key: "saved:3".into(),
            field: "a".into(),
            value: "1".into(),
            max_len: 0,
        })
        .await
        .unwrap();
    assert_eq!(refused, Reply::Nil);
    assert!(store.scan_prefix("saved:3").await.unwrap().is_empty());
});

conformance!(sets, |store| {
    let sadd = |member: &str| Command::SAdd {
        key: "shard:0:guilds".into(),
        member: member.into(),
    };
    let replies = store
        .execute(vec![sadd("g2"), sadd("g1"), sadd("g2")])
        .await
        .unwrap();
    assert_eq!(replies, vec![Reply::Bool(true), Reply::Bool(true), Reply::Bool(false)]);
    assert_eq!(
        list(&store, Command::SMembers { key: "shard:0:guilds".into() }).await,
        vec!["g1", "g2"]
    );
    assert_eq!(
        store
            .run(Command::SIsMember {
                key: "shard:0:guilds".into(),
                member: "g1".into()
            })
            .await
            .unwrap(),
        Reply::Bool(true)
    );
    assert_eq!(
        store
            .run(Command::SRem {
                key: "shard:0:guilds".into(),
                member: "g1".into()
            })
            .await
            .unwrap(),
        Reply::Bool(true)
    );
    assert_eq!(
        store.run(Command::SCard { key: "shard:0:guilds".into() }).await.unwrap(),
        Reply::Int(1)
    );
});

conformance!(del_and_expire, |store| {
    store
        .execute(vec![
            zadd("recent:1", 1.0, "1d20"),
            Command::SAdd {
                key: "pref:1".into(),
                member: "no-autocomplete".into(),
            },
        ])
        .await
        .unwrap();

    assert_eq!(
        store
            .run(Command::Expire {
                key: "missing".into(),
                ttl: Duration::from_secs(60)
            })
            .await
            .unwrap(),
        Reply::Bool(false)
    );
    assert_eq!(
        store
            .run(Command::Expire {
                key: "recent:1".into(),
                ttl: Duration::from_secs(60)
            })
            .await
            .unwrap(),
        Reply::Bool(true)
    );

    let removed = store
        .run(Command::Del {
            keys: vec!["recent:1".into(), "pref:1".into(), "missing".into()],
        })
        .await
        .unwrap();
    assert_eq!(removed, Reply::Int(2));
    assert!(list(&store, zrevrange_all("recent:1")).await.is_empty());
});

conformance!(failed_batch_applies_nothing, |store| {
    store
        .run(Command::Set {
            key: "str".into(),
            value: "x".into(),
            ttl: None,
        })
        .await
        .unwrap();

    let result = store
        .execute(vec![
            zadd("recent:1", 1.0, "1d20"),
            Command::Del { keys: vec!["str".into()] },
            // `str` holds a string again, so the HSet below fails.
            Command::Set {
                key: "str".into(),
                value: "y".into(),
                ttl: None,
            },
            Command::HSet {
                key: "str".into(),
                field: "f".into(),
                value: "v".into(),
            },
        ])
        .await;
    assert!(result.is_err());

    assert!(list(&store, zrevrange_all("recent:1")).await.is_empty());
    assert_eq!(
        store.run(Command::Get { key: "str".into() }).await.unwrap(),
        Reply::Value("x".into())
    );
});

conformance!(scan_prefix_lists_live_keys, |store| {
    store
        .execute(vec![
            Command::SAdd {
                key: "shard:1:guilds".into(),
                member: "g".into(),
            },
            Command::SAdd {
                key: "shard:0:guilds".into(),
                member: "g".into(),
            },
            Command::Set {
                key: "rolls:total".into(),
                value: "3".into(),
                ttl: None,
            },
        ])
        .await
        .unwrap();
    assert_eq!(
        store.scan_prefix("shard:").await.unwrap(),
        vec!["shard:0:guilds", "shard:1:guilds"]
    );
});
