// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete bot stack with a mock gateway, a mock
//! evaluator, and an in-memory store. Provides `send()` to drive one event
//! through the full dispatch pipeline in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rollbot_bot::{App, process_event};
use rollbot_config::RollbotConfig;
use rollbot_core::{
    EventId, EventKind, InboundEvent, KeyValueStore, Response, ShardEvent, ShardId, UserId,
};
use rollbot_history::{ManualClock, RollStore};
use rollbot_shard::{Membership, ShardManager};
use rollbot_storage::MemoryStore;

use crate::mock_evaluator::MockEvaluator;
use crate::mock_gateway::MockGateway;

/// The user id configured as a bot owner.
pub const OWNER: &str = "owner";

/// Wall-clock start of the harness's manual clock, in milliseconds.
pub const START_MILLIS: i64 = 1_700_000_000_000;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    gateway: MockGateway,
    evaluator: MockEvaluator,
    store: Option<Arc<dyn KeyValueStore>>,
    config: RollbotConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = RollbotConfig::default();
        config.bot.owners = vec![OWNER.to_string()];
        Self {
            gateway: MockGateway::new(),
            evaluator: MockEvaluator::new(),
            store: None,
            config,
        }
    }

    pub fn with_gateway(mut self, gateway: MockGateway) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_evaluator(mut self, evaluator: MockEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Use `store` instead of a fresh in-memory store.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Adjust the configuration before the stack is built.
    pub fn with_config(mut self, edit: impl FnOnce(&mut RollbotConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Build the test harness. Nothing is opened yet.
    pub fn build(self) -> TestHarness {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>);
        let clock = Arc::new(ManualClock::new(START_MILLIS));
        let rolls = RollStore::new(Arc::clone(&store), &self.config).with_clock(clock.clone());

        let gateway = Arc::new(self.gateway);
        let plan = gateway.plan();
        let shards = ShardManager::new(
            gateway.clone(),
            Membership::new(Arc::clone(&store)),
            plan,
            &self.config.gateway,
        );
        let evaluator = Arc::new(self.evaluator);

        let app = Arc::new(App {
            config: Arc::new(self.config),
            gateway: gateway.clone(),
            rolls: Arc::new(rolls),
            shards: Arc::new(shards),
            evaluator: evaluator.clone(),
        });

        TestHarness {
            app,
            gateway,
            evaluator,
            store,
            clock,
            next_id: AtomicU64::new(1),
        }
    }
}

/// A fully assembled bot stack for integration tests.
pub struct TestHarness {
    pub app: Arc<App>,
    pub gateway: Arc<MockGateway>,
    pub evaluator: Arc<MockEvaluator>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<ManualClock>,
    next_id: AtomicU64,
}

impl TestHarness {
    /// Create a builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Builds an event from `user` on shard 0 with a fresh id.
    pub fn event(&self, user: &str, kind: EventKind) -> ShardEvent {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        ShardEvent {
            shard: ShardId(0),
            event: InboundEvent {
                id: EventId(format!("event-{n}")),
                user: UserId(user.to_string()),
                kind,
            },
        }
    }

    /// Runs one event through the dispatch pipeline and returns its reply.
    pub async fn send(&self, user: &str, kind: EventKind) -> Option<Response> {
        process_event(Arc::clone(&self.app), self.event(user, kind)).await
    }

    /// Like [`send`](Self::send), but returns the text of a message reply.
    ///
    /// Panics if the reply is not a message.
    pub async fn send_text(&self, user: &str, kind: EventKind) -> String {
        match self.send(user, kind).await {
            Some(Response::Message { content, .. }) => content,
            other => panic!("expected a message reply, got {other:?}"),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
