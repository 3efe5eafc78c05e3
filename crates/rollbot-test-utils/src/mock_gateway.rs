// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock gateway client for deterministic testing.
//!
//! `MockGateway` implements `GatewayClient` with a configurable shard plan,
//! injectable inbound events, and captured responses and shard calls for
//! assertion in tests.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use rollbot_core::{
    AdapterType, BotUser, EventId, GatewayClient, HealthStatus, PluginAdapter, Response,
    RollbotError, ShardEvent, ShardId, ShardInfo, ShardPlan, UserId,
};

/// A shard lifecycle call seen by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayCall {
    Open(ShardId),
    Close(ShardId),
}

/// A response captured from `respond()`.
#[derive(Debug, Clone, PartialEq)]
pub struct SentResponse {
    pub shard: ShardId,
    pub event: EventId,
    pub response: Response,
}

/// A mock platform gateway for testing.
///
/// Provides two queues:
/// - **inbound**: Events injected via `inject()` are returned by `receive()`
/// - **sent**: Responses passed to `respond()` are captured and retrievable via `responses()`
pub struct MockGateway {
    plan: ShardPlan,
    open_delay: Duration,
    failing: HashSet<ShardId>,
    ready_after: usize,
    user_polls: AtomicUsize,
    opening: AtomicUsize,
    peak_opening: AtomicUsize,
    calls: Mutex<Vec<GatewayCall>>,
    inbound: Mutex<VecDeque<ShardEvent>>,
    finished: AtomicBool,
    notify: Notify,
    sent: Mutex<Vec<SentResponse>>,
    sent_notify: Notify,
}

impl MockGateway {
    /// A single shard that opens instantly and is ready on the first poll.
    pub fn new() -> Self {
        Self::with_plan(ShardPlan {
            shards: 1,
            max_concurrency: 1,
        })
    }

    pub fn with_plan(plan: ShardPlan) -> Self {
        Self {
            plan,
            open_delay: Duration::ZERO,
            failing: HashSet::new(),
            ready_after: 0,
            user_polls: AtomicUsize::new(0),
            opening: AtomicUsize::new(0),
            peak_opening: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            inbound: Mutex::new(VecDeque::new()),
            finished: AtomicBool::new(false),
            notify: Notify::new(),
            sent: Mutex::new(Vec::new()),
            sent_notify: Notify::new(),
        }
    }

    pub fn plan(&self) -> ShardPlan {
        self.plan
    }

    /// Every `open()` takes this long before returning.
    pub fn open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// `open()` fails for these shards.
    pub fn failing_shards(mut self, shards: impl IntoIterator<Item = ShardId>) -> Self {
        self.failing.extend(shards);
        self
    }

    /// `current_user()` answers `None` for the first `polls` calls.
    pub fn ready_after(mut self, polls: usize) -> Self {
        self.ready_after = polls;
        self
    }

    /// `current_user()` never answers.
    pub fn never_ready(self) -> Self {
        self.ready_after(usize::MAX)
    }

    /// Inject an inbound event into the receive queue.
    pub async fn inject(&self, event: ShardEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Once the queue drains, `receive()` reports the end of the stream.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// All shard lifecycle calls, in order.
    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().await.clone()
    }

    /// Number of `open()` calls for one shard.
    pub async fn open_count(&self, shard: ShardId) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| **c == GatewayCall::Open(shard))
            .count()
    }

    /// Highest number of `open()` calls that were in progress at once.
    pub fn peak_concurrent_opens(&self) -> usize {
        self.peak_opening.load(Ordering::SeqCst)
    }

    /// Get all responses that were sent through `respond()`.
    pub async fn responses(&self) -> Vec<SentResponse> {
        self.sent.lock().await.clone()
    }

    /// Waits until at least `count` responses were sent, or `timeout` passes.
    pub async fn wait_for_responses(&self, count: usize, timeout: Duration) -> Vec<SentResponse> {
        let wait = async {
            loop {
                let notified = self.sent_notify.notified();
                {
                    let sent = self.sent.lock().await;
                    if sent.len() >= count {
                        return sent.clone();
                    }
                }
                notified.await;
            }
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(sent) => sent,
            Err(_) => self.responses().await,
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGateway {
    fn name(&self) -> &str {
        "mock-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, RollbotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RollbotError> {
        Ok(())
    }
}

#[async_trait]
impl GatewayClient for MockGateway {
    async fn shard_plan(&self) -> Result<ShardPlan, RollbotError> {
        Ok(self.plan)
    }

    async fn open(&self, shard: ShardInfo) -> Result<(), RollbotError> {
        self.calls.lock().await.push(GatewayCall::Open(shard.id));
        let now = self.opening.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_opening.fetch_max(now, Ordering::SeqCst);
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        self.opening.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&shard.id) {
            return Err(RollbotError::gateway(format!("shard {} refused", shard.id)));
        }
        Ok(())
    }

    async fn close(&self, shard: ShardInfo) -> Result<(), RollbotError> {
        self.calls.lock().await.push(GatewayCall::Close(shard.id));
        Ok(())
    }

    async fn current_user(&self, _shard: ShardInfo) -> Result<Option<BotUser>, RollbotError> {
        let polls = self.user_polls.fetch_add(1, Ordering::SeqCst);
        if polls < self.ready_after {
            return Ok(None);
        }
        Ok(Some(BotUser {
            id: UserId("bot".to_string()),
            name: "Rollbot".to_string(),
        }))
    }

    async fn receive(&self) -> Result<Option<ShardEvent>, RollbotError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(Some(event));
                }
                if self.finished.load(Ordering::SeqCst) {
                    return Ok(None);
                }
            }
            // Wait for notification that a new event was injected
            self.notify.notified().await;
        }
    }

    async fn respond(
        &self,
        shard: ShardId,
        event: &EventId,
        response: Response,
    ) -> Result<(), RollbotError> {
        self.sent.lock().await.push(SentResponse {
            shard,
            event: event.clone(),
            response,
        });
        self.sent_notify.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollbot_core::{EventKind, InboundEvent};

    fn event(id: &str) -> ShardEvent {
        ShardEvent {
            shard: ShardId(0),
            event: InboundEvent {
                id: EventId(id.to_string()),
                user: UserId("u".to_string()),
                kind: EventKind::Ready,
            },
        }
    }

    #[tokio::test]
    async fn inject_and_receive() {
        let gateway = MockGateway::new();
        gateway.inject(event("e1")).await;
        let received = gateway.receive().await.unwrap().unwrap();
        assert_eq!(received.event.id, EventId("e1".into()));
    }

    #[tokio::test]
    async fn finish_ends_stream_after_queue_drains() {
        let gateway = MockGateway::new();
        gateway.inject(event("e1")).await;
        gateway.finish();
        assert!(gateway.receive().await.unwrap().is_some());
        assert!(gateway.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failing_shard_records_call_and_errors() {
        let gateway = MockGateway::new().failing_shards([ShardId(0)]);
        let info = ShardInfo {
            id: ShardId(0),
            total: 1,
        };
        assert!(gateway.open(info).await.is_err());
        assert_eq!(gateway.calls().await, vec![GatewayCall::Open(ShardId(0))]);
    }

    #[tokio::test]
    async fn ready_after_polls() {
        let gateway = MockGateway::new().ready_after(2);
        let info = ShardInfo {
            id: ShardId(0),
            total: 1,
        };
        assert!(gateway.current_user(info).await.unwrap().is_none());
        assert!(gateway.current_user(info).await.unwrap().is_none());
        assert!(gateway.current_user(info).await.unwrap().is_some());
    }
}
