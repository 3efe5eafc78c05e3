// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application context and the per-request struct handed to handlers.

use std::sync::Arc;

use rollbot_config::RollbotConfig;
use rollbot_core::{Deadline, EventKind, GatewayClient, InboundEvent, ShardEvent, ShardId, UserId};
use rollbot_history::RollStore;
use rollbot_shard::ShardManager;

use crate::evaluator::Evaluator;

/// Everything a request handler may touch, built once at startup.
#[derive(Clone)]
pub struct App {
    pub config: Arc<RollbotConfig>,
    pub gateway: Arc<dyn GatewayClient>,
    pub rolls: Arc<RollStore>,
    pub shards: Arc<ShardManager>,
    pub evaluator: Arc<dyn Evaluator>,
}

impl App {
    /// Deadline for a new request of the given kind.
    pub fn deadline_for(&self, kind: &EventKind) -> Deadline {
        let timeout = match kind {
            EventKind::Autocomplete { .. } => self.config.bot.autocomplete_timeout(),
            _ => self.config.bot.request_timeout(),
        };
        Deadline::after(timeout)
    }
}

/// One inbound event with the shard it arrived on and its deadline.
#[derive(Debug, Clone)]
pub struct Request {
    pub shard: ShardId,
    pub event: InboundEvent,
    pub deadline: Deadline,
}

impl Request {
    pub fn new(event: ShardEvent, deadline: Deadline) -> Self {
        Self {
            shard: event.shard,
            event: event.event,
            deadline,
        }
    }

    pub fn user(&self) -> &UserId {
        &self.event.user
    }
}
