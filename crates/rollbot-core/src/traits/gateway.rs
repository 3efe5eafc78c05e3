// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway client trait for the chat platform's sharded connection.

use async_trait::async_trait;

use crate::error::RollbotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{BotUser, EventId, Response, ShardEvent, ShardId, ShardInfo, ShardPlan};

/// Client for the platform gateway and its REST surface.
///
/// The wire protocol (identify, heartbeat, resume) lives behind this trait.
/// `open` and `close` act on exactly one shard and must be safe to call
/// from several tasks at once for different shards.
#[async_trait]
pub trait GatewayClient: PluginAdapter {
    /// Asks the platform how many shards to run and how many may identify at once.
    async fn shard_plan(&self) -> Result<ShardPlan, RollbotError>;

    /// Opens the connection for one shard. Returns once the shard is connected.
    async fn open(&self, shard: ShardInfo) -> Result<(), RollbotError>;

    /// Closes the connection for one shard.
    async fn close(&self, shard: ShardInfo) -> Result<(), RollbotError>;

    /// Resolves the bot's own account through the given shard.
    ///
    /// Returns `Ok(None)` while the shard has not yet received its ready payload.
    async fn current_user(&self, shard: ShardInfo) -> Result<Option<BotUser>, RollbotError>;

    /// Receives the next inbound event from any open shard.
    ///
    /// Returns `Ok(None)` once the event stream has ended.
    async fn receive(&self) -> Result<Option<ShardEvent>, RollbotError>;

    /// Sends the response for an inbound event back through its shard.
    async fn respond(
        &self,
        shard: ShardId,
        event: &EventId,
        response: Response,
    ) -> Result<(), RollbotError>;
}
