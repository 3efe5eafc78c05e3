// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shard connection management for Rollbot.
//!
//! [`ShardManager`] opens every shard through a bounded worker pool sized to
//! the platform's identify concurrency, waits for the gateway to report the
//! bot's identity, and restarts individual shards on request. [`Membership`]
//! tracks which guilds each shard serves.

pub mod manager;
pub mod membership;
pub mod shard;

pub use manager::{ShardManager, StartupReport};
pub use membership::{Membership, guild_key};
pub use shard::{Shard, ShardState};
