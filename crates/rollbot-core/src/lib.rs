// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Rollbot.
//!
//! This crate provides the adapter trait definitions, the error taxonomy, and
//! the common types (ids, events, responses, deadlines) used throughout the
//! workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{RollbotError, TRY_AGAIN_LATER, UNEXPECTED_ERROR};
pub use types::{
    AdapterType, AutocompleteField, BotUser, Choice, Deadline, EventId, EventKind, GuildId,
    HealthStatus, InboundEvent, Preference, Response, ShardEvent, ShardId, ShardInfo, ShardPlan,
    UserId,
};

pub use traits::{Command, GatewayClient, KeyValueStore, PluginAdapter, Reply};
