// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the store, the shard manager, and request handlers.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Platform identifier of a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Platform identifier of a guild (server).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuildId(pub String);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of one inbound event (interaction or message).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index of a gateway shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardId(pub u32);

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a shard within the full shard set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShardInfo {
    pub id: ShardId,
    pub total: u32,
}

/// Sharding parameters recommended by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardPlan {
    /// Recommended number of shards.
    pub shards: u32,
    /// How many shards may be identifying at the same time.
    pub max_concurrency: u32,
}

/// The bot's own account, resolved once the gateway is usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotUser {
    pub id: UserId,
    pub name: String,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Store,
    Gateway,
}

/// A named boolean user flag. Presence in the user's preference set means "on".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Preference {
    #[strum(serialize = "no-recent-history")]
    NoRecentHistory,
    #[strum(serialize = "detailed-output-by-default")]
    DetailedOutput,
    #[strum(serialize = "no-autocomplete")]
    NoAutocomplete,
}

/// A point in time by which a request (and every store call it makes) must finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(tokio::time::Instant);

impl Deadline {
    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self(tokio::time::Instant::now() + timeout)
    }

    /// The underlying instant.
    pub fn instant(&self) -> tokio::time::Instant {
        self.0
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(tokio::time::Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Time budget for one sub-operation: the remaining time, capped at `cap`.
    pub fn budget(&self, cap: Duration) -> Duration {
        self.remaining().min(cap)
    }
}

/// An autocomplete option name paired with the value submitted when picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

impl Choice {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A choice whose shown name is also the submitted value.
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            name: text.clone(),
            value: text,
        }
    }
}

/// Which option of a command the user is typing into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum AutocompleteField {
    /// Expression to roll (recents + saved).
    Roll,
    /// Saved expression to remove.
    Unsave,
    /// Name for an expression being saved.
    SaveName,
    /// Label for a roll.
    Label,
}

/// The payload of an inbound platform event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Shard finished its handshake.
    Ready,
    /// The bot joined (or re-saw) a guild on this shard.
    GuildCreate { guild: GuildId },
    /// The bot left a guild, or the guild became unavailable.
    GuildDelete { guild: GuildId, unavailable: bool },
    /// Roll command: free-form input plus an optional explicit label.
    Roll { input: String, label: Option<String> },
    /// A plain chat message addressed to the bot.
    Message { content: String },
    /// The user is typing into an autocompleted option.
    Autocomplete {
        field: AutocompleteField,
        partial: String,
    },
    SaveExpression {
        expression: String,
        name: Option<String>,
        label: Option<String>,
    },
    UnsaveExpression { id: String },
    ExportSaved,
    ImportSaved { data: String },
    ClearHistory,
    ClearSaved,
    SetPreference { preference: Preference, enabled: bool },
    /// Administrative: close and reopen one shard.
    RestartShard { shard: ShardId },
    /// Administrative: usage statistics.
    Stats,
}

impl EventKind {
    /// Short name used in logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::GuildCreate { .. } => "guild_create",
            Self::GuildDelete { .. } => "guild_delete",
            Self::Roll { .. } => "roll",
            Self::Message { .. } => "message",
            Self::Autocomplete { .. } => "autocomplete",
            Self::SaveExpression { .. } => "save_expression",
            Self::UnsaveExpression { .. } => "unsave_expression",
            Self::ExportSaved => "export_saved",
            Self::ImportSaved { .. } => "import_saved",
            Self::ClearHistory => "clear_history",
            Self::ClearSaved => "clear_saved",
            Self::SetPreference { .. } => "set_preference",
            Self::RestartShard { .. } => "restart_shard",
            Self::Stats => "stats",
        }
    }
}

/// One inbound event, as delivered by a shard.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub id: EventId,
    pub user: UserId,
    pub kind: EventKind,
}

/// An inbound event tagged with the shard it arrived on.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardEvent {
    pub shard: ShardId,
    pub event: InboundEvent,
}

/// What the bot sends back for an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// A text reply. Ephemeral replies are only visible to the requester.
    Message { content: String, ephemeral: bool },
    /// Autocomplete choices.
    Choices(Vec<Choice>),
    /// A file attachment with a short caption.
    File {
        name: String,
        content_type: String,
        data: Vec<u8>,
        caption: String,
    },
}

impl Response {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
            ephemeral: true,
        }
    }

    pub fn public(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
            ephemeral: false,
        }
    }
}
