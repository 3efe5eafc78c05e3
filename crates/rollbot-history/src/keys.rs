// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store key names. These are persisted, so they must stay stable.

use rollbot_core::UserId;

/// Sorted set of recent rolls, scored by epoch milliseconds.
pub fn recent(user: &UserId) -> String {
    format!("recent:{user}")
}

/// Hash of saved expressions, keyed by roll ID.
pub fn saved(user: &UserId) -> String {
    format!("saved:{user}")
}

/// Set of enabled preference flags.
pub fn preferences(user: &UserId) -> String {
    format!("pref:{user}")
}

/// Prefix shared by every saved-expression key.
pub const SAVED_PREFIX: &str = "saved:";

/// Total successful rolls across all users.
pub const ROLLS_TOTAL: &str = "rolls:total";

/// Successful rolls by one user.
pub fn user_rolls(user: &UserId) -> String {
    format!("rolls:user:{user}:total")
}
