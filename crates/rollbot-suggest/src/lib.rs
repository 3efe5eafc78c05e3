// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Suggestion ranking for Rollbot autocomplete.
//!
//! Everything here is pure: callers fetch recents and saved expressions from
//! the store and pass them in, most recent first.

pub mod rank;
pub mod shapes;

pub use rank::{fold, rank};
pub use shapes::{
    MAX_SUGGESTIONS, RECENT_HEAD, finalize, literal, suggest_labels, suggest_names,
    suggest_removals, suggest_rolls,
};
