// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Roll history and saved expressions for Rollbot.
//!
//! [`RollInput`] is the value type shared by history, saved expressions and
//! suggestions. [`RollStore`] owns every per-user key in the durable store
//! and fronts reads with a [`ReadThroughCache`].

pub mod cache;
pub mod clock;
pub mod keys;
pub mod roll;
pub mod store;
pub mod transfer;

pub use cache::ReadThroughCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use roll::{MAX_CHOICE_CHARS, MAX_EXPRESSION_CHARS, MAX_TAG_CHARS, RollInput};
pub use store::{RollStore, UsageStats};
pub use transfer::{EXPORT_CONTENT_TYPE, EXPORT_FILE_NAME};
