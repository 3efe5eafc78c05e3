// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod gateway;
pub mod store;

pub use adapter::PluginAdapter;
pub use gateway::GatewayClient;
pub use store::{Command, KeyValueStore, Reply, rank_bounds};
