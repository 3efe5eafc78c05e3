// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions.
//!
//! Uses the metrics-rs facade so any installed recorder can collect these.

use metrics::{describe_counter, describe_histogram};

/// Register all Rollbot metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn describe_metrics() {
    describe_counter!("rollbot_store_ops_total", "Store commands executed, by backend and command");
    describe_counter!("rollbot_cache_hits_total", "Read-through cache hits");
    describe_counter!("rollbot_cache_misses_total", "Read-through cache misses");
    describe_histogram!("rollbot_shard_open_seconds", "Time taken to open one shard");
    describe_counter!("rollbot_shard_open_failures_total", "Shard open attempts that failed");
    describe_counter!("rollbot_events_total", "Inbound events handled, by kind");
    describe_histogram!(
        "rollbot_autocomplete_seconds",
        "Time taken to build autocomplete suggestions"
    );
    describe_counter!("rollbot_rolls_total", "Successfully evaluated rolls");
}

/// Record one handled event.
pub fn record_event(kind: &'static str) {
    metrics::counter!("rollbot_events_total", "kind" => kind).increment(1);
}
