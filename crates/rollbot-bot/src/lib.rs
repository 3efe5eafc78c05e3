// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event dispatch and request handling for Rollbot.
//!
//! The [`Dispatcher`] is the central coordinator that:
//! - Receives events from the gateway
//! - Runs each one on its own task under a deadline
//! - Routes it to the command handler for its kind
//! - Turns failures into friendly replies
//! - Drains in-flight requests on shutdown

pub mod context;
pub mod dispatch;
pub mod evaluator;
pub mod handlers;
pub mod metrics;
pub mod shutdown;
pub mod stats;

pub use context::{App, Request};
pub use dispatch::{Dispatcher, process_event, serve};
pub use evaluator::{EvalError, Evaluation, Evaluator, check_dice, dice_count};
pub use handlers::format_roll;
pub use metrics::describe_metrics;
pub use shutdown::install_signal_handler;
pub use stats::{ShardStats, StatsReport};
