// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Rollbot integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without a live chat platform.
//!
//! # Components
//!
//! - [`MockGateway`] - Mock gateway with event injection and response capture
//! - [`MockEvaluator`] - Mock dice evaluator with pre-configured outcomes
//! - [`BrokenStore`] - Store that refuses or hangs on every call
//! - [`TestHarness`] - Full bot stack over an in-memory store

pub mod broken_store;
pub mod harness;
pub mod mock_evaluator;
pub mod mock_gateway;

pub use broken_store::{BrokenStore, Failure};
pub use harness::{OWNER, START_MILLIS, TestHarness, TestHarnessBuilder};
pub use mock_evaluator::{MockEvaluator, PANIC_EXPRESSION};
pub use mock_gateway::{GatewayCall, MockGateway, SentResponse};
