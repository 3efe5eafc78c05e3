// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A key-value store that is down, for testing degraded paths.

use async_trait::async_trait;

use rollbot_core::{
    AdapterType, Command, HealthStatus, KeyValueStore, PluginAdapter, Reply, RollbotError,
};

/// How a [`BrokenStore`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Every call fails immediately.
    Refuse,
    /// Every call hangs forever.
    Stall,
}

/// A store whose every call fails or hangs.
pub struct BrokenStore {
    failure: Failure,
}

impl BrokenStore {
    pub fn refusing() -> Self {
        Self {
            failure: Failure::Refuse,
        }
    }

    pub fn stalled() -> Self {
        Self {
            failure: Failure::Stall,
        }
    }

    async fn fail<T>(&self) -> Result<T, RollbotError> {
        match self.failure {
            Failure::Refuse => Err(RollbotError::storage(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "store unreachable",
            ))),
            Failure::Stall => std::future::pending().await,
        }
    }
}

#[async_trait]
impl PluginAdapter for BrokenStore {
    fn name(&self) -> &str {
        "broken-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, RollbotError> {
        Ok(HealthStatus::Unhealthy(format!("{:?}", self.failure)))
    }

    async fn shutdown(&self) -> Result<(), RollbotError> {
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn execute(&self, _commands: Vec<Command>) -> Result<Vec<Reply>, RollbotError> {
        self.fail().await
    }

    async fn scan_prefix(&self, _prefix: &str) -> Result<Vec<String>, RollbotError> {
        self.fail().await
    }
}
