// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One gateway shard and its lifecycle.

use std::sync::atomic::{AtomicU8, Ordering};

use strum::Display;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info};

use rollbot_core::{GatewayClient, RollbotError, ShardId, ShardInfo};

/// Lifecycle state of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum ShardState {
    Created = 0,
    Opening = 1,
    Open = 2,
    Closed = 3,
}

impl ShardState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::Opening,
            2 => Self::Open,
            _ => Self::Closed,
        }
    }
}

/// Handle for one shard.
///
/// Transitions on the same shard are serialized; transitions on different
/// shards never wait on each other.
#[derive(Debug)]
pub struct Shard {
    info: ShardInfo,
    state: AtomicU8,
    transition: Mutex<()>,
}

impl Shard {
    pub fn new(id: ShardId, total: u32) -> Self {
        Self {
            info: ShardInfo { id, total },
            state: AtomicU8::new(ShardState::Created as u8),
            transition: Mutex::new(()),
        }
    }

    pub fn id(&self) -> ShardId {
        self.info.id
    }

    pub fn info(&self) -> ShardInfo {
        self.info
    }

    pub fn state(&self) -> ShardState {
        ShardState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ShardState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Opens the shard. A shard that is already open is left alone.
    ///
    /// On failure the shard is left `Closed`.
    pub async fn open(&self, gateway: &dyn GatewayClient) -> Result<(), RollbotError> {
        let _guard = self.transition.lock().await;
        self.open_locked(gateway).await
    }

    /// Closes the shard. Closing a shard that never opened, or is already
    /// closed, does nothing.
    ///
    /// On failure the shard keeps its previous state.
    pub async fn close(&self, gateway: &dyn GatewayClient) -> Result<(), RollbotError> {
        let _guard = self.transition.lock().await;
        self.close_locked(gateway).await
    }

    /// Closes then reopens the shard without letting another transition
    /// on this shard run in between.
    pub async fn restart(&self, gateway: &dyn GatewayClient) -> Result<(), RollbotError> {
        let _guard = self.transition.lock().await;
        self.close_locked(gateway).await?;
        self.open_locked(gateway).await
    }

    async fn open_locked(&self, gateway: &dyn GatewayClient) -> Result<(), RollbotError> {
        if self.state() == ShardState::Open {
            return Ok(());
        }
        self.set_state(ShardState::Opening);
        let started = Instant::now();
        match gateway.open(self.info).await {
            Ok(()) => {
                self.set_state(ShardState::Open);
                let elapsed = started.elapsed();
                metrics::histogram!("rollbot_shard_open_seconds").record(elapsed.as_secs_f64());
                info!(
                    shard = %self.info.id,
                    total = self.info.total,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "shard open"
                );
                Ok(())
            }
            Err(e) => {
                self.set_state(ShardState::Closed);
                metrics::counter!("rollbot_shard_open_failures_total").increment(1);
                error!(shard = %self.info.id, error = %e, "shard failed to open");
                Err(e)
            }
        }
    }

    async fn close_locked(&self, gateway: &dyn GatewayClient) -> Result<(), RollbotError> {
        if matches!(self.state(), ShardState::Created | ShardState::Closed) {
            return Ok(());
        }
        match gateway.close(self.info).await {
            Ok(()) => {
                self.set_state(ShardState::Closed);
                info!(shard = %self.info.id, "shard closed");
                Ok(())
            }
            Err(e) => {
                error!(shard = %self.info.id, error = %e, "shard failed to close");
                Err(e)
            }
        }
    }
}
