// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opens all shards under the platform's concurrency limit, waits for
//! readiness, and restarts single shards on demand.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use rollbot_config::GatewayConfig;
use rollbot_core::{GatewayClient, RollbotError, ShardId, ShardPlan};

use crate::membership::Membership;
use crate::shard::{Shard, ShardState};

/// How often readiness is polled through shard 0.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Outcome of [`ShardManager::start`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupReport {
    pub opened: Vec<ShardId>,
    pub failed: Vec<(ShardId, String)>,
    /// Whether the bot's identity resolved before the readiness timeout.
    pub ready: bool,
}

/// Owns every shard of this process.
pub struct ShardManager {
    gateway: Arc<dyn GatewayClient>,
    membership: Membership,
    shards: Vec<Arc<Shard>>,
    max_concurrency: usize,
    ready_timeout: Duration,
}

impl ShardManager {
    /// Builds `max(plan.shards, config.min_shards)` shard handles. Nothing is opened yet.
    pub fn new(
        gateway: Arc<dyn GatewayClient>,
        membership: Membership,
        plan: ShardPlan,
        config: &GatewayConfig,
    ) -> Self {
        let total = plan.shards.max(config.min_shards).max(1);
        let shards = (0..total)
            .map(|id| Arc::new(Shard::new(ShardId(id), total)))
            .collect();
        Self {
            gateway,
            membership,
            shards,
            max_concurrency: plan.max_concurrency.max(1) as usize,
            ready_timeout: config.ready_timeout(),
        }
    }

    /// Asks the gateway for its shard plan, then builds the manager.
    pub async fn from_gateway(
        gateway: Arc<dyn GatewayClient>,
        membership: Membership,
        config: &GatewayConfig,
    ) -> Result<Self, RollbotError> {
        let plan = gateway.shard_plan().await?;
        info!(
            recommended = plan.shards,
            max_concurrency = plan.max_concurrency,
            "received shard plan"
        );
        Ok(Self::new(gateway, membership, plan, config))
    }

    pub fn shard_count(&self) -> u32 {
        self.shards.len() as u32
    }

    pub fn shard(&self, id: ShardId) -> Option<&Arc<Shard>> {
        self.shards.get(id.0 as usize)
    }

    /// Current state of every shard, in shard order.
    pub fn snapshot(&self) -> Vec<(ShardId, ShardState)> {
        self.shards.iter().map(|s| (s.id(), s.state())).collect()
    }

    /// Clears stale membership, opens every shard, and waits for readiness.
    ///
    /// Returns once every shard has finished its open attempt and readiness
    /// has either arrived or timed out. The readiness timeout starts with
    /// the first open, not after the last one. Individual shard failures are
    /// reported, never propagated.
    pub async fn start(&self) -> Result<StartupReport, RollbotError> {
        match self.membership.clear_all().await {
            Ok(cleared) => debug!(cleared, "cleared shard membership"),
            Err(e) => warn!(error = %e, "could not clear stale shard membership"),
        }

        let (opened, ready) = tokio::join!(self.open_all(), self.wait_ready());
        let mut report = opened?;
        report.ready = ready;
        info!(
            opened = report.opened.len(),
            failed = report.failed.len(),
            ready = report.ready,
            "shard startup complete"
        );
        Ok(report)
    }

    /// Opens every shard with at most `max_concurrency` opens in flight.
    async fn open_all(&self) -> Result<StartupReport, RollbotError> {
        let total = self.shards.len();
        let (job_tx, job_rx) = mpsc::channel::<Arc<Shard>>(total);
        for shard in &self.shards {
            job_tx
                .send(shard.clone())
                .await
                .map_err(|_| RollbotError::Internal("shard queue closed".into()))?;
        }
        drop(job_tx);

        let jobs = Arc::new(Mutex::new(job_rx));
        let (done_tx, mut done_rx) = mpsc::channel(total);
        let workers = self.max_concurrency.min(total);
        info!(shards = total, workers, "opening shards");

        for worker in 0..workers {
            let jobs = jobs.clone();
            let done = done_tx.clone();
            let gateway = self.gateway.clone();
            tokio::spawn(async move {
                loop {
                    let next = jobs.lock().await.recv().await;
                    let Some(shard) = next else { break };
                    debug!(worker, shard = %shard.id(), "opening shard");
                    let result = shard.open(gateway.as_ref()).await;
                    if done.send((shard.id(), result)).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(done_tx);

        let mut report = StartupReport::default();
        for _ in 0..total {
            match done_rx.recv().await {
                Some((id, Ok(()))) => report.opened.push(id),
                Some((id, Err(e))) => report.failed.push((id, e.to_string())),
                None => break,
            }
        }

        // A worker that died mid-open never reported its shard.
        if report.opened.len() + report.failed.len() < total {
            for shard in &self.shards {
                let id = shard.id();
                let reported = report.opened.contains(&id) || report.failed.iter().any(|(f, _)| *f == id);
                if !reported {
                    error!(shard = %id, "shard open did not report back");
                    report.failed.push((id, "open did not complete".into()));
                }
            }
        }
        report.opened.sort();
        report.failed.sort_by_key(|(id, _)| *id);
        Ok(report)
    }

    /// Polls shard 0 until the bot's own user resolves or the timeout passes.
    async fn wait_ready(&self) -> bool {
        let Some(first) = self.shards.first() else {
            return false;
        };
        let info = first.info();
        let poll = async {
            loop {
                match self.gateway.current_user(info).await {
                    Ok(Some(user)) => return user,
                    Ok(None) => {}
                    Err(e) => debug!(error = %e, "readiness check failed"),
                }
                tokio::time::sleep(READY_POLL_INTERVAL).await;
            }
        };
        match tokio::time::timeout(self.ready_timeout, poll).await {
            Ok(user) => {
                info!(user = %user.name, id = %user.id, "gateway ready");
                true
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.ready_timeout.as_secs(),
                    "gateway not ready before timeout; continuing degraded"
                );
                false
            }
        }
    }

    /// Closes and reopens one shard. Other shards are not touched.
    pub async fn restart(&self, id: ShardId) -> Result<(), RollbotError> {
        let shard = self
            .shard(id)
            .ok_or_else(|| RollbotError::NotFound(format!("shard {id}")))?;
        info!(shard = %id, "restarting shard");
        match shard.restart(self.gateway.as_ref()).await {
            Ok(()) => {
                info!(shard = %id, "shard restarted");
                Ok(())
            }
            Err(e) => {
                error!(shard = %id, state = %shard.state(), error = %e, "shard restart failed");
                Err(e)
            }
        }
    }

    /// Closes every shard, logging failures.
    pub async fn close_all(&self) {
        for shard in &self.shards {
            if let Err(e) = shard.close(self.gateway.as_ref()).await {
                warn!(shard = %shard.id(), error = %e, "error closing shard");
            }
        }
    }

    pub fn membership(&self) -> &Membership {
        &self.membership
    }
}
