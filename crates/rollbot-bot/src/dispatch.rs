// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event dispatch: one task per inbound event, bounded by its deadline.
//!
//! A failing or panicking handler only affects its own request. Errors are
//! turned into user-facing text here, never inside the handlers.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, info_span, warn};

use rollbot_core::{
    EventKind, Response, RollbotError, ShardEvent, TRY_AGAIN_LATER, UNEXPECTED_ERROR,
};

use crate::context::{App, Request};
use crate::handlers;
use crate::metrics::record_event;

/// Pause after a failed receive before asking the gateway again.
const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

/// Gateway housekeeping events never get a reply, even on failure.
fn expects_reply(kind: &EventKind) -> bool {
    !matches!(
        kind,
        EventKind::Ready | EventKind::GuildCreate { .. } | EventKind::GuildDelete { .. }
    )
}

/// Reply used when the handler produced no usable response.
fn fallback(kind: &EventKind, text: &str) -> Option<Response> {
    match kind {
        EventKind::Autocomplete { .. } => Some(Response::Choices(Vec::new())),
        kind if expects_reply(kind) => Some(Response::ephemeral(text)),
        _ => None,
    }
}

/// Runs the handler for one event and returns the reply to send, if any.
///
/// The handler runs on its own task so a panic is contained and answered
/// with an apology. Work still running at the deadline is aborted.
pub async fn process_event(app: Arc<App>, event: ShardEvent) -> Option<Response> {
    let kind = event.event.kind.clone();
    let deadline = app.deadline_for(&kind);
    let req = Request::new(event, deadline);
    let span = info_span!(
        "event",
        id = %req.event.id,
        shard = %req.shard,
        kind = kind.name()
    );
    record_event(kind.name());

    let mut task = {
        let app = Arc::clone(&app);
        tokio::spawn(async move { handlers::handle(&app, &req).await }.instrument(span.clone()))
    };

    async move {
        match tokio::time::timeout_at(deadline.instant(), &mut task).await {
            Ok(Ok(Ok(response))) => response,
            Ok(Ok(Err(e))) => {
                if e.is_user_facing() {
                    debug!(error = %e, "request rejected");
                } else {
                    error!(error = %e, "request failed");
                }
                fallback(&kind, &e.user_message())
            }
            Ok(Err(join_error)) => {
                if join_error.is_panic() {
                    error!("handler panicked");
                } else {
                    warn!(error = %join_error, "handler task cancelled");
                }
                fallback(&kind, UNEXPECTED_ERROR)
            }
            Err(_) => {
                task.abort();
                warn!("request deadline passed");
                fallback(&kind, TRY_AGAIN_LATER)
            }
        }
    }
    .instrument(span)
    .await
}

/// Pulls events off the gateway and hands each one to its own task.
pub struct Dispatcher {
    app: Arc<App>,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(app: Arc<App>) -> Self {
        Self {
            app,
            tracker: TaskTracker::new(),
        }
    }

    /// Number of events currently being handled.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Dispatches events until `cancel` fires or the gateway stream ends,
    /// then waits for in-flight requests to finish.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), RollbotError> {
        info!("dispatcher running");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, no longer accepting events");
                    break;
                }
                next = self.app.gateway.receive() => match next {
                    Ok(Some(event)) => self.spawn(event),
                    Ok(None) => {
                        info!("gateway event stream ended");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "gateway receive error");
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(RECEIVE_BACKOFF) => {}
                        }
                    }
                },
            }
        }

        self.drain().await;
        info!("dispatcher stopped");
        Ok(())
    }

    fn spawn(&self, event: ShardEvent) {
        let app = Arc::clone(&self.app);
        self.tracker.spawn(async move {
            let shard = event.shard;
            let id = event.event.id.clone();
            let Some(response) = process_event(Arc::clone(&app), event).await else {
                return;
            };
            if let Err(e) = app.gateway.respond(shard, &id, response).await {
                warn!(%shard, %id, error = %e, "failed to send response");
            }
        });
    }

    /// Every request is bounded by its deadline, so the drain is too.
    async fn drain(&self) {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending == 0 {
            return;
        }
        info!(pending, "draining in-flight requests");
        let limit = self.app.config.bot.request_timeout() + RECEIVE_BACKOFF;
        if tokio::time::timeout(limit, self.tracker.wait()).await.is_err() {
            warn!(remaining = self.tracker.len(), "in-flight requests did not finish in time");
        }
    }
}

/// Opens every shard, dispatches events until `cancel` fires or the gateway
/// stream ends, then closes every shard.
pub async fn serve(app: Arc<App>, cancel: CancellationToken) -> Result<(), RollbotError> {
    let report = app.shards.start().await?;
    info!(
        opened = report.opened.len(),
        failed = report.failed.len(),
        ready = report.ready,
        "shards started"
    );

    let dispatcher = Dispatcher::new(Arc::clone(&app));
    let result = dispatcher.run(cancel).await;
    app.shards.close_all().await;
    result
}
