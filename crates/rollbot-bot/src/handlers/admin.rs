// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owner-only commands.

use tracing::warn;

use rollbot_core::{Response, RollbotError, ShardId};

use crate::context::{App, Request};
use crate::stats::StatsReport;

const NOT_OWNER: &str = "Sorry, only the bot's owners can do that.";

fn is_owner(app: &App, req: &Request) -> bool {
    let owner = app.config.bot.is_owner(&req.user().0);
    if !owner {
        warn!(user = %req.user(), command = req.event.kind.name(), "owner command refused");
    }
    owner
}

pub(super) async fn restart_shard(
    app: &App,
    req: &Request,
    shard: ShardId,
) -> Result<Option<Response>, RollbotError> {
    if !is_owner(app, req) {
        return Ok(Some(Response::ephemeral(NOT_OWNER)));
    }
    let text = match app.shards.restart(shard).await {
        Ok(()) => format!("Shard {shard} restarted."),
        Err(RollbotError::NotFound(_)) => format!(
            "There is no shard {shard}; this process runs {} shards.",
            app.shards.shard_count()
        ),
        // Logged by the shard manager.
        Err(e) => format!("Shard {shard} failed to restart: {e}"),
    };
    Ok(Some(Response::ephemeral(text)))
}

pub(super) async fn stats(app: &App, req: &Request) -> Result<Option<Response>, RollbotError> {
    if !is_owner(app, req) {
        return Ok(Some(Response::ephemeral(NOT_OWNER)));
    }
    let shards = app
        .shards
        .snapshot()
        .into_iter()
        .map(|(id, state)| (id, Some(state)))
        .collect();
    let report =
        StatsReport::collect(&app.rolls, app.shards.membership(), shards, req.deadline).await?;
    Ok(Some(Response::ephemeral(report.to_string())))
}
