// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guild membership bookkeeping. Failures are logged, never answered.

use tracing::{debug, warn};

use rollbot_core::{GuildId, Response, RollbotError};

use crate::context::{App, Request};

pub(super) async fn joined(
    app: &App,
    req: &Request,
    guild: &GuildId,
) -> Result<Option<Response>, RollbotError> {
    let membership = app.shards.membership();
    let added = tokio::time::timeout_at(
        req.deadline.instant(),
        membership.add_guild(req.shard, guild),
    )
    .await;
    match added {
        Ok(Ok(_)) => debug!(shard = %req.shard, guild = %guild, "guild added"),
        Ok(Err(e)) => warn!(shard = %req.shard, guild = %guild, error = %e, "could not record guild"),
        Err(_) => warn!(shard = %req.shard, guild = %guild, "timed out recording guild"),
    }
    Ok(None)
}

pub(super) async fn left(
    app: &App,
    req: &Request,
    guild: &GuildId,
    unavailable: bool,
) -> Result<Option<Response>, RollbotError> {
    if unavailable {
        debug!(shard = %req.shard, guild = %guild, "guild unavailable; keeping membership");
        return Ok(None);
    }
    let membership = app.shards.membership();
    let removed = tokio::time::timeout_at(
        req.deadline.instant(),
        membership.remove_guild(req.shard, guild),
    )
    .await;
    match removed {
        Ok(Ok(_)) => debug!(shard = %req.shard, guild = %guild, "guild removed"),
        Ok(Err(e)) => warn!(shard = %req.shard, guild = %guild, error = %e, "could not remove guild"),
        Err(_) => warn!(shard = %req.shard, guild = %guild, "timed out removing guild"),
    }
    Ok(None)
}
