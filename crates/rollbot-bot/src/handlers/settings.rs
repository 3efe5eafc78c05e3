// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use rollbot_core::{Preference, Response, RollbotError};

use crate::context::{App, Request};

pub(super) async fn set_preference(
    app: &App,
    req: &Request,
    preference: Preference,
    enabled: bool,
) -> Result<Option<Response>, RollbotError> {
    app.rolls
        .set_preference(req.user(), preference, enabled, req.deadline)
        .await?;
    let state = if enabled { "on" } else { "off" };
    let mut text = format!("Setting `{preference}` turned {state}.");
    if enabled && preference == Preference::NoRecentHistory {
        text.push_str(" Your roll history has been cleared.");
    }
    Ok(Some(Response::ephemeral(text)))
}

pub(super) async fn clear_history(app: &App, req: &Request) -> Result<Option<Response>, RollbotError> {
    app.rolls.clear_history(req.user(), req.deadline).await?;
    Ok(Some(Response::ephemeral("Your roll history has been cleared.")))
}
