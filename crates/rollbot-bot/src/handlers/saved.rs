// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use tracing::info;

use rollbot_core::{Response, RollbotError};
use rollbot_history::{EXPORT_CONTENT_TYPE, EXPORT_FILE_NAME, RollInput};

use crate::context::{App, Request};

pub(super) async fn save(
    app: &App,
    req: &Request,
    expression: &str,
    name: Option<String>,
    label: Option<String>,
) -> Result<Option<Response>, RollbotError> {
    let input = RollInput::new(expression, label, name);
    let saved = app.rolls.save_expression(req.user(), input, req.deadline).await?;
    info!(user = %req.user(), id = %saved.id(), "expression saved");
    Ok(Some(Response::ephemeral(format!("Saved `{saved}`!"))))
}

pub(super) async fn unsave(app: &App, req: &Request, id: &str) -> Result<Option<Response>, RollbotError> {
    let removed = app.rolls.unsave_expression(req.user(), id, req.deadline).await?;
    let text = if removed {
        format!("Removed `{id}` from your saved expressions.")
    } else {
        format!("You don't have a saved expression `{id}`.")
    };
    Ok(Some(Response::ephemeral(text)))
}

pub(super) async fn export(app: &App, req: &Request) -> Result<Option<Response>, RollbotError> {
    let saved = app.rolls.saved_expressions(req.user(), req.deadline).await?;
    if saved.is_empty() {
        return Ok(Some(Response::ephemeral(
            "You don't have any saved expressions to export.",
        )));
    }
    let data = app.rolls.export_saved(req.user(), req.deadline).await?;
    Ok(Some(Response::File {
        name: EXPORT_FILE_NAME.into(),
        content_type: EXPORT_CONTENT_TYPE.into(),
        data,
        caption: format!("Your {} saved expressions.", saved.len()),
    }))
}

pub(super) async fn import(app: &App, req: &Request, data: &str) -> Result<Option<Response>, RollbotError> {
    let count = app.rolls.import_saved(req.user(), data, req.deadline).await?;
    info!(user = %req.user(), count, "expressions imported");
    Ok(Some(Response::ephemeral(format!(
        "Expressions saved! Total expressions: {count}"
    ))))
}

pub(super) async fn clear(app: &App, req: &Request) -> Result<Option<Response>, RollbotError> {
    app.rolls.clear_saved(req.user(), req.deadline).await?;
    Ok(Some(Response::ephemeral("Your saved expressions have been cleared.")))
}
