// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Autocomplete. Never fails: a slow or broken store degrades to fewer
//! (or no) suggestions.

use tokio::time::Instant;
use tracing::{debug, warn};

use rollbot_core::{AutocompleteField, Preference, Response, RollbotError, UserId};
use rollbot_history::RollInput;
use rollbot_suggest::{suggest_labels, suggest_names, suggest_removals, suggest_rolls};

use crate::context::{App, Request};

pub(super) async fn suggest(
    app: &App,
    req: &Request,
    field: AutocompleteField,
    partial: &str,
) -> Result<Option<Response>, RollbotError> {
    let started = Instant::now();
    let user = req.user();

    let opted_out = app
        .rolls
        .has_preference(user, Preference::NoAutocomplete, req.deadline)
        .await
        .unwrap_or(false);
    let choices = if opted_out {
        Vec::new()
    } else {
        match field {
            AutocompleteField::Roll => {
                let (recent, saved) = tokio::join!(recent(app, req), saved(app, req));
                suggest_rolls(partial, &recent, &saved)
            }
            AutocompleteField::Unsave => suggest_removals(partial, &saved(app, req).await),
            AutocompleteField::SaveName => suggest_names(partial, &saved(app, req).await),
            AutocompleteField::Label => {
                let (recent, saved) = tokio::join!(recent(app, req), saved(app, req));
                suggest_labels(partial, &recent, &saved)
            }
        }
    };

    let elapsed = started.elapsed();
    metrics::histogram!("rollbot_autocomplete_seconds", "field" => field.to_string())
        .record(elapsed.as_secs_f64());
    debug!(
        user = %user,
        field = %field,
        count = choices.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "autocomplete"
    );
    Ok(Some(Response::Choices(choices)))
}

async fn recent(app: &App, req: &Request) -> Vec<RollInput> {
    degrade(req.user(), "recent", app.rolls.recent_rolls(req.user(), req.deadline).await)
}

async fn saved(app: &App, req: &Request) -> Vec<RollInput> {
    degrade(req.user(), "saved", app.rolls.saved_expressions(req.user(), req.deadline).await)
}

fn degrade(user: &UserId, source: &str, result: Result<Vec<RollInput>, RollbotError>) -> Vec<RollInput> {
    result.unwrap_or_else(|e| {
        warn!(user = %user, source, error = %e, "suggestions degraded");
        Vec::new()
    })
}
