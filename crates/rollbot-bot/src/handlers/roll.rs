// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use tracing::{info, warn};

use rollbot_core::{Preference, Response, RollbotError, UserId};
use rollbot_history::RollInput;

use crate::context::{App, Request};
use crate::evaluator::{Evaluation, check_dice};

/// `/roll`: free-form input plus an optional explicit label.
pub(super) async fn slash(
    app: &App,
    req: &Request,
    input: &str,
    label: Option<&str>,
) -> Result<Option<Response>, RollbotError> {
    let mut roll = RollInput::parse(input);
    if let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) {
        roll.label = Some(label.to_string());
    }
    roll.validate()?;
    evaluate(app, req, roll).await.map(Some)
}

/// A chat message addressed to the bot. Messages without a roll are ignored.
pub(super) async fn message(
    app: &App,
    req: &Request,
    content: &str,
) -> Result<Option<Response>, RollbotError> {
    let roll = RollInput::parse(content);
    if roll.expression.is_empty() {
        return Ok(None);
    }
    roll.validate()?;
    evaluate(app, req, roll).await.map(Some)
}

async fn evaluate(app: &App, req: &Request, roll: RollInput) -> Result<Response, RollbotError> {
    let max_dice = app.config.bot.max_dice;
    let user = req.user();
    let result = check_dice(&roll.expression, max_dice)
        .and_then(|()| app.evaluator.evaluate(&roll.expression));
    let evaluation = match result {
        Ok(evaluation) => evaluation,
        Err(e) => {
            warn!(id = %req.event.id, expression = %roll.expression, error = %e, "evaluation error");
            return Ok(Response::ephemeral(e.friendly_message(max_dice)));
        }
    };
    info!(
        id = %req.event.id,
        shard = %req.shard,
        expression = %roll.expression,
        total = evaluation.total,
        "rolled"
    );
    metrics::counter!("rollbot_rolls_total").increment(1);

    // History and counters are best effort: the roll already happened.
    if let Err(e) = app.rolls.record_roll(user, &roll, req.deadline).await {
        warn!(user = %user, error = %e, "could not record roll history");
    }
    if let Err(e) = app.rolls.increment_roll_count(user, req.deadline).await {
        warn!(user = %user, error = %e, "could not count roll");
    }
    let detailed = app
        .rolls
        .has_preference(user, Preference::DetailedOutput, req.deadline)
        .await
        .unwrap_or_else(|e| {
            warn!(user = %user, error = %e, "could not read preferences");
            false
        });

    Ok(Response::public(format_roll(user, &roll, &evaluation, detailed)))
}

/// The public roll message, e.g. ``<@42> rolled `2d6+3` _fire_: `[2 4] + 3` = **9**``.
pub fn format_roll(user: &UserId, roll: &RollInput, evaluation: &Evaluation, detailed: bool) -> String {
    let mut out = format!("<@{user}> rolled `{}`", roll.expression);
    if let Some(label) = &roll.label {
        out.push_str(&format!(" _{label}_"));
    }
    if detailed {
        out.push_str(&format!(": `{}`", evaluation.steps));
    }
    out.push_str(&format!(" = **{}**", evaluation.total));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluation() -> Evaluation {
        Evaluation {
            total: 9.0,
            steps: "[2 4] + 3".into(),
        }
    }

    #[test]
    fn detailed_output_includes_steps() {
        let roll = RollInput::new("2d6+3", Some("fire".into()), None);
        assert_eq!(
            format_roll(&UserId::from("42"), &roll, &evaluation(), true),
            "<@42> rolled `2d6+3` _fire_: `[2 4] + 3` = **9**"
        );
    }

    #[test]
    fn terse_output_omits_steps_and_missing_label() {
        let roll = RollInput::plain("2d6+3");
        assert_eq!(
            format_roll(&UserId::from("42"), &roll, &evaluation(), false),
            "<@42> rolled `2d6+3` = **9**"
        );
    }

    #[test]
    fn fractional_totals_keep_their_digits() {
        let roll = RollInput::plain("1d4/2");
        let evaluation = Evaluation {
            total: 1.5,
            steps: "[3] / 2".into(),
        };
        assert!(format_roll(&UserId::from("1"), &roll, &evaluation, false).ends_with("**1.5**"));
    }
}
