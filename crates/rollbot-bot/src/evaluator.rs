// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The seam to the dice expression evaluator.
//!
//! Evaluation itself lives outside this workspace. Only its errors are
//! interpreted here, mapped to a fixed set of friendly messages.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static DICE_COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)[df]").unwrap());

/// The result of evaluating one expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub total: f64,
    /// Human-readable breakdown, e.g. `[3 5] + 4`.
    pub steps: String,
}

/// Why an expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("invalid expression")]
    InvalidExpression,
    #[error("nil expression result")]
    EmptyResult,
    #[error("too many dice")]
    TooManyDice,
    #[error("expression yielded no result")]
    NoResult,
    #[error("transition token types: {0}")]
    TokenTransition(String),
    #[error("{0}")]
    Other(String),
}

impl EvalError {
    /// The text shown to the user for this error.
    pub fn friendly_message(&self, max_dice: u64) -> String {
        match self {
            Self::InvalidExpression => "I can't evaluate that expression. Is that roll valid?".into(),
            Self::EmptyResult => "Something's wrong with that expression, it was empty.".into(),
            Self::TooManyDice => format!(
                "Your roll may require too many dice, please try a smaller roll (under {max_dice} dice)."
            ),
            Self::NoResult => "Your roll didn't yield a result.".into(),
            Self::TokenTransition(_) => "An error was thrown when evaluating your expression. \
                Please check for extra spaces in notations or missing math operators."
                .into(),
            Self::Other(_) => {
                "Something unexpected errored. Please check the help command for valid rolls.".into()
            }
        }
    }
}

/// Evaluates dice expressions.
pub trait Evaluator: Send + Sync + 'static {
    fn evaluate(&self, expression: &str) -> Result<Evaluation, EvalError>;
}

/// Total dice requested by the `NdM` (and `NdF`) terms of `expression`.
///
/// A count too large for `u64` saturates the total.
pub fn dice_count(expression: &str) -> u64 {
    DICE_COUNT
        .captures_iter(expression)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
        .fold(0, u64::saturating_add)
}

/// Rejects an expression that asks for more than `max_dice` dice.
pub fn check_dice(expression: &str, max_dice: u64) -> Result<(), EvalError> {
    if dice_count(expression) > max_dice {
        return Err(EvalError::TooManyDice);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_dice_across_terms() {
        assert_eq!(dice_count("4d6kh3"), 4);
        assert_eq!(dice_count("12d6 + 3D8 + 4dF"), 19);
        assert_eq!(dice_count("d20 + 5"), 0);
    }

    #[test]
    fn guard_rejects_large_pools() {
        assert!(check_dice("1000d6", 1000).is_ok());
        assert_eq!(check_dice("600d6+600d6", 1000), Err(EvalError::TooManyDice));
    }

    #[test]
    fn oversized_counts_saturate() {
        assert_eq!(dice_count("99999999999999999999999d6"), u64::MAX);
        assert_eq!(dice_count("1d4 + 99999999999999999999999d6"), u64::MAX);
        assert_eq!(
            check_dice("99999999999999999999999d6", 1000),
            Err(EvalError::TooManyDice)
        );
    }

    #[test]
    fn friendly_messages() {
        assert!(EvalError::TooManyDice.friendly_message(500).contains("under 500 dice"));
        assert!(
            EvalError::TokenTransition("x".into())
                .friendly_message(1)
                .contains("extra spaces")
        );
        assert!(EvalError::Other("boom".into()).friendly_message(1).starts_with("Something unexpected"));
    }
}
