// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Autocomplete request shapes.
//!
//! Each shape assembles its own candidate list and then goes through
//! [`finalize`]: deduplicate by display name, then cap at
//! [`MAX_SUGGESTIONS`]. Truncation always runs last.

use std::collections::HashSet;

use tracing::debug;

use rollbot_core::Choice;
use rollbot_history::{MAX_CHOICE_CHARS, RollInput};

use crate::rank::rank;

/// Platform limit on the number of autocomplete choices.
pub const MAX_SUGGESTIONS: usize = 25;

/// Recent rolls shown before saved expressions when nothing is typed.
pub const RECENT_HEAD: usize = 5;

/// Drops repeated display names (first wins), then truncates.
pub fn finalize(choices: impl IntoIterator<Item = Choice>) -> Vec<Choice> {
    let mut seen = HashSet::new();
    let out: Vec<Choice> = choices
        .into_iter()
        .filter(|c| seen.insert(c.name.clone()))
        .take(MAX_SUGGESTIONS)
        .collect();
    debug!(count = out.len(), "suggestions ready");
    out
}

/// The typed text as a choice, cut to the platform's per-choice limit.
pub fn literal(partial: &str) -> Choice {
    Choice::literal(partial.chars().take(MAX_CHOICE_CHARS).collect::<String>())
}

fn roll_choice(roll: &RollInput) -> Choice {
    Choice::new(roll.to_string(), roll.rollable())
}

/// Suggestions for the expression being rolled.
///
/// With nothing typed: the most recent [`RECENT_HEAD`] rolls, then saved
/// expressions, each in its own order. Otherwise the typed text first,
/// followed by recents and saved ranked against it.
pub fn suggest_rolls(partial: &str, recent: &[RollInput], saved: &[RollInput]) -> Vec<Choice> {
    let partial = partial.trim();
    if partial.is_empty() {
        let head = recent.iter().take(RECENT_HEAD).map(roll_choice);
        return finalize(head.chain(saved.iter().map(roll_choice)));
    }
    let candidates = recent.iter().chain(saved).map(roll_choice);
    finalize(std::iter::once(literal(partial)).chain(rank(partial, candidates)))
}

/// Suggestions for a saved expression to remove. Values are roll IDs.
///
/// No literal is offered: only an existing ID can be removed.
pub fn suggest_removals(partial: &str, saved: &[RollInput]) -> Vec<Choice> {
    let candidates = saved.iter().map(|roll| Choice::new(roll.to_string(), roll.id()));
    let partial = partial.trim();
    if partial.is_empty() {
        return finalize(candidates);
    }
    finalize(rank(partial, candidates))
}

/// Suggestions for the name of an expression being saved: the typed text,
/// then existing names (saving under one overwrites it).
pub fn suggest_names(partial: &str, saved: &[RollInput]) -> Vec<Choice> {
    let names = saved
        .iter()
        .filter_map(|roll| roll.name.as_deref())
        .map(Choice::literal);
    tagged(partial, names)
}

/// Suggestions for a roll label: the typed text, then labels used before.
pub fn suggest_labels(partial: &str, recent: &[RollInput], saved: &[RollInput]) -> Vec<Choice> {
    let labels = recent
        .iter()
        .chain(saved)
        .filter_map(|roll| roll.label.as_deref())
        .map(Choice::literal);
    tagged(partial, labels)
}

fn tagged(partial: &str, existing: impl Iterator<Item = Choice>) -> Vec<Choice> {
    let partial = partial.trim();
    if partial.is_empty() {
        return finalize(existing);
    }
    finalize(std::iter::once(literal(partial)).chain(rank(partial, existing)))
}
