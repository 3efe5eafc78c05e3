// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Case- and accent-insensitive fuzzy ranking.
//!
//! A candidate matches when the folded query is a subsequence of its folded
//! name. Matches are ordered by Levenshtein distance between the two folded
//! strings, best first; equal distances keep their input order.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use rollbot_core::Choice;

/// Lower-cases `s` and strips accents (NFD, then drops combining marks).
pub fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether every char of `needle` appears in `haystack`, in order.
fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut rest = haystack.chars();
    needle.chars().all(|c| rest.any(|h| h == c))
}

/// Ranks `candidates` against `query` by their display name.
///
/// Non-matching candidates are dropped. An empty query matches everything
/// at a distance equal to the name length, so shorter names come first.
pub fn rank(query: &str, candidates: impl IntoIterator<Item = Choice>) -> Vec<Choice> {
    let query = fold(query);
    let mut ranked: Vec<(usize, Choice)> = candidates
        .into_iter()
        .filter_map(|choice| {
            let name = fold(&choice.name);
            is_subsequence(&query, &name)
                .then(|| (strsim::levenshtein(&query, &name), choice))
        })
        .collect();
    // `sort_by_key` is stable, which is what breaks ties by input order.
    ranked.sort_by_key(|(distance, _)| *distance);
    ranked.into_iter().map(|(_, choice)| choice).collect()
}
