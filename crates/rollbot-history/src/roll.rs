// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The roll input value type and its string forms.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use rollbot_core::RollbotError;

/// Separates fields in the compact serial form. Rejected in user content.
pub const SEPARATOR: char = '|';

/// Maximum expression length, in characters.
pub const MAX_EXPRESSION_CHARS: usize = 128;

/// Maximum name or label length, in characters.
pub const MAX_TAG_CHARS: usize = 32;

/// Platform limit on the length of one suggestion choice, in characters.
pub const MAX_CHOICE_CHARS: usize = 100;

static MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<.+?>").unwrap());
static CODE_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`(.+?)`").unwrap());

/// Whether `c` starts a label in free-text roll input.
fn is_label_marker(c: char) -> bool {
    c == '#' || c == '\\' || c == SEPARATOR
}

/// A dice expression with an optional label and name.
///
/// Empty labels and names are always stored as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RollInput {
    #[serde(rename = "e")]
    pub expression: String,
    #[serde(rename = "l", default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "n", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

impl RollInput {
    pub fn new(
        expression: impl Into<String>,
        label: Option<String>,
        name: Option<String>,
    ) -> Self {
        Self {
            expression: expression.into(),
            label: non_empty(label),
            name: non_empty(name),
        }
    }

    /// An unlabeled, unnamed roll.
    pub fn plain(expression: impl Into<String>) -> Self {
        Self::new(expression, None, None)
    }

    /// Parses a roll typed as free text, e.g. `` /roll `2d6+3 # fire` ``.
    ///
    /// Mentions and a leading `/roll` are stripped, the first back-quoted
    /// span wins if present, and everything after the first `#`, `\` or `|`
    /// becomes the label. Returns an empty input when nothing rollable is
    /// left.
    pub fn parse(text: &str) -> Self {
        let text = MENTION.replace_all(text, "");
        let text = text.trim();
        let text = text.strip_prefix("/roll").unwrap_or(text).trim();
        if text.is_empty() || text.starts_with(is_label_marker) {
            return Self::default();
        }

        let text = CODE_SPAN
            .captures(text)
            .and_then(|c| c.get(1))
            .map_or(text, |m| m.as_str());

        let mut parts = text.split(is_label_marker).filter(|p| !p.is_empty());
        let expression = parts.next().unwrap_or_default().trim();
        let label = parts.next().map(|l| l.trim().to_string());
        Self::new(expression, label, None)
    }

    /// The compact serial form: `expression|label|name`, trailing empty fields omitted.
    pub fn serialize(&self) -> String {
        let mut out = self.expression.clone();
        match (&self.label, &self.name) {
            (None, None) => {}
            (Some(label), None) => {
                out.push(SEPARATOR);
                out.push_str(label);
            }
            (label, Some(name)) => {
                out.push(SEPARATOR);
                out.push_str(label.as_deref().unwrap_or_default());
                out.push(SEPARATOR);
                out.push_str(name);
            }
        }
        out
    }

    /// Parses the compact serial form. Missing trailing fields are `None`.
    pub fn deserialize(serial: &str) -> Self {
        let mut parts = serial.splitn(3, SEPARATOR);
        let expression = parts.next().unwrap_or_default();
        let label = parts.next().map(str::to_string);
        let name = parts.next().map(str::to_string);
        Self::new(expression, label, name)
    }

    /// Decodes a stored history member: JSON (older format) or compact serial form.
    pub fn decode_member(member: &str) -> Self {
        if member.starts_with('{')
            && let Ok(input) = serde_json::from_str::<Self>(member)
        {
            return input;
        }
        Self::deserialize(member)
    }

    /// JSON encoding used for saved-expression hash values.
    pub fn to_json(&self) -> Result<String, RollbotError> {
        serde_json::to_string(self).map_err(|e| RollbotError::Internal(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, RollbotError> {
        let input: Self =
            serde_json::from_str(json).map_err(|e| RollbotError::storage(e.to_string()))?;
        Ok(Self::new(input.expression, input.label, input.name))
    }

    /// Text that re-submits this roll: `expression # label`.
    pub fn rollable(&self) -> String {
        match &self.label {
            Some(label) => format!("{} # {}", self.expression, label),
            None => self.expression.clone(),
        }
    }

    /// Identity within a user's saved expressions: the name, else the serial form.
    pub fn id(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.serialize())
    }

    /// Trims surrounding whitespace from every field.
    pub fn clean(&mut self) {
        self.expression = self.expression.trim().to_string();
        self.label = non_empty(self.label.take().map(|s| s.trim().to_string()));
        self.name = non_empty(self.name.take().map(|s| s.trim().to_string()));
    }

    /// Checks field lengths and the separator rule.
    pub fn validate(&self) -> Result<(), RollbotError> {
        let invalid = |msg: &str| Err(RollbotError::Validation(msg.to_string()));
        if self.expression.is_empty() {
            return invalid("An expression is required.");
        }
        if self.expression.chars().count() > MAX_EXPRESSION_CHARS {
            return Err(RollbotError::Validation(format!(
                "Expressions must be {MAX_EXPRESSION_CHARS} characters or fewer."
            )));
        }
        if self.name.as_ref().is_some_and(|n| n.chars().count() > MAX_TAG_CHARS) {
            return Err(RollbotError::Validation(format!(
                "Names must be {MAX_TAG_CHARS} characters or fewer."
            )));
        }
        if self.label.as_ref().is_some_and(|l| l.chars().count() > MAX_TAG_CHARS) {
            return Err(RollbotError::Validation(format!(
                "Labels must be {MAX_TAG_CHARS} characters or fewer."
            )));
        }
        let fields = [Some(&self.expression), self.label.as_ref(), self.name.as_ref()];
        if fields.into_iter().flatten().any(|f| f.contains(SEPARATOR)) {
            return Err(RollbotError::Validation(format!(
                "Expressions, names and labels can't contain `{SEPARATOR}`."
            )));
        }
        Ok(())
    }

    /// Whether both the rollable and display forms fit in one suggestion choice.
    pub fn fits_suggestion_limit(&self) -> bool {
        self.rollable().chars().count() <= MAX_CHOICE_CHARS
            && self.to_string().chars().count() <= MAX_CHOICE_CHARS
    }

    /// [`clean`](Self::clean), [`validate`](Self::validate), then the suggestion limit.
    pub fn prepare_for_storage(&mut self) -> Result<(), RollbotError> {
        self.clean();
        self.validate()?;
        if !self.fits_suggestion_limit() {
            return Err(RollbotError::Validation(format!(
                "Together, the expression, name and label must be under {MAX_CHOICE_CHARS} characters."
            )));
        }
        Ok(())
    }
}

/// The display form: `name (expression, label)`, `name (expression)`,
/// `expression, label`, or `expression`.
impl fmt::Display for RollInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.label) {
            (Some(name), Some(label)) => write!(f, "{name} ({}, {label})", self.expression),
            (Some(name), None) => write!(f, "{name} ({})", self.expression),
            (None, Some(label)) => write!(f, "{}, {label}", self.expression),
            (None, None) => f.write_str(&self.expression),
        }
    }
}
