// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Rollbot.

use std::time::Duration;

use thiserror::Error;

/// Generic text shown to a user when a write could not reach the store.
pub const TRY_AGAIN_LATER: &str = "Something unexpected errored! Please try again later.";

/// Generic apology shown to a user when a request failed unexpectedly.
pub const UNEXPECTED_ERROR: &str =
    "Sorry! Something errored unexpectedly. Please check to make sure your command was valid.";

/// The primary error type used across all Rollbot crates.
#[derive(Debug, Error)]
pub enum RollbotError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable store errors (unreachable backend, query failure, wrong key type).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Gateway errors (shard open/close failure, response delivery failure).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// User input failed validation. The message is shown to the user as-is.
    #[error("{0}")]
    Validation(String),

    /// A per-user quota (saved expressions) would be exceeded.
    #[error("You already have the maximum of {limit} saved expressions. Please remove one before adding another.")]
    QuotaExceeded { limit: usize },

    /// Operation did not finish before its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// A referenced item (shard, key) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RollbotError {
    /// Wraps any error as a storage error.
    pub fn storage<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Storage { source: err.into() }
    }

    /// Builds a gateway error without an underlying source.
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Gateway {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the error should be reported back to the requesting user verbatim.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::QuotaExceeded { .. })
    }

    /// The text a requesting user should see for this error.
    ///
    /// Validation and quota errors are actionable and shown verbatim. Store
    /// and deadline failures become a generic "try again later"; everything
    /// else gets the generic apology.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(_) | Self::QuotaExceeded { .. } => self.to_string(),
            Self::Storage { .. } | Self::Timeout { .. } => TRY_AGAIN_LATER.to_string(),
            _ => UNEXPECTED_ERROR.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_shown_verbatim() {
        let err = RollbotError::Validation("name too long".into());
        assert!(err.is_user_facing());
        assert_eq!(err.user_message(), "name too long");
    }

    #[test]
    fn quota_message_names_the_limit() {
        let err = RollbotError::QuotaExceeded { limit: 50 };
        assert!(err.user_message().contains("maximum of 50"));
    }

    #[test]
    fn store_and_timeout_errors_ask_to_retry() {
        let store = RollbotError::storage(std::io::Error::other("connection refused"));
        let timeout = RollbotError::Timeout {
            duration: Duration::from_secs(2),
        };
        assert!(!store.is_user_facing());
        assert_eq!(store.user_message(), TRY_AGAIN_LATER);
        assert_eq!(timeout.user_message(), TRY_AGAIN_LATER);
    }

    #[test]
    fn internal_errors_get_the_apology() {
        let err = RollbotError::Internal("boom".into());
        assert_eq!(err.user_message(), UNEXPECTED_ERROR);
        let err = RollbotError::gateway("shard 3 refused");
        assert_eq!(err.user_message(), UNEXPECTED_ERROR);
    }
}
