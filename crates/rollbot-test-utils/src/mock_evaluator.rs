// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock dice evaluator with pre-configured outcomes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use rollbot_bot::{EvalError, Evaluation, Evaluator};

/// Expression that makes [`MockEvaluator`] panic.
pub const PANIC_EXPRESSION: &str = "panic";

/// A mock evaluator that returns pre-configured outcomes.
///
/// Expressions without a configured outcome evaluate to `7` with the
/// expression echoed as the steps.
#[derive(Default)]
pub struct MockEvaluator {
    outcomes: HashMap<String, Result<Evaluation, EvalError>>,
    calls: AtomicUsize,
}

impl MockEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `expression` evaluates to `total` with the given steps.
    pub fn with_result(mut self, expression: &str, total: f64, steps: &str) -> Self {
        self.outcomes.insert(
            expression.to_string(),
            Ok(Evaluation {
                total,
                steps: steps.to_string(),
            }),
        );
        self
    }

    /// `expression` fails with `error`.
    pub fn with_error(mut self, expression: &str, error: EvalError) -> Self {
        self.outcomes.insert(expression.to_string(), Err(error));
        self
    }

    /// Number of times `evaluate()` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Evaluator for MockEvaluator {
    fn evaluate(&self, expression: &str) -> Result<Evaluation, EvalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if expression == PANIC_EXPRESSION {
            panic!("evaluator exploded on {expression}");
        }
        match self.outcomes.get(expression) {
            Some(outcome) => outcome.clone(),
            None => Ok(Evaluation {
                total: 7.0,
                steps: format!("[{expression}]"),
            }),
        }
    }
}
