// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSV export and import of saved expressions.

use serde::{Deserialize, Serialize};

use rollbot_core::RollbotError;

use crate::roll::RollInput;

/// File name offered for exported expressions.
pub const EXPORT_FILE_NAME: &str = "expressions.csv";

/// Content type of exported expressions.
pub const EXPORT_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

const HEADER: [&str; 3] = ["expression", "name", "label"];

#[derive(Debug, Serialize, Deserialize)]
struct Row {
    expression: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

/// Writes `rolls` as CSV with an `expression,name,label` header.
pub fn export_csv(rolls: &[RollInput]) -> Result<Vec<u8>, RollbotError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    let internal = |e: csv::Error| RollbotError::Internal(format!("CSV export failed: {e}"));

    writer.write_record(HEADER).map_err(internal)?;
    for roll in rolls {
        writer
            .serialize(Row {
                expression: roll.expression.clone(),
                name: roll.name.clone(),
                label: roll.label.clone(),
            })
            .map_err(internal)?;
    }
    writer
        .into_inner()
        .map_err(|e| RollbotError::Internal(format!("CSV export failed: {e}")))
}

/// Parses and validates CSV produced by [`export_csv`] (or written by hand).
///
/// Every row is cleaned and validated; the first bad row fails the whole
/// import. At least one and at most `max_rows` rows are accepted.
pub fn import_csv(data: &str, max_rows: usize) -> Result<Vec<RollInput>, RollbotError> {
    let empty = || RollbotError::Validation("CSV data was empty! No changes will be made.".into());
    if data.trim().is_empty() {
        return Err(empty());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let mut rolls = Vec::new();
    for (index, row) in reader.deserialize::<Row>().enumerate() {
        let row = row.map_err(|e| RollbotError::Validation(format!("Error reading CSV: {e}")))?;
        if rolls.len() == max_rows {
            return Err(RollbotError::Validation(format!(
                "Data contained more than the maximum of {max_rows} expressions to save."
            )));
        }
        let mut roll = RollInput::new(row.expression, row.label, row.name);
        roll.prepare_for_storage().map_err(|e| {
            RollbotError::Validation(format!("Error validating expression {}: {e}", index + 1))
        })?;
        rolls.push(roll);
    }
    if rolls.is_empty() {
        return Err(empty());
    }
    Ok(rolls)
}
