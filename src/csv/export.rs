//! CSV Export - batch results as a table
//!
//! Columns: `Item ID`, `Status`, `Started At`, `Completed At`, then
//! `Input: <label>` per global input and `Output: <step name>` per step.
//! Rows follow submission order. Cells holding a comma, quote or newline
//! are quoted with inner quotes doubled; other cells are written as is.

use std::borrow::Cow;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::ast::WorkflowDefinition;
use crate::store::{BatchExecution, BatchItem};

/// Quote a cell only when it needs it
pub fn escape_csv_value(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

fn join_row<'a>(cells: impl IntoIterator<Item = Cow<'a, str>>) -> String {
    cells.into_iter().collect::<Vec<_>>().join(",")
}

fn item_row(item: &BatchItem, definition: &WorkflowDefinition) -> String {
    let mut cells: Vec<Cow<'_, str>> = vec![
        escape_csv_value(&item.id),
        Cow::Borrowed(item.status.as_str()),
        Cow::Owned(timestamp(item.started_at)),
        Cow::Owned(timestamp(item.completed_at)),
    ];

    cells.extend(definition.global_inputs.iter().map(|field| {
        escape_csv_value(item.inputs.get(&field.id).map(String::as_str).unwrap_or(""))
    }));

    cells.extend(definition.steps.iter().map(|step| {
        let output = item
            .result
            .as_ref()
            .and_then(|run| run.output(&step.output_key))
            .unwrap_or("");
        escape_csv_value(output)
    }));

    join_row(cells)
}

/// Serialize every item of `batch` (one row each, submission order)
pub fn export_batch_results_to_csv(batch: &BatchExecution, definition: &WorkflowDefinition) -> String {
    let headers: Vec<String> = ["Item ID", "Status", "Started At", "Completed At"]
        .iter()
        .map(|h| h.to_string())
        .chain(
            definition
                .global_inputs
                .iter()
                .map(|field| format!("Input: {}", field.label)),
        )
        .chain(definition.steps.iter().map(|step| format!("Output: {}", step.name)))
        .collect();

    let mut lines = Vec::with_capacity(batch.items.len() + 1);
    lines.push(join_row(headers.iter().map(|h| escape_csv_value(h))));
    lines.extend(batch.items.iter().map(|item| item_row(item, definition)));
    lines.join("\n")
}
