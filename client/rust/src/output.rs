//! Table output for records.

use std::collections::BTreeSet;

use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Columns never shown in tables.
pub const HIDDEN_COLUMNS: &[&str] = &["row_id", "surrogate_id"];

/// Columns shown first, in this order, when present.
const LEADING_COLUMNS: &[&str] = &["urn", "name", "version", "active"];

/// Columns shown last, in this order, when present.
const TRAILING_COLUMNS: &[&str] = &["created", "modified", "deleted"];

/// Render records as a table. Attribute columns are sorted by name between
/// the identity and audit columns.
pub fn table(records: &[Value]) -> String {
    let present: BTreeSet<&str> = records
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|record| record.keys().map(String::as_str))
        .filter(|key| !HIDDEN_COLUMNS.contains(key))
        .collect();

    let mut headers: Vec<&str> = LEADING_COLUMNS
        .iter()
        .copied()
        .filter(|c| present.contains(c))
        .collect();
    headers.extend(
        present
            .iter()
            .copied()
            .filter(|c| !LEADING_COLUMNS.contains(c) && !TRAILING_COLUMNS.contains(c)),
    );
    headers.extend(
        TRAILING_COLUMNS
            .iter()
            .copied()
            .filter(|c| present.contains(c)),
    );

    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|h| h.to_string()));
    for record in records {
        builder.push_record(headers.iter().map(|h| cell(record.get(*h))));
    }
    builder.build().with(Style::psql()).to_string()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
