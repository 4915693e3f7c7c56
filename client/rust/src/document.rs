//! Input documents for create and update commands.
//!
//! A source is a file path, `-` for standard input, or inline JSON. The
//! text is read as one JSON document when it parses as JSON, otherwise as
//! YAML with `---`-separated documents applied in order.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Source argument meaning standard input.
pub const STDIN: &str = "-";

/// Read and parse every document named by `source`.
pub fn load(source: &str) -> Result<Vec<Value>> {
    let text = if source == STDIN {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else if source.trim_start().starts_with('{') && !Path::new(source).exists() {
        source.to_string()
    } else {
        std::fs::read_to_string(source)?
    };
    parse(&text)
}

/// Parse JSON or multi-document YAML text.
pub fn parse(text: &str) -> Result<Vec<Value>> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return single(value);
    }

    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document)?;
        // Blank documents, e.g. a leading `---`.
        if value.is_null() {
            continue;
        }
        documents.push(expect_object(value)?);
    }

    if documents.is_empty() {
        return Err(ClientError::Document("no documents found".to_string()));
    }
    Ok(documents)
}

fn single(value: Value) -> Result<Vec<Value>> {
    Ok(vec![expect_object(value)?])
}

fn expect_object(value: Value) -> Result<Value> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(ClientError::Document(format!(
            "expected a mapping, got {}",
            value
        )))
    }
}
