//! Index payload ingestion.
//!
//! Turns the JSON body returned by the index endpoint into a list of
//! [`Item`]s, validating the envelope and counting entries that do not
//! meet the item contract.

use crate::models::Item;
use crate::source::FetchError;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Counters collected while ingesting a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Entries found in the envelope.
    pub received: usize,
    /// Entries kept as items.
    pub accepted: usize,
    /// Kept items missing `title` or `content`, or carrying wrongly typed
    /// optional fields.
    pub malformed: usize,
    /// Entries dropped because they could not be read as items.
    pub skipped: usize,
    /// Kept items whose id was already seen.
    pub duplicate_ids: usize,
}

impl IngestSummary {
    /// True when every entry met the item contract.
    pub fn is_clean(&self) -> bool {
        self.malformed == 0 && self.skipped == 0 && self.duplicate_ids == 0
    }
}

/// A fully ingested index.
#[derive(Debug, Clone)]
pub struct IndexLoad {
    /// Items in payload order.
    pub items: Vec<Item>,
    /// Build timestamp reported by the index, if any.
    pub generated_at: Option<String>,
    /// Ingestion counters.
    pub summary: IngestSummary,
}

/// Parse a raw response body.
pub fn parse_index(body: &str) -> Result<IndexLoad, FetchError> {
    let value: Value = serde_json::from_str(body).map_err(FetchError::MalformedBody)?;
    ingest_value(value)
}

/// Ingest an already decoded JSON document.
///
/// Accepts `{"data": [...]}`, `{"items": [...]}` or a bare array.
pub fn ingest_value(value: Value) -> Result<IndexLoad, FetchError> {
    let (entries, generated_at) = extract_entries(value)?;

    let mut summary = IngestSummary {
        received: entries.len(),
        ..Default::default()
    };
    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(entries.len());

    for (position, entry) in entries.into_iter().enumerate() {
        let bad_fields = invalid_fields(&entry);
        let item: Item = match serde_json::from_value(entry) {
            Ok(item) => item,
            Err(e) => {
                warn!("Skipping index entry #{}: {}", position, e);
                summary.skipped += 1;
                continue;
            }
        };

        if item.is_malformed() || !bad_fields.is_empty() {
            debug!(
                "Item {} is missing title or content or has invalid fields {:?}",
                item.id, bad_fields
            );
            summary.malformed += 1;
        }

        if !seen.insert(item.id.clone()) {
            debug!("Duplicate item id {}", item.id);
            summary.duplicate_ids += 1;
        }

        items.push(item);
    }

    summary.accepted = items.len();

    Ok(IndexLoad {
        items,
        generated_at,
        summary,
    })
}

fn extract_entries(value: Value) -> Result<(Vec<Value>, Option<String>), FetchError> {
    match value {
        Value::Array(entries) => Ok((entries, None)),
        Value::Object(mut map) => {
            let generated_at = map
                .get("generated_at")
                .and_then(Value::as_str)
                .map(String::from);

            for key in ["data", "items"] {
                match map.remove(key) {
                    Some(Value::Array(entries)) => return Ok((entries, generated_at)),
                    Some(other) => {
                        return Err(FetchError::UnexpectedShape(format!(
                            "field '{}' is {}, expected an array",
                            key,
                            json_kind(&other)
                        )))
                    }
                    None => continue,
                }
            }

            Err(FetchError::UnexpectedShape(
                "object has neither 'data' nor 'items'".to_string(),
            ))
        }
        other => Err(FetchError::UnexpectedShape(format!(
            "top-level value is {}",
            json_kind(&other)
        ))),
    }
}

const STRING_FIELDS: [&str; 5] = ["title", "content", "source", "created_at", "path"];
const LIST_FIELDS: [&str; 2] = ["collaborators", "themes"];

/// Names of optional fields present with the wrong type. Such fields are
/// read as absent (or lose their bad elements) when the item is decoded.
fn invalid_fields(entry: &Value) -> Vec<&'static str> {
    let Some(map) = entry.as_object() else {
        return Vec::new();
    };

    let mut invalid = Vec::new();
    for field in STRING_FIELDS {
        if map.get(field).is_some_and(|v| !v.is_null() && !v.is_string()) {
            invalid.push(field);
        }
    }
    for field in LIST_FIELDS {
        let bad = match map.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::Array(values)) => values.iter().any(|v| !v.is_string()),
            Some(_) => true,
        };
        if bad {
            invalid.push(field);
        }
    }
    let bad_sections = match map.get("sections") {
        None | Some(Value::Null) => false,
        Some(Value::Object(sections)) => sections.values().any(|v| !v.is_string()),
        Some(_) => true,
    };
    if bad_sections {
        invalid.push("sections");
    }

    invalid
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
