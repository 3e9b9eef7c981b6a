//! Data models for the music index client.
//!
//! This module contains the core data structures used throughout
//! the application for representing index items, filter state,
//! analytics snapshots and reports.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of an index item.
///
/// The index builder emits string ids (relative file paths), older
/// exports use integers. Both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Number(n) => write!(f, "{}", n),
            ItemId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(n: i64) -> Self {
        ItemId::Number(n)
    }
}

impl From<i32> for ItemId {
    fn from(n: i32) -> Self {
        ItemId::Number(i64::from(n))
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::Text(s.to_string())
    }
}

/// A single indexed document or lyrics entry.
///
/// Only `id` is required. Wrongly typed optional fields read as absent
/// instead of rejecting the whole entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier, unique within one fetched collection.
    pub id: ItemId,
    /// Display title.
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: Option<String>,
    /// Full text body.
    #[serde(default, deserialize_with = "lenient::string")]
    pub content: Option<String>,
    /// Categorical tag (`"document"`, `"lyrics"`, ...).
    #[serde(default, deserialize_with = "lenient::string")]
    pub source: Option<String>,
    /// Named contributors, in the order the indexer found them.
    #[serde(
        default,
        deserialize_with = "lenient::string_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub collaborators: Option<Vec<String>>,
    /// ISO-8601 creation timestamp.
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
    /// Named section texts (e.g. `verse_1`), in document order.
    #[serde(
        default,
        deserialize_with = "lenient::sections",
        skip_serializing_if = "Option::is_none"
    )]
    pub sections: Option<Sections>,
    /// Path of the source file on the indexing host.
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub path: Option<String>,
    /// Detected themes.
    #[serde(
        default,
        deserialize_with = "lenient::string_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub themes: Option<Vec<String>>,
}

/// Section name to section text, kept in the order the index lists them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections(Vec<(String, String)>);

impl Sections {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, text)| (name.as_str(), text.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, text)| text.as_str())
    }
}

impl FromIterator<(String, String)> for Sections {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Sections(iter.into_iter().collect())
    }
}

impl Serialize for Sections {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, text) in &self.0 {
            map.serialize_entry(name, text)?;
        }
        map.end()
    }
}

/// Deserializers that map a wrongly typed value to `None` and drop
/// non-string elements.
mod lenient {
    use super::Sections;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(de)? {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
    }

    pub fn string_list<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<String>>, D::Error> {
        Ok(match Option::<Value>::deserialize(de)? {
            Some(Value::Array(values)) => Some(values.into_iter().filter_map(into_string).collect()),
            _ => None,
        })
    }

    pub fn sections<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Sections>, D::Error> {
        Ok(match Option::<Value>::deserialize(de)? {
            Some(Value::Object(map)) => Some(
                map.into_iter()
                    .filter_map(|(name, text)| into_string(text).map(|text| (name, text)))
                    .collect(),
            ),
            _ => None,
        })
    }

    fn into_string(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Item {
    /// Creates an item with the required fields and no optional metadata.
    #[cfg(test)]
    pub fn new(id: impl Into<ItemId>, title: &str, content: &str, source: &str) -> Self {
        Self {
            id: id.into(),
            title: Some(title.to_string()),
            content: Some(content.to_string()),
            source: Some(source.to_string()),
            collaborators: None,
            created_at: None,
            sections: None,
            path: None,
            themes: None,
        }
    }

    /// True when `title` or `content` is missing.
    pub fn is_malformed(&self) -> bool {
        self.title.is_none() || self.content.is_none()
    }

    /// Length of the content in characters (0 when absent).
    pub fn content_len(&self) -> usize {
        self.content.as_deref().map_or(0, |c| c.chars().count())
    }

    /// Parsed creation time, if present and valid.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    /// Title for display, falling back to the id.
    pub fn display_title(&self) -> String {
        match self.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t.to_string(),
            _ => self.id.to_string(),
        }
    }

    /// Returns the first `max_chars` characters of the content, with an
    /// ellipsis when it was cut.
    pub fn preview(&self, max_chars: usize) -> String {
        let content = self.content.as_deref().unwrap_or("");
        match content.char_indices().nth(max_chars) {
            Some((idx, _)) => format!("{}...", &content[..idx]),
            None => content.to_string(),
        }
    }
}

/// Parse an index timestamp.
///
/// Accepts RFC 3339, naive date-times (taken as UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Category selected in the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Every item
    #[default]
    All,
    /// Items whose source is `document`
    Documents,
    /// Items whose source is `lyrics`
    Lyrics,
}

impl Category {
    /// The `source` value this category selects, `None` for `All`.
    pub fn source_tag(&self) -> Option<&'static str> {
        match self {
            Category::All => None,
            Category::Documents => Some("document"),
            Category::Lyrics => Some("lyrics"),
        }
    }

    /// Whether an item with the given source belongs to this category.
    pub fn matches(&self, source: Option<&str>) -> bool {
        match self.source_tag() {
            None => true,
            Some(tag) => source == Some(tag),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::All => write!(f, "all"),
            Category::Documents => write!(f, "documents"),
            Category::Lyrics => write!(f, "lyrics"),
        }
    }
}

/// Current search and category selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub search_text: String,
    pub category: Category,
}

impl FilterState {
    pub fn new(search_text: impl Into<String>, category: Category) -> Self {
        Self {
            search_text: search_text.into(),
            category,
        }
    }
}

/// Summary statistics derived from an item collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    /// Number of items.
    pub total_items: usize,
    /// Mean content length in characters, rounded.
    pub avg_content_length: usize,
    /// Most frequent collaborators with their occurrence counts.
    pub top_collaborators: Vec<(String, usize)>,
    /// Item count per source.
    pub content_type_breakdown: BTreeMap<String, usize>,
    /// Newest items inside the recency window.
    pub recent_additions: Vec<Item>,
    /// Number of items carrying each section key.
    pub section_stats: BTreeMap<String, usize>,
    /// Suggestions for improving the collection.
    pub recommendations: Vec<String>,
}

/// Exportable analytics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Index endpoint the data came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// The analytics snapshot.
    pub summary: AnalyticsSnapshot,
}
