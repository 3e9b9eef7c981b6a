//! Writing exports and reports to disk.
//!
//! Exports are named after their kind and the current date, e.g.
//! `music-index-full-export-2024-06-01.json`.

use crate::models::Item;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// What an exported file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Every fetched item.
    FullExport,
    /// Items matching the current filter.
    FilteredExport,
    /// JSON analytics report.
    AnalyticsReport,
    /// Markdown analytics report.
    AnalyticsReportMarkdown,
}

impl ExportKind {
    fn prefix(&self) -> &'static str {
        match self {
            ExportKind::FullExport => "music-index-full-export",
            ExportKind::FilteredExport => "music-index-filtered-export",
            ExportKind::AnalyticsReport | ExportKind::AnalyticsReportMarkdown => {
                "analytics-report"
            }
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            ExportKind::AnalyticsReportMarkdown => "md",
            _ => "json",
        }
    }

    /// File name for an export made on `date`.
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!(
            "{}-{}.{}",
            self.prefix(),
            date.format("%Y-%m-%d"),
            self.extension()
        )
    }
}

/// Serialize items as pretty-printed JSON.
pub fn items_to_json<T: serde::Serialize>(items: &[T]) -> Result<String> {
    serde_json::to_string_pretty(items).context("Failed to serialize items")
}

/// Write `content` into `dir` under the dated name for `kind`.
pub fn write_export(dir: &Path, kind: ExportKind, date: NaiveDate, content: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let path = dir.join(kind.file_name(date));
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Wrote {:?} to {}", kind, path.display());
    Ok(path)
}

/// Export a list of items as JSON.
pub fn export_items(dir: &Path, kind: ExportKind, date: NaiveDate, items: &[&Item]) -> Result<PathBuf> {
    let content = items_to_json(items)?;
    write_export(dir, kind, date, &content)
}
