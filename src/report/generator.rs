//! Analytics report generation.
//!
//! Wraps an [`AnalyticsSnapshot`] into an exportable [`AnalyticsReport`]
//! and renders it as JSON or Markdown.

use crate::models::{AnalyticsReport, AnalyticsSnapshot, Item};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Build a report stamped with the current time.
pub fn generate_report(snapshot: &AnalyticsSnapshot, source_url: Option<&str>) -> AnalyticsReport {
    generate_report_at(snapshot, source_url, Utc::now())
}

/// Build a report stamped with `generated_at`.
pub fn generate_report_at(
    snapshot: &AnalyticsSnapshot,
    source_url: Option<&str>,
    generated_at: DateTime<Utc>,
) -> AnalyticsReport {
    AnalyticsReport {
        generated_at,
        source_url: source_url.map(String::from),
        summary: snapshot.clone(),
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalyticsReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalyticsReport) -> String {
    let mut output = String::new();

    output.push_str("# Music Index Analytics Report\n\n");
    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_summary_section(&report.summary));
    output.push_str(&generate_collaborators_section(&report.summary.top_collaborators));
    output.push_str(&generate_recent_section(&report.summary.recent_additions));
    output.push_str(&generate_recommendations_section(
        &report.summary.recommendations,
    ));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(report: &AnalyticsReport) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(ref url) = report.source_url {
        section.push_str(&format!("- **Index:** {}\n", url));
    }
    section.push('\n');

    section
}

fn generate_summary_section(summary: &AnalyticsSnapshot) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Total Items | Avg Content Length | Section Types |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} chars | {} |\n\n",
        summary.total_items,
        summary.avg_content_length,
        summary.section_stats.len()
    ));

    if !summary.content_type_breakdown.is_empty() {
        section.push_str("### Content Types\n\n");
        section.push_str("| Source | Items |\n");
        section.push_str("|:---|:---:|\n");

        let mut types: Vec<_> = summary.content_type_breakdown.iter().collect();
        types.sort_by_key(|(_, count)| std::cmp::Reverse(**count));

        for (source, count) in types {
            section.push_str(&format!("| {} | {} |\n", source, count));
        }
        section.push('\n');
    }

    if !summary.section_stats.is_empty() {
        section.push_str("### Sections\n\n");
        section.push_str("| Section | Items |\n");
        section.push_str("|:---|:---:|\n");

        let mut sections: Vec<_> = summary.section_stats.iter().collect();
        sections.sort_by_key(|(_, count)| std::cmp::Reverse(**count));

        for (name, count) in sections {
            section.push_str(&format!("| `{}` | {} |\n", name, count));
        }
        section.push('\n');
    }

    section
}

fn generate_collaborators_section(collaborators: &[(String, usize)]) -> String {
    if collaborators.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Top Collaborators\n\n");
    section.push_str("| Rank | Name | Items |\n");
    section.push_str("|:---:|:---|:---:|\n");

    for (rank, (name, count)) in collaborators.iter().enumerate() {
        section.push_str(&format!("| #{} | {} | {} |\n", rank + 1, name, count));
    }
    section.push('\n');

    section
}

fn generate_recent_section(recent: &[Item]) -> String {
    if recent.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Recent Additions\n\n");
    for item in recent {
        let date = item
            .created()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        section.push_str(&format!("- {} ({})\n", item.display_title(), date));
    }
    section.push('\n');

    section
}

fn generate_recommendations_section(recommendations: &[String]) -> String {
    if recommendations.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Recommendations\n\n");
    for (i, rec) in recommendations.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, rec));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by music-index*\n".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_snapshot() -> AnalyticsSnapshot {
        let mut recent = Item::new(1, "Night Drive", "lyrics body", "lyrics");
        recent.created_at = Some("2024-06-01T08:00:00Z".to_string());

        AnalyticsSnapshot {
            total_items: 3,
            avg_content_length: 120,
            top_collaborators: vec![("Emily".to_string(), 2), ("Sam".to_string(), 1)],
            content_type_breakdown: [("lyrics".to_string(), 2), ("document".to_string(), 1)]
                .into_iter()
                .collect(),
            recent_additions: vec![recent],
            section_stats: [("chorus".to_string(), 2)].into_iter().collect(),
            recommendations: vec!["Add more".to_string()],
        }
    }

    #[test]
    fn test_generate_report_wraps_snapshot() {
        let snapshot = create_test_snapshot();
        let at = Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap();
        let report = generate_report_at(&snapshot, Some("http://localhost:8000/api/index"), at);

        assert_eq!(report.generated_at, at);
        assert_eq!(report.summary, snapshot);
        assert_eq!(
            report.source_url.as_deref(),
            Some("http://localhost:8000/api/index")
        );
    }

    #[test]
    fn test_generate_json_report() {
        let report = generate_report(&create_test_snapshot(), None);
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"generated_at\""));
        assert!(json.contains("\"totalItems\": 3"));
        assert!(json.contains("\"recommendations\""));
        assert!(!json.contains("source_url"));

        let parsed: AnalyticsReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.summary.top_collaborators[0], ("Emily".to_string(), 2));
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = generate_report(&create_test_snapshot(), Some("http://idx"));
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Music Index Analytics Report"));
        assert!(markdown.contains("- **Index:** http://idx"));
        assert!(markdown.contains("| 3 | 120 chars | 1 |"));
        assert!(markdown.contains("| #1 | Emily | 2 |"));
        assert!(markdown.contains("- Night Drive (2024-06-01)"));
        assert!(markdown.contains("1. Add more"));
    }

    #[test]
    fn test_markdown_omits_empty_sections() {
        let report = generate_report(&AnalyticsSnapshot::default(), None);
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("## Summary"));
        assert!(!markdown.contains("## Top Collaborators"));
        assert!(!markdown.contains("## Recent Additions"));
        assert!(!markdown.contains("## Recommendations"));
    }
}
