//! Item filtering and analytics aggregation.
//!
//! Every function in this module is a pure function of its inputs: the
//! item collection is only ever borrowed, and each call derives a fresh
//! result. Callers recompute whenever the collection or the filter changes.

use crate::models::{AnalyticsSnapshot, FilterState, Item};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};

/// Source label used when an item has no `source`.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Thresholds and limits for the analytics snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsOptions {
    /// Number of collaborators kept in the ranking.
    pub top_collaborators: usize,
    /// Number of recent items kept.
    pub recent_limit: usize,
    /// Width of the recency window in days.
    pub recent_window_days: i64,
    /// Below this many items a "add more documents" hint is emitted.
    pub min_items: usize,
    /// Below this many distinct section keys a "structure" hint is emitted.
    pub min_section_types: usize,
}

impl Default for AnalyticsOptions {
    fn default() -> Self {
        Self {
            top_collaborators: 5,
            recent_limit: 5,
            recent_window_days: 7,
            min_items: 10,
            min_section_types: 3,
        }
    }
}

impl From<&crate::config::AnalyticsConfig> for AnalyticsOptions {
    fn from(config: &crate::config::AnalyticsConfig) -> Self {
        Self {
            top_collaborators: config.top_collaborators,
            recent_limit: config.recent_limit,
            recent_window_days: config.recent_window_days,
            min_items: config.min_items,
            min_section_types: config.min_section_types,
        }
    }
}

pub const RECOMMEND_MORE_ITEMS: &str =
    "Consider adding more documents to build a comprehensive music library";
pub const RECOMMEND_COLLABORATORS: &str =
    "Add collaborator information to improve relationship mapping";
pub const RECOMMEND_SECTIONS: &str =
    "Encourage more structured content with clear sections (Verse, Chorus, etc.)";

/// Select the items matching the search text and category, in input order.
pub fn filter_items<'a>(items: &'a [Item], filter: &FilterState) -> Vec<&'a Item> {
    let needle = filter.search_text.to_lowercase();

    items
        .iter()
        .filter(|item| filter.category.matches(item.source.as_deref()))
        .filter(|item| matches_search(item, &needle))
        .collect()
}

/// Case-insensitive substring match on title or content.
///
/// `needle` must already be lowercase. An item missing either field never
/// matches a non-empty needle.
fn matches_search(item: &Item, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    match (item.title.as_deref(), item.content.as_deref()) {
        (Some(title), Some(content)) => {
            title.to_lowercase().contains(needle) || content.to_lowercase().contains(needle)
        }
        _ => false,
    }
}

/// Compute the analytics snapshot with default options and the current time.
#[allow(dead_code)] // The CLI passes configured options through compute_analytics_at
pub fn compute_analytics(items: &[Item]) -> AnalyticsSnapshot {
    compute_analytics_at(items, &AnalyticsOptions::default(), Utc::now())
}

/// Compute the analytics snapshot relative to `now`.
pub fn compute_analytics_at(
    items: &[Item],
    options: &AnalyticsOptions,
    now: DateTime<Utc>,
) -> AnalyticsSnapshot {
    let mut snapshot = AnalyticsSnapshot {
        total_items: items.len(),
        avg_content_length: average_content_length(items),
        top_collaborators: top_collaborators(items, options.top_collaborators),
        content_type_breakdown: content_type_breakdown(items),
        recent_additions: recent_additions(
            items,
            now,
            options.recent_window_days,
            options.recent_limit,
        ),
        section_stats: section_stats(items),
        recommendations: Vec::new(),
    };

    snapshot.recommendations = generate_recommendations(&snapshot, options);
    snapshot
}

/// Mean content length in characters, rounded half up. Zero for no items.
pub fn average_content_length(items: &[Item]) -> usize {
    if items.is_empty() {
        return 0;
    }

    let total: usize = items.iter().map(Item::content_len).sum();
    (total as f64 / items.len() as f64).round() as usize
}

/// Rank collaborators by number of occurrences.
///
/// Ties keep the order in which names were first seen.
pub fn top_collaborators(items: &[Item], n: usize) -> Vec<(String, usize)> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for name in items
        .iter()
        .filter_map(|item| item.collaborators.as_ref())
        .flatten()
    {
        match positions.get(name.as_str()) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(name.as_str(), counts.len());
                counts.push((name.clone(), 1));
            }
        }
    }

    // sort_by_key is stable, so first-seen order survives among equal counts
    counts.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    counts.truncate(n);
    counts
}

/// Count items per source.
pub fn content_type_breakdown(items: &[Item]) -> BTreeMap<String, usize> {
    let mut breakdown = BTreeMap::new();

    for item in items {
        let source = item.source.as_deref().unwrap_or(UNKNOWN_SOURCE);
        *breakdown.entry(source.to_string()).or_default() += 1;
    }

    breakdown
}

/// Newest items created strictly after `now - window_days`, newest first.
///
/// A window too wide to represent has no lower bound.
pub fn recent_additions(
    items: &[Item],
    now: DateTime<Utc>,
    window_days: i64,
    n: usize,
) -> Vec<Item> {
    let cutoff = Duration::try_days(window_days).and_then(|window| now.checked_sub_signed(window));

    let mut recent: Vec<(DateTime<Utc>, &Item)> = items
        .iter()
        .filter_map(|item| item.created().map(|created| (created, item)))
        .filter(|(created, _)| cutoff.map_or(true, |cutoff| *created > cutoff))
        .collect();

    recent.sort_by_key(|(created, _)| std::cmp::Reverse(*created));
    recent.truncate(n);

    recent.into_iter().map(|(_, item)| item.clone()).collect()
}

/// Count the items carrying each section key.
pub fn section_stats(items: &[Item]) -> BTreeMap<String, usize> {
    let mut stats = BTreeMap::new();

    for sections in items.iter().filter_map(|item| item.sections.as_ref()) {
        for key in sections.keys() {
            *stats.entry(key.to_string()).or_default() += 1;
        }
    }

    stats
}

/// Evaluate the recommendation rules against a snapshot.
pub fn generate_recommendations(
    snapshot: &AnalyticsSnapshot,
    options: &AnalyticsOptions,
) -> Vec<String> {
    let rules: [(bool, &str); 3] = [
        (snapshot.total_items < options.min_items, RECOMMEND_MORE_ITEMS),
        (snapshot.top_collaborators.is_empty(), RECOMMEND_COLLABORATORS),
        (
            snapshot.section_stats.len() < options.min_section_types,
            RECOMMEND_SECTIONS,
        ),
    ];

    rules
        .into_iter()
        .filter(|(fired, _)| *fired)
        .map(|(_, text)| text.to_string())
        .collect()
}

/// Search title, id and section texts for `query`, returning at most `limit`
/// items in collection order.
pub fn search_items<'a>(items: &'a [Item], query: &str, limit: usize) -> Vec<&'a Item> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    items
        .iter()
        .filter(|item| {
            let in_title = item
                .title
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(&needle));
            let in_id = item.id.to_string().to_lowercase().contains(&needle);
            let in_sections = item.sections.as_ref().is_some_and(|sections| {
                sections
                    .values()
                    .any(|text| text.to_lowercase().contains(&needle))
            });
            in_title || in_id || in_sections
        })
        .take(limit)
        .collect()
}

/// Look an item up by id or exact title.
pub fn find_item<'a>(items: &'a [Item], key: &str) -> Option<&'a Item> {
    items
        .iter()
        .find(|item| item.id.to_string() == key || item.title.as_deref() == Some(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn item(id: i64, title: &str, content: &str, source: &str) -> Item {
        Item::new(id, title, content, source)
    }

    fn with_collaborators(mut item: Item, names: &[&str]) -> Item {
        item.collaborators = Some(names.iter().map(|n| n.to_string()).collect());
        item
    }

    fn with_sections(mut item: Item, keys: &[&str]) -> Item {
        item.sections = Some(
            keys.iter()
                .map(|k| (k.to_string(), format!("{} text", k)))
                .collect(),
        );
        item
    }

    fn created(mut item: Item, at: DateTime<Utc>) -> Item {
        item.created_at = Some(at.to_rfc3339());
        item
    }

    fn sample() -> Vec<Item> {
        vec![
            item(1, "Hello", "first verse about love", "lyrics"),
            item(2, "Liner notes", "Recorded in one take", "document"),
            item(3, "Night Drive", "HELLO darkness", "lyrics"),
            item(4, "Session log", "mix notes", "document"),
        ]
    }

    fn ids(items: &[&Item]) -> Vec<String> {
        items.iter().map(|i| i.id.to_string()).collect()
    }

    #[test]
    fn test_empty_filter_returns_everything_in_order() {
        let items = sample();
        let filtered = filter_items(&items, &FilterState::default());
        assert_eq!(ids(&filtered), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_documents_category_selects_document_source() {
        let mut items = sample();
        items.push(item(5, "Other", "x", "documents"));
        let filtered = filter_items(&items, &FilterState::new("", Category::Documents));
        assert_eq!(ids(&filtered), vec!["2", "4"]);
        assert!(filtered
            .iter()
            .all(|i| i.source.as_deref() == Some("document")));
    }

    #[test]
    fn test_search_is_case_insensitive_on_title_and_content() {
        let items = sample();
        let filtered = filter_items(&items, &FilterState::new("hello", Category::All));
        assert_eq!(ids(&filtered), vec!["1", "3"]);

        let filtered = filter_items(&items, &FilterState::new("NOTES", Category::All));
        assert_eq!(ids(&filtered), vec!["2", "4"]);
    }

    #[test]
    fn test_search_and_category_combine() {
        let items = sample();
        let filtered = filter_items(&items, &FilterState::new("notes", Category::Lyrics));
        assert!(filtered.is_empty());

        let filtered = filter_items(&items, &FilterState::new("hello", Category::Lyrics));
        assert_eq!(ids(&filtered), vec!["1", "3"]);
    }

    #[test]
    fn test_malformed_items_never_match_search() {
        let mut broken = item(9, "hello", "", "lyrics");
        broken.content = None;
        let mut untitled = item(10, "", "hello", "lyrics");
        untitled.title = None;
        let items = vec![broken, untitled];

        assert!(filter_items(&items, &FilterState::new("hello", Category::All)).is_empty());
        assert_eq!(filter_items(&items, &FilterState::default()).len(), 2);
    }

    #[test]
    fn test_empty_collection_yields_zeroed_snapshot() {
        let snapshot = compute_analytics(&[]);
        assert_eq!(snapshot.total_items, 0);
        assert_eq!(snapshot.avg_content_length, 0);
        assert!(snapshot.top_collaborators.is_empty());
        assert!(snapshot.content_type_breakdown.is_empty());
        assert!(snapshot.recent_additions.is_empty());
        assert!(snapshot.section_stats.is_empty());
    }

    #[test]
    fn test_average_and_top_collaborators() {
        let items = vec![
            with_collaborators(item(1, "a", "aaaa", "lyrics"), &["X", "Y"]),
            with_collaborators(item(2, "b", "bb", "lyrics"), &["X"]),
        ];
        let snapshot = compute_analytics(&items);
        assert_eq!(snapshot.avg_content_length, 3);
        assert_eq!(
            snapshot.top_collaborators,
            vec![("X".to_string(), 2), ("Y".to_string(), 1)]
        );
    }

    #[test]
    fn test_average_rounds_half_up() {
        let items = vec![item(1, "a", "a", "lyrics"), item(2, "b", "bb", "lyrics")];
        assert_eq!(average_content_length(&items), 2);
    }

    #[test]
    fn test_collaborator_ties_keep_first_seen_order() {
        let items = vec![
            with_collaborators(item(1, "a", "", "lyrics"), &["Zed", "Amy"]),
            with_collaborators(item(2, "b", "", "lyrics"), &["Bob", "Amy", "Zed"]),
            with_collaborators(item(3, "c", "", "lyrics"), &["Bob"]),
        ];
        let top = top_collaborators(&items, 5);
        let names: Vec<&str> = top.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Zed", "Amy", "Bob"]);
        assert!(top.iter().all(|(_, c)| *c == 2));
    }

    #[test]
    fn test_top_collaborators_capped_at_five() {
        let names = ["a", "b", "c", "d", "e", "f", "g"];
        let items = vec![with_collaborators(item(1, "t", "", "lyrics"), &names)];
        assert_eq!(top_collaborators(&items, 5).len(), 5);
    }

    #[test]
    fn test_missing_collaborators_contribute_nothing() {
        let items = vec![
            item(1, "a", "", "lyrics"),
            with_collaborators(item(2, "b", "", "lyrics"), &["X"]),
        ];
        assert_eq!(top_collaborators(&items, 5), vec![("X".to_string(), 1)]);
    }

    #[test]
    fn test_content_type_breakdown_counts_sources() {
        let mut items = sample();
        items[0].source = None;
        let breakdown = content_type_breakdown(&items);
        assert_eq!(breakdown.get("document"), Some(&2));
        assert_eq!(breakdown.get("lyrics"), Some(&1));
        assert_eq!(breakdown.get(UNKNOWN_SOURCE), Some(&1));
    }

    #[test]
    fn test_recent_additions_window() {
        let now = Utc::now();
        let mut invalid = item(4, "bad date", "", "lyrics");
        invalid.created_at = Some("not a date".to_string());
        let items = vec![
            created(item(1, "old", "", "lyrics"), now - Duration::days(10)),
            created(item(2, "yesterday", "", "lyrics"), now - Duration::days(1)),
            created(item(3, "today", "", "lyrics"), now - Duration::hours(1)),
            invalid,
            item(5, "no date", "", "lyrics"),
        ];

        let snapshot = compute_analytics_at(&items, &AnalyticsOptions::default(), now);
        let titles: Vec<String> = snapshot
            .recent_additions
            .iter()
            .map(Item::display_title)
            .collect();
        assert_eq!(titles, vec!["today", "yesterday"]);
    }

    #[test]
    fn test_recent_additions_boundary_is_exclusive() {
        let now = Utc::now();
        let items = vec![created(item(1, "edge", "", "lyrics"), now - Duration::days(7))];
        assert!(recent_additions(&items, now, 7, 5).is_empty());
    }

    #[test]
    fn test_recent_additions_capped_and_sorted() {
        let now = Utc::now();
        let items: Vec<Item> = (0..8)
            .map(|h| created(item(h, &format!("t{}", h), "", "lyrics"), now - Duration::hours(h)))
            .collect();
        let recent = recent_additions(&items, now, 7, 5);
        let ids: Vec<String> = recent.iter().map(|i| i.id.to_string()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn test_section_stats_counts_items_per_key() {
        let items = vec![
            with_sections(item(1, "a", "", "lyrics"), &["verse_1", "chorus"]),
            with_sections(item(2, "b", "", "lyrics"), &["chorus", "body"]),
            item(3, "c", "", "lyrics"),
        ];
        let stats = section_stats(&items);
        assert_eq!(stats.get("chorus"), Some(&2));
        assert_eq!(stats.get("verse_1"), Some(&1));
        assert_eq!(stats.get("body"), Some(&1));
        assert_eq!(stats.len(), 3);
    }

    #[test]
    fn test_recommendations_for_sparse_collection() {
        let snapshot = compute_analytics(&sample());
        assert_eq!(
            snapshot.recommendations,
            vec![
                RECOMMEND_MORE_ITEMS.to_string(),
                RECOMMEND_COLLABORATORS.to_string(),
                RECOMMEND_SECTIONS.to_string(),
            ]
        );
    }

    #[test]
    fn test_no_recommendations_for_rich_collection() {
        let items: Vec<Item> = (0..12)
            .map(|i| {
                let base = item(i, "t", "c", "lyrics");
                with_sections(with_collaborators(base, &["X"]), &["verse", "chorus", "bridge"])
            })
            .collect();
        assert!(compute_analytics(&items).recommendations.is_empty());
    }

    #[test]
    fn test_aggregation_does_not_mutate_and_is_repeatable() {
        let now = Utc::now();
        let items = vec![
            created(
                with_sections(with_collaborators(item(1, "a", "aaa", "lyrics"), &["X"]), &["v"]),
                now - Duration::days(1),
            ),
            item(2, "b", "bb", "document"),
        ];
        let before = items.clone();
        let options = AnalyticsOptions::default();

        let first = compute_analytics_at(&items, &options, now);
        let second = compute_analytics_at(&items, &options, now);
        assert_eq!(first, second);

        let filter = FilterState::new("a", Category::All);
        assert_eq!(filter_items(&items, &filter), filter_items(&items, &filter));
        assert_eq!(items, before);
    }

    #[test]
    fn test_search_items_matches_sections_and_id() {
        let items = vec![
            with_sections(item(1, "Untitled", "", "lyrics"), &["chorus"]),
            item(2, "Midnight", "", "lyrics"),
            Item::new("data/lyrics/midnight.txt", "Other", "", "lyrics"),
        ];
        assert_eq!(ids(&search_items(&items, "CHORUS TEXT", 10)), vec!["1"]);
        assert_eq!(ids(&search_items(&items, "midnight", 10)).len(), 2);
        assert_eq!(search_items(&items, "midnight", 1).len(), 1);
        assert!(search_items(&items, "", 10).is_empty());
    }

    #[test]
    fn test_find_item_by_id_or_title() {
        let items = sample();
        assert_eq!(find_item(&items, "3").map(|i| i.id.to_string()), Some("3".into()));
        assert_eq!(
            find_item(&items, "Liner notes").map(|i| i.id.to_string()),
            Some("2".into())
        );
        assert!(find_item(&items, "liner notes").is_none());
    }

    #[test]
    fn test_huge_recency_window_has_no_lower_bound() {
        let now = Utc::now();
        let items = vec![
            created(item(1, "old", "x", "lyrics"), now - Duration::days(3650)),
            created(item(2, "new", "x", "lyrics"), now - Duration::days(1)),
        ];
        let options = AnalyticsOptions {
            recent_window_days: 1_000_000_000,
            ..Default::default()
        };

        let snapshot = compute_analytics_at(&items, &options, now);
        let recent: Vec<String> = snapshot
            .recent_additions
            .iter()
            .map(|i| i.id.to_string())
            .collect();
        assert_eq!(recent, vec!["2", "1"]);
    }
}
