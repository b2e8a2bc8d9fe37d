//! Query normalization: extracting structured filters from free text.
//!
//! Recognized patterns are stripped from the query before it reaches the
//! matchers: a content-type synonym ("articles", "clips", "tasks"), a
//! relative date phrase ("yesterday", "this week"), and `#hashtag`
//! tokens. At most one content-type and one date pattern apply: patterns
//! are tried in a fixed priority order and the first match wins. Hashtag
//! extraction is independent and repeatable. There are no error
//! conditions: an absent pattern simply leaves that filter unset.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use synapse_core::{ContentType, Memory, MemoryFilter};

/// A concrete time window resolved from a relative date phrase.
///
/// `from` is always set; `to` is only set for closed phrases like
/// "yesterday". Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: Option<DateTime<Utc>>,
}

/// The outcome of normalizing a raw query.
#[derive(Debug, Clone, Default)]
pub struct NormalizedQuery {
    /// The query text with recognized patterns stripped, lowercased,
    /// whitespace collapsed. May be empty when the query was pure filters.
    pub clean_query: String,
    /// Extracted content-type filter.
    pub content_type: Option<ContentType>,
    /// Extracted date-range filter.
    pub date_range: Option<DateRange>,
    /// Extracted hashtag tokens, `#` removed.
    pub tags: Vec<String>,
}

impl NormalizedQuery {
    /// True when at least one filter was extracted.
    pub fn has_filters(&self) -> bool {
        self.content_type.is_some() || self.date_range.is_some() || !self.tags.is_empty()
    }

    /// True when there is neither query text nor any filter, i.e. nothing
    /// to search by.
    pub fn is_empty(&self) -> bool {
        self.clean_query.is_empty() && !self.has_filters()
    }

    /// Build the repository filter for this query.
    pub fn to_memory_filter(&self, limit: Option<i64>) -> MemoryFilter {
        MemoryFilter {
            content_type: self.content_type,
            created_from: self.date_range.map(|r| r.from),
            created_to: self.date_range.and_then(|r| r.to),
            tags: self.tags.clone(),
            text: if self.clean_query.is_empty() {
                None
            } else {
                Some(self.clean_query.clone())
            },
            limit,
        }
    }

    /// Check a memory against the extracted filters (not the query text).
    /// Used to keep AND semantics across retrieval legs that cannot apply
    /// the filters themselves.
    pub fn filters_match(&self, memory: &Memory) -> bool {
        if let Some(content_type) = self.content_type {
            if memory.content_type != content_type {
                return false;
            }
        }
        if let Some(range) = self.date_range {
            if memory.created_at < range.from {
                return false;
            }
            if let Some(to) = range.to {
                if memory.created_at > to {
                    return false;
                }
            }
        }
        for tag in &self.tags {
            if !memory.tags.iter().any(|t| t.to_lowercase() == *tag) {
                return false;
            }
        }
        true
    }
}

static TYPE_PATTERNS: Lazy<Vec<(Regex, ContentType)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"\b(articles?|posts?|blogs?)\b").unwrap(),
            ContentType::Article,
        ),
        (
            Regex::new(r"\b(videos?|clips?|recordings?)\b").unwrap(),
            ContentType::Video,
        ),
        (
            Regex::new(r"\b(products?|items?|purchases?)\b").unwrap(),
            ContentType::Product,
        ),
        (
            Regex::new(r"\b(notes?|memos?)\b").unwrap(),
            ContentType::Note,
        ),
        (
            Regex::new(r"\b(todos?|tasks?)\b").unwrap(),
            ContentType::Todo,
        ),
    ]
});

/// A date phrase and how to resolve it against "now". Connective words
/// ("from yesterday", "in this week") are swallowed with the phrase so
/// pure-filter queries normalize to an empty clean query.
enum DateWindow {
    Today,
    Yesterday,
    LastDays(i64),
}

static DATE_PATTERNS: Lazy<Vec<(Regex, DateWindow)>> = Lazy::new(|| {
    let prefix = r"(?:(?:from|in|during)\s+)?";
    vec![
        (
            Regex::new(&format!(r"\b{prefix}(?:today|this day)\b")).unwrap(),
            DateWindow::Today,
        ),
        (
            Regex::new(&format!(r"\b{prefix}yesterday\b")).unwrap(),
            DateWindow::Yesterday,
        ),
        (
            Regex::new(&format!(r"\b{prefix}(?:this week|last 7 days?)\b")).unwrap(),
            DateWindow::LastDays(7),
        ),
        (
            Regex::new(&format!(r"\b{prefix}(?:this month|last month|last 30 days?)\b")).unwrap(),
            DateWindow::LastDays(30),
        ),
        (
            Regex::new(&format!(r"\b{prefix}(?:this year|last year)\b")).unwrap(),
            DateWindow::LastDays(365),
        ),
    ]
});

static HASHTAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").unwrap());

fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
}

impl DateWindow {
    fn resolve(&self, now: DateTime<Utc>) -> DateRange {
        match self {
            DateWindow::Today => DateRange {
                from: start_of_day(now),
                to: None,
            },
            DateWindow::Yesterday => DateRange {
                from: start_of_day(now) - Duration::days(1),
                to: Some(start_of_day(now)),
            },
            DateWindow::LastDays(days) => DateRange {
                from: now - Duration::days(*days),
                to: None,
            },
        }
    }
}

/// Normalize a raw query against the given "now".
///
/// Matching is case-insensitive (the query is lowercased up front, which
/// also folds the clean query for the case-insensitive matchers).
pub fn normalize(raw: &str, now: DateTime<Utc>) -> NormalizedQuery {
    let mut clean = raw.to_lowercase();
    let mut content_type = None;
    let mut date_range = None;

    for (pattern, candidate) in TYPE_PATTERNS.iter() {
        if pattern.is_match(&clean) {
            content_type = Some(*candidate);
            clean = pattern.replace(&clean, "").into_owned();
            break;
        }
    }

    for (pattern, window) in DATE_PATTERNS.iter() {
        if pattern.is_match(&clean) {
            date_range = Some(window.resolve(now));
            clean = pattern.replace(&clean, "").into_owned();
            break;
        }
    }

    let mut tags = Vec::new();
    for capture in HASHTAG_PATTERN.captures_iter(&clean) {
        if let Some(tag) = capture.get(1) {
            tags.push(tag.as_str().to_string());
        }
    }
    if !tags.is_empty() {
        clean = HASHTAG_PATTERN.replace_all(&clean, "").into_owned();
    }

    let clean_query = clean.split_whitespace().collect::<Vec<_>>().join(" ");

    NormalizedQuery {
        clean_query,
        content_type,
        date_range,
        tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        // A Wednesday afternoon.
        Utc.with_ymd_and_hms(2026, 3, 4, 15, 30, 0).unwrap()
    }

    #[test]
    fn test_plain_query_passes_through() {
        let normalized = normalize("rust async runtimes", fixed_now());
        assert_eq!(normalized.clean_query, "rust async runtimes");
        assert!(normalized.content_type.is_none());
        assert!(normalized.date_range.is_none());
        assert!(normalized.tags.is_empty());
    }

    #[test]
    fn test_query_is_lowercased() {
        let normalized = normalize("Rust ASYNC", fixed_now());
        assert_eq!(normalized.clean_query, "rust async");
    }

    #[test]
    fn test_content_type_synonyms() {
        for (query, expected) in [
            ("posts about rust", ContentType::Article),
            ("blogs about rust", ContentType::Article),
            ("clips of talks", ContentType::Video),
            ("recordings of talks", ContentType::Video),
            ("purchases last month", ContentType::Product),
            ("memos on planning", ContentType::Note),
            ("tasks for this week", ContentType::Todo),
        ] {
            let normalized = normalize(query, fixed_now());
            assert_eq!(normalized.content_type, Some(expected), "query: {query}");
        }
    }

    #[test]
    fn test_first_type_match_wins() {
        // Both "articles" and "videos" appear; article is tried first.
        let normalized = normalize("articles and videos", fixed_now());
        assert_eq!(normalized.content_type, Some(ContentType::Article));
        // The second pattern is left in the text.
        assert_eq!(normalized.clean_query, "and videos");
    }

    #[test]
    fn test_only_first_date_pattern_applies() {
        let normalized = normalize("today and this week", fixed_now());
        let range = normalized.date_range.unwrap();
        assert_eq!(range.from, start_of_day(fixed_now()));
        assert!(range.to.is_none());
        assert_eq!(normalized.clean_query, "and this week");
    }

    #[test]
    fn test_yesterday_is_a_closed_window() {
        let now = fixed_now();
        let normalized = normalize("yesterday", now);
        let range = normalized.date_range.unwrap();
        assert_eq!(range.from, start_of_day(now) - Duration::days(1));
        assert_eq!(range.to, Some(start_of_day(now)));
    }

    #[test]
    fn test_this_week_is_rolling_seven_days() {
        let now = fixed_now();
        let normalized = normalize("this week", now);
        let range = normalized.date_range.unwrap();
        assert_eq!(range.from, now - Duration::days(7));
        assert!(range.to.is_none());
    }

    #[test]
    fn test_hashtags_extracted_and_stripped() {
        let normalized = normalize("#rust async #tokio runtimes", fixed_now());
        assert_eq!(normalized.tags, vec!["rust", "tokio"]);
        assert_eq!(normalized.clean_query, "async runtimes");
    }

    #[test]
    fn test_whitespace_collapsed_after_stripping() {
        let normalized = normalize("  articles   about   rust  ", fixed_now());
        assert_eq!(normalized.clean_query, "about rust");
    }

    #[test]
    fn test_articles_from_yesterday_scenario() {
        // Canonical normalization scenario: pure-filter query.
        let now = fixed_now();
        let normalized = normalize("articles from yesterday", now);

        assert_eq!(normalized.clean_query, "");
        assert_eq!(normalized.content_type, Some(ContentType::Article));
        let range = normalized.date_range.unwrap();
        assert_eq!(range.from, start_of_day(now) - Duration::days(1));
        assert_eq!(range.to, Some(start_of_day(now)));
        assert!(normalized.has_filters());
        assert!(!normalized.is_empty());
    }

    #[test]
    fn test_yesterday_window_matches_expected_items() {
        use synapse_core::Memory;
        use uuid::Uuid;

        let now = fixed_now();
        let normalized = normalize("articles from yesterday", now);

        let item = |created_at, content_type| Memory {
            id: Uuid::now_v7(),
            owner_id: Uuid::now_v7(),
            title: "t".to_string(),
            content: None,
            url: None,
            selected_text: None,
            content_type,
            tags: Vec::new(),
            created_at,
        };

        // Created yesterday at 15:00, type article: matches.
        let yesterday_article = item(
            start_of_day(now) - Duration::hours(9),
            ContentType::Article,
        );
        assert!(normalized.filters_match(&yesterday_article));

        // Created today: does not match.
        let today_article = item(now, ContentType::Article);
        assert!(!normalized.filters_match(&today_article));

        // Wrong type: does not match.
        let yesterday_note = item(start_of_day(now) - Duration::hours(9), ContentType::Note);
        assert!(!normalized.filters_match(&yesterday_note));
    }

    #[test]
    fn test_empty_query_is_empty() {
        let normalized = normalize("", fixed_now());
        assert!(normalized.is_empty());
        assert!(!normalized.has_filters());
    }

    #[test]
    fn test_is_empty_false_with_only_hashtag() {
        let normalized = normalize("#rust", fixed_now());
        assert_eq!(normalized.clean_query, "");
        assert!(!normalized.is_empty());
    }

    #[test]
    fn test_normalization_is_repeatable() {
        let now = fixed_now();
        let a = normalize("videos from this month #conf", now);
        let b = normalize("videos from this month #conf", now);
        assert_eq!(a.clean_query, b.clean_query);
        assert_eq!(a.content_type, b.content_type);
        assert_eq!(a.date_range, b.date_range);
        assert_eq!(a.tags, b.tags);
    }

    #[test]
    fn test_to_memory_filter_carries_all_fields() {
        let now = fixed_now();
        let normalized = normalize("articles about rust #tokio from yesterday", now);
        let filter = normalized.to_memory_filter(Some(10));

        assert_eq!(filter.content_type, Some(ContentType::Article));
        assert!(filter.created_from.is_some());
        assert!(filter.created_to.is_some());
        assert_eq!(filter.tags, vec!["tokio"]);
        assert_eq!(filter.text.as_deref(), Some("about rust"));
        assert_eq!(filter.limit, Some(10));
    }
}
