// src/ingest/mod.rs
pub mod fetcher;
pub mod normalize;
pub mod types;

use std::time::{Duration, Instant};

use feed_rs::model::Feed;
use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::error::{FetchCause, FetchError};
use crate::filter::{cap, matches_query};
use crate::ingest::normalize::{normalize, MalformedEntry};
use crate::ingest::types::{
    AggregationResult, FeedFetcher, NewsItem, Source, SourceWarning, WarningKind,
};

/// Raw entries considered per source, before any filtering.
pub const PER_SOURCE_LIMIT: usize = 5;
/// Items kept per round across all sources.
pub const TOTAL_LIMIT: usize = 25;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub per_source: usize,
    pub total: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            per_source: PER_SOURCE_LIMIT,
            total: TOTAL_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSettings {
    pub limits: Limits,
    pub fetch_timeout: Duration,
    pub max_concurrent: usize,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_concurrent: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

/// What one source contributed to a round.
#[derive(Debug, Clone)]
pub enum SourceOutcome {
    Fetched {
        source: String,
        items: Vec<NewsItem>,
        malformed: Vec<MalformedEntry>,
    },
    /// Reachable, valid feed, zero entries.
    Empty { source: String },
    Failed(FetchError),
}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_rounds_total", "Aggregation rounds executed.");
        describe_counter!(
            "news_items_kept_total",
            "Items kept after query filter and cap."
        );
        describe_counter!(
            "news_source_errors_total",
            "Sources that failed or timed out."
        );
        describe_counter!("news_source_empty_total", "Sources that returned no entries.");
        describe_counter!(
            "news_entries_malformed_total",
            "Entries skipped because they could not be normalized."
        );
        describe_counter!("news_cache_hits_total", "Requests served from the cache.");
        describe_counter!(
            "news_cache_misses_total",
            "Requests that ran an aggregation round."
        );
        describe_histogram!("news_fetch_ms", "Per-source fetch time in milliseconds.");
    });
}

/// Normalize the first `per_source` entries of `feed` and apply the query.
///
/// Malformed entries still use up one of the `per_source` slots.
pub fn normalize_entries(
    feed: &Feed,
    source: &str,
    query: Option<&str>,
    per_source: usize,
) -> (Vec<NewsItem>, Vec<MalformedEntry>) {
    let mut items = Vec::new();
    let mut malformed = Vec::new();
    for entry in feed.entries.iter().take(per_source) {
        match normalize(entry, source) {
            Ok(item) if matches_query(&item, query) => items.push(item),
            Ok(_) => {}
            Err(e) => malformed.push(e),
        }
    }
    (items, malformed)
}

/// Fetch + normalize one source, bounded by the fetch timeout.
pub async fn fetch_source(
    fetcher: &dyn FeedFetcher,
    source: &Source,
    query: Option<&str>,
    settings: &RoundSettings,
) -> SourceOutcome {
    let t0 = Instant::now();
    let fetched = tokio::time::timeout(settings.fetch_timeout, fetcher.fetch(source)).await;
    histogram!("news_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    let feed = match fetched {
        Ok(Ok(feed)) => feed,
        Ok(Err(e)) => return SourceOutcome::Failed(e),
        Err(_) => {
            return SourceOutcome::Failed(FetchError::new(
                &source.name,
                FetchCause::Timeout(settings.fetch_timeout),
            ))
        }
    };

    if feed.entries.is_empty() {
        return SourceOutcome::Empty {
            source: source.name.clone(),
        };
    }

    let (items, malformed) =
        normalize_entries(&feed, &source.name, query, settings.limits.per_source);
    SourceOutcome::Fetched {
        source: source.name.clone(),
        items,
        malformed,
    }
}

/// Concatenate outcomes in the given order, collect warnings, apply the cap.
pub fn merge_outcomes(outcomes: Vec<SourceOutcome>, total: usize) -> AggregationResult {
    let mut items = Vec::new();
    let mut warnings = Vec::new();

    for outcome in outcomes {
        match outcome {
            SourceOutcome::Fetched {
                source,
                items: mut got,
                malformed,
            } => {
                for m in malformed {
                    tracing::warn!(source = %source, entry = %m.entry_id, reason = m.reason, "malformed entry skipped");
                    counter!("news_entries_malformed_total").increment(1);
                    warnings.push(SourceWarning {
                        source: source.clone(),
                        kind: WarningKind::MalformedEntry,
                        detail: m.to_string(),
                    });
                }
                items.append(&mut got);
            }
            SourceOutcome::Empty { source } => {
                tracing::warn!(source = %source, "source returned no entries");
                counter!("news_source_empty_total").increment(1);
                warnings.push(SourceWarning {
                    source,
                    kind: WarningKind::EmptySource,
                    detail: "returned empty or invalid format".to_string(),
                });
            }
            SourceOutcome::Failed(e) => {
                tracing::warn!(source = %e.source_id, error = %e.cause, "source fetch failed");
                counter!("news_source_errors_total").increment(1);
                warnings.push(SourceWarning {
                    source: e.source_id.clone(),
                    kind: WarningKind::FetchFailed,
                    detail: e.cause.to_string(),
                });
            }
        }
    }

    let items = cap(items, total);
    AggregationResult {
        items,
        warnings,
        fetched_at: chrono::Utc::now(),
    }
}

/// Run one aggregation round over `sources` (already in output order).
///
/// Fetches run concurrently, at most `settings.max_concurrent` at a time, and
/// are merged back in input order. A failing source never affects another.
pub async fn run_round(
    sources: &[Source],
    fetcher: &dyn FeedFetcher,
    query: Option<&str>,
    settings: &RoundSettings,
) -> AggregationResult {
    ensure_metrics_described();
    let t0 = Instant::now();

    let fetches: Vec<_> = sources
        .iter()
        .map(|s| fetch_source(fetcher, s, query, settings))
        .collect();
    let outcomes: Vec<SourceOutcome> = stream::iter(fetches)
        .buffered(settings.max_concurrent.max(1))
        .collect()
        .await;

    let result = merge_outcomes(outcomes, settings.limits.total);

    counter!("news_rounds_total").increment(1);
    counter!("news_items_kept_total").increment(result.items.len() as u64);
    tracing::info!(
        target: "ingest",
        fetcher = fetcher.name(),
        sources = sources.len(),
        kept = result.items.len(),
        warnings = result.warnings.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "aggregation round finished"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rss(n: usize, prefix: &str) -> String {
        let items: String = (0..n)
            .map(|i| {
                format!(
                    "<item><title>{prefix} {i}</title><link>https://x.test/{prefix}/{i}</link><description>about {prefix}</description></item>"
                )
            })
            .collect();
        format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title>{items}</channel></rss>"#)
    }

    fn feed(xml: &str) -> Feed {
        feed_rs::parser::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn only_first_entries_are_considered_before_query() {
        let f = feed(&rss(8, "robot"));
        let (items, malformed) = normalize_entries(&f, "S", Some("robot 6"), PER_SOURCE_LIMIT);
        assert!(items.is_empty(), "entry 6 is beyond the per-source window");
        assert!(malformed.is_empty());

        let (items, _) = normalize_entries(&f, "S", None, PER_SOURCE_LIMIT);
        assert_eq!(items.len(), PER_SOURCE_LIMIT);
        assert_eq!(items[0].title, "robot 0");
    }

    #[test]
    fn malformed_entry_is_skipped_and_uses_a_slot() {
        let xml = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title>
<item><title>ok 1</title><link>https://x.test/1</link></item>
<item><description>no title here</description><link>https://x.test/2</link></item>
<item><title>ok 3</title><link>https://x.test/3</link></item>
</channel></rss>"#;
        let (items, malformed) = normalize_entries(&feed(xml), "S", None, 2);
        assert_eq!(items.len(), 1);
        assert_eq!(malformed.len(), 1);
    }

    #[test]
    fn merge_keeps_order_caps_and_reports() {
        let item = |s: &str, i: usize| NewsItem {
            title: format!("{s}{i}"),
            summary: String::new(),
            link: format!("https://x.test/{s}/{i}"),
            source: s.to_string(),
            published_at: None,
        };
        let outcomes = vec![
            SourceOutcome::Fetched {
                source: "A".into(),
                items: (0..3).map(|i| item("A", i)).collect(),
                malformed: vec![],
            },
            SourceOutcome::Empty { source: "B".into() },
            SourceOutcome::Failed(FetchError::new("C", FetchCause::Status(500))),
            SourceOutcome::Fetched {
                source: "D".into(),
                items: (0..3).map(|i| item("D", i)).collect(),
                malformed: vec![],
            },
        ];
        let res = merge_outcomes(outcomes, 4);
        let titles: Vec<_> = res.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["A0", "A1", "A2", "D0"]);
        let kinds: Vec<_> = res
            .warnings
            .iter()
            .map(|w| (w.source.as_str(), w.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![("B", WarningKind::EmptySource), ("C", WarningKind::FetchFailed)]
        );
    }
}
