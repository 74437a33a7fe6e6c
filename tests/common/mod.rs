// tests/common/mod.rs
// Shared builders for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use ai_news_aggregator::ingest::fetcher::FixtureFetcher;
use ai_news_aggregator::ingest::RoundSettings;
use ai_news_aggregator::{AggregationCache, NewsAggregator, Source, SourceRegistry};
use chrono::{Duration, Utc};

/// One `<item>`: title, summary, age in hours (None = no pubDate).
pub struct Item<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub age_hours: Option<i64>,
}

pub fn item<'a>(title: &'a str, summary: &'a str, age_hours: i64) -> Item<'a> {
    Item {
        title,
        summary,
        age_hours: Some(age_hours),
    }
}

/// RSS 2.0 document whose pubDates are relative to the current time.
pub fn rss(channel: &str, items: &[Item<'_>]) -> String {
    let body: String = items
        .iter()
        .enumerate()
        .map(|(i, it)| {
            let date = it
                .age_hours
                .map(|h| {
                    format!(
                        "<pubDate>{}</pubDate>",
                        (Utc::now() - Duration::hours(h)).to_rfc2822()
                    )
                })
                .unwrap_or_default();
            format!(
                "<item><title>{}</title><link>https://{}.test/{}</link>{}<description><![CDATA[{}]]></description></item>",
                it.title, slug(channel), i, date, it.summary
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>{channel}</title><link>https://{}.test</link><description>d</description>{body}</channel></rss>"#,
        slug(channel)
    )
}

/// `n` recent items titled "`channel` story i".
pub fn recent_rss(channel: &str, n: usize) -> String {
    let titles: Vec<String> = (0..n).map(|i| format!("{channel} story {i}")).collect();
    let items: Vec<Item<'_>> = titles
        .iter()
        .map(|t| item(t, "an AI update", 2))
        .collect();
    rss(channel, &items)
}

pub fn empty_rss(channel: &str) -> String {
    rss(channel, &[])
}

fn slug(s: &str) -> String {
    s.to_ascii_lowercase().replace(' ', "-")
}

pub fn registry(names: &[&str]) -> SourceRegistry {
    SourceRegistry::new(
        names
            .iter()
            .map(|n| Source::new(*n, format!("https://{}.test/feed", slug(n))))
            .collect(),
    )
    .expect("valid test registry")
}

pub fn aggregator(
    names: &[&str],
    fetcher: Arc<FixtureFetcher>,
    cache: Arc<dyn AggregationCache>,
) -> NewsAggregator {
    NewsAggregator::new(
        Arc::new(registry(names)),
        fetcher,
        cache,
        RoundSettings::default(),
    )
}
