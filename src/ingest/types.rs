// src/ingest/types.rs
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use feed_rs::model::Feed;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// A registered feed endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub name: String, // e.g. "TechCrunch"
    pub url: String,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Normalized, sanitized, display-ready news item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub summary: String, // plain text
    pub link: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewsItem {
    /// `dd/mm/YYYY HH:MM`, or `No date` when the feed gave no publish time.
    pub fn display_date(&self) -> String {
        match self.published_at {
            Some(ts) => ts.format("%d/%m/%Y %H:%M").to_string(),
            None => "No date".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    FetchFailed,
    EmptySource,
    MalformedEntry,
}

/// A per-source problem that was recovered from during a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceWarning {
    pub source: String,
    pub kind: WarningKind,
    pub detail: String,
}

/// Cache key: the exact (selected sources, query) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregationRequest {
    pub sources: BTreeSet<String>,
    pub query: Option<String>,
}

impl AggregationRequest {
    /// An empty query string means "no query".
    pub fn new<I, S>(sources: I, query: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            query: query.filter(|q| !q.is_empty()).map(str::to_string),
        }
    }
}

/// Output of one aggregation round; the unit stored in the cache.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AggregationResult {
    pub items: Vec<NewsItem>,
    pub warnings: Vec<SourceWarning>,
    pub fetched_at: DateTime<Utc>,
}

/// Retrieves the feed document of one source.
///
/// Implementations must not panic on bad input; every failure is a
/// [`FetchError`] that the round turns into a warning.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &Source) -> Result<Feed, FetchError>;
    fn name(&self) -> &'static str;
}
