// src/aggregator.rs
//! Service facade used by the presentation layer.
//!
//! Flow per call: validate input -> cache lookup -> (miss) aggregation round
//! -> date window on the cached items -> per-source statistics.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;

use crate::cache::{AggregationCache, CacheStatus, TtlCache};
use crate::config::AppConfig;
use crate::error::AggregatorError;
use crate::filter::{apply_window, validate_window};
use crate::ingest::fetcher::HttpFetcher;
use crate::ingest::types::{
    AggregationRequest, AggregationResult, FeedFetcher, NewsItem, SourceWarning,
};
use crate::ingest::{run_round, RoundSettings};
use crate::registry::SourceRegistry;
use crate::stats::{tally, SourceCount};

/// What the caller gets back for one request.
#[derive(Debug, Clone, Serialize)]
pub struct NewsDigest {
    pub items: Vec<NewsItem>,
    pub stats: Vec<SourceCount>,
    pub total: usize,
    pub warnings: Vec<SourceWarning>,
    pub fetched_at: DateTime<Utc>,
    #[serde(skip)]
    pub cache: CacheStatus,
}

pub struct NewsAggregator {
    registry: Arc<SourceRegistry>,
    fetcher: Arc<dyn FeedFetcher>,
    cache: Arc<dyn AggregationCache>,
    settings: RoundSettings,
}

impl NewsAggregator {
    pub fn new(
        registry: Arc<SourceRegistry>,
        fetcher: Arc<dyn FeedFetcher>,
        cache: Arc<dyn AggregationCache>,
        settings: RoundSettings,
    ) -> Self {
        Self {
            registry,
            fetcher,
            cache,
            settings,
        }
    }

    /// Live setup: HTTP fetcher + TTL cache, both sized from `cfg`.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let settings = cfg.round_settings();
        let fetcher = HttpFetcher::new(settings.fetch_timeout)?;
        Ok(Self::new(
            Arc::new(cfg.registry()?),
            Arc::new(fetcher),
            Arc::new(TtlCache::new(cfg.cache_ttl())),
            settings,
        ))
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Build the cache key, rejecting unknown source names.
    pub fn request<S: AsRef<str>>(
        &self,
        selected: &[S],
        query: Option<&str>,
    ) -> Result<AggregationRequest, AggregatorError> {
        let sources = self.registry.select(selected)?;
        Ok(AggregationRequest::new(
            sources.into_iter().map(|s| s.name),
            query,
        ))
    }

    /// Cached aggregation round for `request` (query filter and cap applied,
    /// no date window).
    pub async fn aggregate(
        &self,
        request: &AggregationRequest,
    ) -> Result<(Arc<AggregationResult>, CacheStatus), AggregatorError> {
        let names: Vec<&str> = request.sources.iter().map(String::as_str).collect();
        let sources = self.registry.select(&names)?;
        let query = request.query.as_deref();
        let fetcher = self.fetcher.as_ref();
        let settings = &self.settings;

        let compute = async move { run_round(&sources, fetcher, query, settings).await }.boxed();
        Ok(self.cache.get_or_compute(request, compute).await)
    }

    /// Items from `selected` matching `query`, published within the last
    /// `window_days` days, with per-source statistics.
    ///
    /// Items come in registry order. Statistics are sorted by count, with
    /// ties kept in the order the caller listed the sources.
    pub async fn news<S: AsRef<str>>(
        &self,
        selected: &[S],
        query: Option<&str>,
        window_days: i64,
    ) -> Result<NewsDigest, AggregatorError> {
        self.news_at(Utc::now(), selected, query, window_days).await
    }

    /// [`news`](Self::news) with an explicit "now" for the date window.
    pub async fn news_at<S: AsRef<str>>(
        &self,
        now: DateTime<Utc>,
        selected: &[S],
        query: Option<&str>,
        window_days: i64,
    ) -> Result<NewsDigest, AggregatorError> {
        let days = validate_window(window_days)?;
        let request = self.request(selected, query)?;
        let (result, cache) = self.aggregate(&request).await?;

        let items = apply_window(&result.items, now, days);
        let stats = tally(&items, &selection_order(selected));

        Ok(NewsDigest {
            total: items.len(),
            items,
            stats,
            warnings: result.warnings.clone(),
            fetched_at: result.fetched_at,
            cache,
        })
    }
}

/// Caller's selection with repeats removed, first occurrence wins.
fn selection_order<S: AsRef<str>>(selected: &[S]) -> Vec<&str> {
    let mut seen = HashSet::new();
    selected
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| seen.insert(*name))
        .collect()
}
