// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod registry;
pub mod stats;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{NewsAggregator, NewsDigest};
pub use crate::api::router;
pub use crate::cache::{AggregationCache, CacheStatus, NoopCache, TtlCache};
pub use crate::config::AppConfig;
pub use crate::error::{AggregatorError, FetchCause, FetchError};
pub use crate::ingest::types::{
    AggregationRequest, AggregationResult, FeedFetcher, NewsItem, Source, SourceWarning,
    WarningKind,
};
pub use crate::registry::SourceRegistry;

use std::sync::Arc;

/// Build the HTTP router from configuration, the same way the binary does
/// (minus the `/metrics` route, which needs a global recorder).
pub fn app(cfg: &AppConfig) -> anyhow::Result<axum::Router> {
    let aggregator = NewsAggregator::from_config(cfg)?;
    let state = api::AppState {
        aggregator: Arc::new(aggregator),
        default_window_days: cfg.default_window_days,
    };
    Ok(api::router(state))
}
