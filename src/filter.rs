// src/filter.rs
//! Filter pipeline: query match (inside a round, before caching), date
//! window (after cache retrieval, on every call) and the per-round cap.

use chrono::{DateTime, Duration, Utc};

use crate::error::AggregatorError;
use crate::ingest::types::NewsItem;

pub const MIN_WINDOW_DAYS: u32 = 1;
pub const MAX_WINDOW_DAYS: u32 = 30;

/// Case-insensitive substring match on title or sanitized summary.
/// `None` matches everything.
pub fn matches_query(item: &NewsItem, query: Option<&str>) -> bool {
    let Some(q) = query else {
        return true;
    };
    let q = q.to_lowercase();
    item.title.to_lowercase().contains(&q) || item.summary.to_lowercase().contains(&q)
}

/// Reject windows outside `[MIN_WINDOW_DAYS, MAX_WINDOW_DAYS]`.
pub fn validate_window(days: i64) -> Result<u32, AggregatorError> {
    if (i64::from(MIN_WINDOW_DAYS)..=i64::from(MAX_WINDOW_DAYS)).contains(&days) {
        Ok(days as u32)
    } else {
        Err(AggregatorError::InvalidWindow {
            got: days,
            min: MIN_WINDOW_DAYS,
            max: MAX_WINDOW_DAYS,
        })
    }
}

/// True when the item was published strictly after `now - days`.
/// Undated items never qualify.
pub fn within_window(item: &NewsItem, now: DateTime<Utc>, days: u32) -> bool {
    let cutoff = now - Duration::days(i64::from(days));
    item.published_at.is_some_and(|ts| ts > cutoff)
}

/// Date-window pass, order preserved.
pub fn apply_window(items: &[NewsItem], now: DateTime<Utc>, days: u32) -> Vec<NewsItem> {
    items
        .iter()
        .filter(|it| within_window(it, now, days))
        .cloned()
        .collect()
}

/// Keep the first `limit` items.
pub fn cap(mut items: Vec<NewsItem>, limit: usize) -> Vec<NewsItem> {
    items.truncate(limit);
    items
}
