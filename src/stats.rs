// src/stats.rs
//! Per-source item counts for the caller's statistics panel.

use serde::{Deserialize, Serialize};

use crate::ingest::types::NewsItem;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCount {
    pub source: String,
    pub count: usize,
}

/// Count `items` per source.
///
/// Every entry of `sources` appears, zero counts included. Sorted by count
/// descending; ties keep the order of `sources`.
pub fn tally<S: AsRef<str>>(items: &[NewsItem], sources: &[S]) -> Vec<SourceCount> {
    let mut out: Vec<SourceCount> = sources
        .iter()
        .map(|s| SourceCount {
            source: s.as_ref().to_string(),
            count: 0,
        })
        .collect();

    for it in items {
        if let Some(row) = out.iter_mut().find(|r| r.source == it.source) {
            row.count += 1;
        }
    }

    // sort_by is stable, so ties stay in `sources` order
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}
