// src/error.rs
//! Error types for the aggregation pipeline.
//!
//! Only [`AggregatorError`] is fatal to a request. [`FetchError`] never leaves
//! the round that produced it: it is turned into a
//! [`SourceWarning`](crate::ingest::types::SourceWarning) and reported with
//! the (possibly partial) result.

use std::time::Duration;

/// Invalid input from the caller. Fatal to that request only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregatorError {
    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("window must be between {min} and {max} days, got {got}")]
    InvalidWindow { got: i64, min: u32, max: u32 },
}

/// Failure to retrieve or parse one source's feed document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{source_id}: {cause}")]
pub struct FetchError {
    pub source_id: String,
    pub cause: FetchCause,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchCause {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("feed too large: {0} bytes")]
    TooLarge(u64),

    #[error("not a feed: {0}")]
    NotAFeed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    pub fn new(source_id: impl Into<String>, cause: FetchCause) -> Self {
        Self {
            source_id: source_id.into(),
            cause,
        }
    }
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("parsing JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} points to non-existent path")]
    MissingPath(&'static str),

    #[error("source '{name}' has invalid url '{url}': {reason}")]
    InvalidUrl {
        name: String,
        url: String,
        reason: String,
    },

    #[error("source name must not be empty")]
    EmptySourceName,

    #[error("duplicate source: {0}")]
    DuplicateSource(String),

    #[error("{field} must be at least 1")]
    ZeroLimit { field: &'static str },

    #[error("default_window_days must be between {min} and {max}, got {got}")]
    InvalidDefaultWindow { got: u32, min: u32, max: u32 },
}
