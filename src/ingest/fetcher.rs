// src/ingest/fetcher.rs
//! Feed retrieval: a reqwest-backed fetcher for live endpoints and an
//! in-memory fixture fetcher for offline runs and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::Feed;
use reqwest::Client;

use crate::error::{FetchCause, FetchError};
use crate::ingest::types::{FeedFetcher, Source};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Maximum accepted feed body (5 MiB).
pub const MAX_FEED_SIZE: u64 = 5 * 1024 * 1024;

const USER_AGENT: &str = concat!("ai-news-aggregator/", env!("CARGO_PKG_VERSION"));

/// Parse a feed document (RSS, Atom or JSON Feed).
pub fn parse_feed(source: &str, bytes: &[u8]) -> Result<Feed, FetchError> {
    feed_rs::parser::parse(bytes)
        .map_err(|e| FetchError::new(source, FetchCause::NotAFeed(e.to_string())))
}

/// Fetches live feeds over HTTP(S).
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// `timeout` bounds the whole request; the round applies its own timeout
    /// on top of this.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, source: &Source) -> Result<Feed, FetchError> {
        let transport = |e: reqwest::Error| {
            let cause = if e.is_timeout() {
                FetchCause::Timeout(self.timeout)
            } else {
                FetchCause::Transport(e.to_string())
            };
            FetchError::new(&source.name, cause)
        };

        let resp = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(FetchError::new(
                &source.name,
                FetchCause::Status(resp.status().as_u16()),
            ));
        }
        if let Some(len) = resp.content_length() {
            if len > MAX_FEED_SIZE {
                return Err(FetchError::new(&source.name, FetchCause::TooLarge(len)));
            }
        }

        let bytes = resp.bytes().await.map_err(transport)?;
        if bytes.len() as u64 > MAX_FEED_SIZE {
            return Err(FetchError::new(
                &source.name,
                FetchCause::TooLarge(bytes.len() as u64),
            ));
        }

        parse_feed(&source.name, &bytes)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Serves feed documents from memory, keyed by source name.
///
/// Documents can be swapped while the fetcher is shared, and every call is
/// counted, which makes cache behavior observable.
#[derive(Default)]
pub struct FixtureFetcher {
    docs: RwLock<HashMap<String, String>>,
    calls: AtomicUsize,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, source: &str, xml: impl Into<String>) -> Self {
        self.set(source, xml);
        self
    }

    /// Replace (or add) the document served for `source`.
    pub fn set(&self, source: &str, xml: impl Into<String>) {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.to_string(), xml.into());
    }

    /// Number of `fetch` calls served so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedFetcher for FixtureFetcher {
    async fn fetch(&self, source: &Source) -> Result<Feed, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let doc = self
            .docs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&source.name)
            .cloned();
        match doc {
            Some(xml) => parse_feed(&source.name, xml.as_bytes()),
            None => Err(FetchError::new(
                &source.name,
                FetchCause::Transport("no fixture registered".to_string()),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
