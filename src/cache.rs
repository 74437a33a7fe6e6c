// src/cache.rs
//! Aggregation cache: one entry per (selected sources, query) pair, absolute
//! TTL, staleness checked lazily on access.
//!
//! Entries are immutable `Arc`s, so readers never block each other for long.
//! Concurrent misses for the same key are collapsed: one caller runs the
//! round, the others wait for it and then read the fresh entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use metrics::counter;
use tokio::time::Instant;

use crate::ingest::types::{AggregationRequest, AggregationResult};

/// Default time-to-live: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Value of the `X-News-Cache` response header.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

#[async_trait]
pub trait AggregationCache: Send + Sync {
    /// Return the cached result for `key`, or await `compute`, store its
    /// output and return it. `compute` is dropped unpolled on a hit.
    async fn get_or_compute<'a>(
        &'a self,
        key: &'a AggregationRequest,
        compute: BoxFuture<'a, AggregationResult>,
    ) -> (Arc<AggregationResult>, CacheStatus);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<AggregationResult>,
    created_at: Instant,
}

/// In-memory TTL cache with per-key single flight.
#[derive(Debug)]
pub struct TtlCache {
    ttl: Duration,
    entries: RwLock<HashMap<AggregationRequest, CacheEntry>>,
    inflight: Mutex<HashMap<AggregationRequest, Arc<tokio::sync::Mutex<()>>>>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh(&self, key: &AggregationRequest) -> Option<Arc<AggregationResult>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|e| e.created_at.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.value))
    }

    fn store(&self, key: &AggregationRequest, value: Arc<AggregationResult>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // sweep stale entries while we hold the write lock anyway
        let ttl = self.ttl;
        entries.retain(|_, e| e.created_at.elapsed() < ttl);
        entries.insert(
            key.clone(),
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    fn gate(&self, key: &AggregationRequest) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(inflight.entry(key.clone()).or_default())
    }

    /// Drop the gate for `key`, unless a newer one has replaced it.
    fn release(&self, key: &AggregationRequest, gate: &Arc<tokio::sync::Mutex<()>>) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if inflight.get(key).is_some_and(|g| Arc::ptr_eq(g, gate)) {
            inflight.remove(key);
        }
    }
}

/// Held by the caller that owns a key's gate. Releases it on drop, so a
/// cancelled round does not leave its gate behind.
struct GateRelease<'a> {
    cache: &'a TtlCache,
    key: &'a AggregationRequest,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for GateRelease<'_> {
    fn drop(&mut self) {
        self.cache.release(self.key, &self.gate);
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[async_trait]
impl AggregationCache for TtlCache {
    async fn get_or_compute<'a>(
        &'a self,
        key: &'a AggregationRequest,
        compute: BoxFuture<'a, AggregationResult>,
    ) -> (Arc<AggregationResult>, CacheStatus) {
        if let Some(hit) = self.fresh(key) {
            counter!("news_cache_hits_total").increment(1);
            tracing::debug!(sources = key.sources.len(), query = ?key.query, "cache hit");
            return (hit, CacheStatus::Hit);
        }

        let gate = self.gate(key);
        let _guard = gate.lock().await;
        let _release = GateRelease {
            cache: self,
            key,
            gate: Arc::clone(&gate),
        };

        // Another caller may have finished the round while we waited.
        if let Some(hit) = self.fresh(key) {
            counter!("news_cache_hits_total").increment(1);
            tracing::debug!(sources = key.sources.len(), query = ?key.query, "cache hit after wait");
            return (hit, CacheStatus::Hit);
        }

        counter!("news_cache_misses_total").increment(1);
        tracing::debug!(sources = key.sources.len(), query = ?key.query, "cache miss");
        let value = Arc::new(compute.await);
        self.store(key, Arc::clone(&value));
        (value, CacheStatus::Miss)
    }
}

/// Never stores anything; every call computes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl AggregationCache for NoopCache {
    async fn get_or_compute<'a>(
        &'a self,
        _key: &'a AggregationRequest,
        compute: BoxFuture<'a, AggregationResult>,
    ) -> (Arc<AggregationResult>, CacheStatus) {
        (Arc::new(compute.await), CacheStatus::Miss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn result(tag: &str) -> AggregationResult {
        AggregationResult {
            items: vec![],
            warnings: vec![crate::ingest::types::SourceWarning {
                source: tag.to_string(),
                kind: crate::ingest::types::WarningKind::EmptySource,
                detail: String::new(),
            }],
            fetched_at: chrono::Utc::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hit_within_ttl_then_miss_after_expiry() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let key = AggregationRequest::new(["A"], None);

        let (v1, s1) = cache.get_or_compute(&key, async { result("first") }.boxed()).await;
        assert_eq!(s1, CacheStatus::Miss);

        tokio::time::advance(Duration::from_secs(59)).await;
        let (v2, s2) = cache.get_or_compute(&key, async { result("second") }.boxed()).await;
        assert_eq!(s2, CacheStatus::Hit);
        assert_eq!(v1, v2);

        tokio::time::advance(Duration::from_secs(2)).await;
        let (v3, s3) = cache.get_or_compute(&key, async { result("third") }.boxed()).await;
        assert_eq!(s3, CacheStatus::Miss);
        assert_eq!(v3.warnings[0].source, "third");
    }

    #[tokio::test]
    async fn distinct_queries_never_share_an_entry() {
        let cache = TtlCache::default();
        let a = AggregationRequest::new(["A"], Some("x"));
        let b = AggregationRequest::new(["A"], Some("y"));
        cache.get_or_compute(&a, async { result("a") }.boxed()).await;
        let (v, s) = cache.get_or_compute(&b, async { result("b") }.boxed()).await;
        assert_eq!(s, CacheStatus::Miss);
        assert_eq!(v.warnings[0].source, "b");
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entries_are_swept_on_store() {
        let cache = TtlCache::new(Duration::from_secs(10));
        let a = AggregationRequest::new(["A"], None);
        let b = AggregationRequest::new(["B"], None);
        cache.get_or_compute(&a, async { result("a") }.boxed()).await;
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.get_or_compute(&b, async { result("b") }.boxed()).await;
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_run_one_round() {
        let cache = Arc::new(TtlCache::default());
        let key = AggregationRequest::new(["A", "B"], None);
        let rounds = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            let rounds = Arc::clone(&rounds);
            handles.push(tokio::spawn(async move {
                let compute = async {
                    rounds.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    result("shared")
                }
                .boxed();
                cache.get_or_compute(&key, compute).await.1
            }));
        }

        let mut misses = 0;
        for h in handles {
            if h.await.unwrap() == CacheStatus::Miss {
                misses += 1;
            }
        }
        assert_eq!(rounds.load(Ordering::SeqCst), 1);
        assert_eq!(misses, 1);
    }

    fn inflight_len(cache: &TtlCache) -> usize {
        cache.inflight.lock().unwrap().len()
    }

    #[tokio::test]
    async fn finished_round_leaves_no_gate() {
        let cache = TtlCache::default();
        for q in ["a", "b", "c"] {
            let key = AggregationRequest::new(["A"], Some(q));
            cache.get_or_compute(&key, async { result(q) }.boxed()).await;
        }
        assert_eq!(inflight_len(&cache), 0);
    }

    #[tokio::test]
    async fn cancelled_round_releases_its_gate() {
        let cache = Arc::new(TtlCache::default());
        let key = AggregationRequest::new(["A"], Some("slow"));

        let task = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            tokio::spawn(async move {
                let compute = futures::future::pending::<AggregationResult>().boxed();
                cache.get_or_compute(&key, compute).await;
            })
        };
        while inflight_len(&cache) == 0 {
            tokio::task::yield_now().await;
        }

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(inflight_len(&cache), 0);
        assert!(cache.is_empty());

        // the key is usable again
        let (_, status) = cache.get_or_compute(&key, async { result("again") }.boxed()).await;
        assert_eq!(status, CacheStatus::Miss);
    }

    #[tokio::test]
    async fn noop_cache_always_computes() {
        let cache = NoopCache;
        let key = AggregationRequest::new(["A"], None);
        let (_, s1) = cache.get_or_compute(&key, async { result("1") }.boxed()).await;
        let (v2, s2) = cache.get_or_compute(&key, async { result("2") }.boxed()).await;
        assert_eq!((s1, s2), (CacheStatus::Miss, CacheStatus::Miss));
        assert_eq!(v2.warnings[0].source, "2");
    }
}
