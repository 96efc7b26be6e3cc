//! Resolved-URL cache
//!
//! Maps a source locator to a previously resolved direct address, bounded by
//! a TTL, and deduplicates concurrent resolution attempts through a pending
//! set. Explicitly constructed and injected by the composition root; there
//! is no global instance.
//!
//! Locking discipline: one mutex guards the entry map and the pending set
//! together, held only for map access. The resolver call always runs outside
//! the lock, on its own task, so one slow resolution never blocks lookups
//! for other locators.

use crate::resolver::UrlResolver;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// How often `wait_for` re-checks a pending resolution
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One resolved address. Never mutated; re-resolution replaces it wholesale.
struct CacheEntry {
    direct_url: String,
    expires: Instant,
}

impl CacheEntry {
    fn is_valid(&self, now: Instant) -> bool {
        now < self.expires
    }
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    pending: HashSet<String>,
}

/// Cache observability counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub cached: usize,
    pub pending: usize,
}

/// Time-bounded, concurrency-safe cache of resolved direct URLs
pub struct UrlCache {
    resolver: Arc<dyn UrlResolver>,
    ttl: Duration,
    inner: Arc<Mutex<CacheInner>>,
}

impl UrlCache {
    pub fn new(resolver: Arc<dyn UrlResolver>, ttl: Duration) -> Self {
        Self {
            resolver,
            ttl,
            inner: Arc::new(Mutex::new(CacheInner::default())),
        }
    }

    /// Cached direct address for `url`, if an unexpired entry exists.
    ///
    /// Pure lookup: expired entries are treated as absent but left in place
    /// for `cleanup` to reclaim.
    pub async fn get(&self, url: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(url)
            .filter(|entry| entry.is_valid(Instant::now()))
            .map(|entry| entry.direct_url.clone())
    }

    /// True while a resolution for `url` is in flight
    pub async fn pending(&self, url: &str) -> bool {
        self.inner.lock().await.pending.contains(url)
    }

    /// Start resolving `url` in the background.
    ///
    /// Returns immediately. Does nothing if a valid entry already exists or
    /// a resolution is already pending, so at most one resolution per
    /// locator is ever in flight. Failure stores nothing; the pending marker
    /// is removed either way, leaving a later prefetch free to retry.
    pub async fn prefetch(&self, url: &str, format: &str) {
        {
            let mut inner = self.inner.lock().await;
            let valid = inner
                .entries
                .get(url)
                .map(|entry| entry.is_valid(Instant::now()))
                .unwrap_or(false);
            if valid || !inner.pending.insert(url.to_string()) {
                return;
            }
        }

        let resolver = Arc::clone(&self.resolver);
        let inner = Arc::clone(&self.inner);
        let ttl = self.ttl;
        let url = url.to_string();
        let format = format.to_string();

        tokio::spawn(async move {
            let outcome = resolver.resolve(&url, &format).await;
            let mut guard = inner.lock().await;
            match outcome {
                Ok(direct_url) if !direct_url.is_empty() => {
                    debug!(url, "prefetched direct address");
                    guard.entries.insert(
                        url.clone(),
                        CacheEntry {
                            direct_url,
                            expires: Instant::now() + ttl,
                        },
                    );
                }
                Ok(_) => debug!(url, "prefetch returned empty output, not cached"),
                Err(e) => debug!(url, error = %e, "prefetch failed"),
            }
            guard.pending.remove(&url);
        });
    }

    /// Warm the cache for the first `limit` locators of `urls`, in order
    pub async fn prefetch_batch<I, S>(&self, urls: I, format: &str, limit: usize)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for url in urls.into_iter().take(limit) {
            self.prefetch(url.as_ref(), format).await;
        }
    }

    /// Wait (bounded) for a pending resolution of `url` to finish.
    ///
    /// Returns immediately on a cache hit. If nothing is cached and nothing
    /// is pending, returns `None` right away; waiting never starts a
    /// resolution.
    pub async fn wait_for(&self, url: &str, timeout: Duration) -> Option<String> {
        if let Some(direct) = self.get(url).await {
            return Some(direct);
        }
        if !self.pending(url).await {
            return None;
        }

        let deadline = Instant::now() + timeout;
        while self.pending(url).await && Instant::now() < deadline {
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
        self.get(url).await
    }

    /// Drop expired entries. Correctness never depends on this running;
    /// it only reclaims memory.
    pub async fn cleanup(&self) {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        inner.entries.retain(|_, entry| entry.is_valid(now));
    }

    /// Drop all entries and pending markers
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.pending.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        CacheStats {
            cached: inner.entries.len(),
            pending: inner.pending.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted resolver: fixed answer after a fixed delay, counting calls
    struct ScriptedResolver {
        answer: Option<String>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedResolver {
        fn ok(answer: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                answer: Some(answer.to_string()),
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                answer: None,
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UrlResolver for ScriptedResolver {
        async fn resolve(&self, url: &str, _format: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match &self.answer {
                Some(answer) => Ok(answer.clone()),
                None => Err(Error::Resolve(format!("scripted failure for {}", url))),
            }
        }
    }

    const FMT: &str = "251/140/bestaudio";

    #[tokio::test]
    async fn empty_cache_misses() {
        let cache = UrlCache::new(ScriptedResolver::ok("x", Duration::ZERO), Duration::from_secs(300));
        assert_eq!(cache.get("http://a").await, None);
    }

    #[tokio::test]
    async fn prefetch_then_wait_for_returns_resolved_address() {
        let resolver = ScriptedResolver::ok("http://direct/a", Duration::from_millis(200));
        let cache = UrlCache::new(resolver, Duration::from_secs(300));

        cache.prefetch("http://a", FMT).await;
        let direct = cache.wait_for("http://a", Duration::from_secs(5)).await;
        assert_eq!(direct.as_deref(), Some("http://direct/a"));
    }

    #[tokio::test]
    async fn rapid_double_prefetch_resolves_once() {
        let resolver = ScriptedResolver::ok("http://direct/a", Duration::from_millis(100));
        let cache = UrlCache::new(Arc::clone(&resolver) as Arc<dyn UrlResolver>, Duration::from_secs(300));

        cache.prefetch("http://a", FMT).await;
        cache.prefetch("http://a", FMT).await;
        cache.wait_for("http://a", Duration::from_secs(5)).await;

        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn prefetch_batch_honors_limit_in_order() {
        let resolver = ScriptedResolver::ok("http://direct", Duration::from_millis(50));
        let cache = UrlCache::new(Arc::clone(&resolver) as Arc<dyn UrlResolver>, Duration::from_secs(300));

        let urls = ["http://1", "http://2", "http://3", "http://4", "http://5"];
        cache.prefetch_batch(urls, FMT, 3).await;

        // the first three became pending (or already resolved); the rest did not
        let stats = cache.stats().await;
        assert_eq!(stats.cached + stats.pending, 3);
        assert!(!cache.pending("http://4").await);
        assert!(!cache.pending("http://5").await);

        for url in &urls[..3] {
            assert!(cache.wait_for(url, Duration::from_secs(5)).await.is_some());
        }
        assert_eq!(resolver.calls(), 3);
        assert_eq!(cache.get("http://4").await, None);
    }

    #[tokio::test]
    async fn expired_entry_is_absent() {
        // zero TTL: entries expire the moment they are stored
        let resolver = ScriptedResolver::ok("http://direct/a", Duration::ZERO);
        let cache = UrlCache::new(resolver, Duration::ZERO);

        cache.prefetch("http://a", FMT).await;
        cache.wait_for("http://a", Duration::from_secs(5)).await;

        assert_eq!(cache.get("http://a").await, None);
        // the expired entry still occupies memory until cleanup runs
        assert_eq!(cache.stats().await.cached, 1);
        cache.cleanup().await;
        assert_eq!(cache.stats().await.cached, 0);
    }

    #[tokio::test]
    async fn failed_resolution_clears_pending_and_allows_retry() {
        let resolver = ScriptedResolver::failing(Duration::from_millis(50));
        let cache = UrlCache::new(Arc::clone(&resolver) as Arc<dyn UrlResolver>, Duration::from_secs(300));

        cache.prefetch("http://a", FMT).await;
        assert_eq!(cache.wait_for("http://a", Duration::from_secs(5)).await, None);
        assert!(!cache.pending("http://a").await);

        // a later prefetch is free to try again
        cache.prefetch("http://a", FMT).await;
        cache.wait_for("http://a", Duration::from_secs(5)).await;
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test]
    async fn wait_for_without_prefetch_returns_immediately() {
        let cache = UrlCache::new(ScriptedResolver::ok("x", Duration::ZERO), Duration::from_secs(300));

        let start = Instant::now();
        let result = cache.wait_for("http://never", Duration::from_secs(5)).await;
        assert_eq!(result, None);
        // no resolution was started as a side effect, so this returns at once
        assert!(start.elapsed() < Duration::from_millis(50));
        assert!(!cache.pending("http://never").await);
    }

    #[tokio::test]
    async fn clear_drops_entries_and_pending() {
        let resolver = ScriptedResolver::ok("http://direct/a", Duration::from_millis(200));
        let cache = UrlCache::new(resolver, Duration::from_secs(300));

        cache.prefetch("http://a", FMT).await;
        cache.clear().await;

        let stats = cache.stats().await;
        assert_eq!(stats.cached, 0);
        assert_eq!(stats.pending, 0);
    }
}
