//! Metrics cache.
//!
//! In-memory per-symbol snapshots with a fixed TTL. Expiry is lazy: an
//! expired entry is never served and is replaced on the next miss, or
//! dropped by `purge_expired`.

use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::fetcher::FetchError;
use super::InstrumentMetrics;

/// Cache entry with TTL
#[derive(Debug, Clone)]
struct CacheEntry {
    metrics: InstrumentMetrics,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(metrics: InstrumentMetrics, ttl: Duration) -> Self {
        Self {
            metrics,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Per-symbol fundamentals cache.
///
/// Concurrent misses for the same symbol may each fetch; the last write
/// wins. Failed fetches are never stored.
pub struct MetricsCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MetricsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a cached snapshot if present and not expired.
    pub fn get(&self, symbol: &str) -> Option<InstrumentMetrics> {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        entries
            .get(symbol)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.metrics.clone())
    }

    /// Store a snapshot, replacing any previous entry for the symbol.
    pub fn insert(&self, metrics: InstrumentMetrics) {
        let entry = CacheEntry::new(metrics, self.ttl);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(entry.metrics.symbol.clone(), entry);
    }

    /// Return the live snapshot for `symbol`, or run `fetch` and cache its
    /// success.
    ///
    /// No lock is held while `fetch` runs.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        symbol: &str,
        fetch: F,
    ) -> Result<InstrumentMetrics, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<InstrumentMetrics, FetchError>>,
    {
        if let Some(metrics) = self.get(symbol) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(symbol = %symbol, "Cache hit");
            return Ok(metrics);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(symbol = %symbol, "Cache miss");

        let metrics = fetch().await?;
        self.insert(metrics.clone());
        Ok(metrics)
    }

    /// Remove one symbol. Returns whether an entry existed.
    pub fn invalidate(&self, symbol: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(symbol).is_some()
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Clear all entries. Hit and miss counters are kept.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let total = entries.len();
        let expired = entries.values().filter(|e| e.is_expired(now)).count();

        CacheStats {
            total_entries: total,
            live_entries: total - expired,
            expired_entries: expired,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub live_entries: usize,
    pub expired_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub ttl_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Country, ProviderError};
    use std::sync::atomic::AtomicU32;

    fn metrics(symbol: &str, price: f64) -> InstrumentMetrics {
        InstrumentMetrics {
            symbol: symbol.to_string(),
            country: Country::Foreign,
            current_price: price,
            return_on_equity: 0.2,
            return_on_assets: 0.1,
            price_to_earnings: 15.0,
            debt_to_equity: 0.5,
            book_value: 40.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl() {
        let cache = MetricsCache::new(Duration::from_secs(300));
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let result = cache
                .get_or_fetch("AAPL", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(metrics("AAPL", 190.0))
                })
                .await
                .unwrap();
            assert_eq!(result, metrics("AAPL", 190.0));
            tokio::time::advance(Duration::from_secs(60)).await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.live_entries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_refetched() {
        let cache = MetricsCache::new(Duration::from_secs(300));
        cache.insert(metrics("AAPL", 190.0));

        tokio::time::advance(Duration::from_secs(300)).await;
        assert!(cache.get("AAPL").is_none());
        assert_eq!(cache.stats().expired_entries, 1);

        let fresh = cache
            .get_or_fetch("AAPL", || async { Ok(metrics("AAPL", 195.0)) })
            .await
            .unwrap();
        assert_eq!(fresh.current_price, 195.0);
        assert_eq!(cache.get("AAPL").map(|m| m.current_price), Some(195.0));
        assert_eq!(cache.stats().expired_entries, 0);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let cache = MetricsCache::new(Duration::from_secs(300));

        let err = cache
            .get_or_fetch("ZZZZ", || async {
                Err(FetchError::Provider(ProviderError::DataNotAvailable(
                    "ZZZZ".into(),
                )))
            })
            .await;
        assert!(err.is_err());
        assert!(cache.get("ZZZZ").is_none());
        assert_eq!(cache.stats().total_entries, 0);

        let ok = cache
            .get_or_fetch("ZZZZ", || async { Ok(metrics("ZZZZ", 1.0)) })
            .await;
        assert!(ok.is_ok());
        assert_eq!(cache.stats().misses, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = MetricsCache::new(Duration::from_secs(10));
        cache.insert(metrics("OLD", 1.0));
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.insert(metrics("NEW", 2.0));

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.get("NEW").is_some());
        assert_eq!(cache.stats().total_entries, 1);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = MetricsCache::new(Duration::from_secs(300));
        cache.insert(metrics("AAPL", 190.0));
        cache.insert(metrics("MSFT", 410.0));

        assert!(cache.invalidate("AAPL"));
        assert!(!cache.invalidate("AAPL"));
        assert!(cache.get("MSFT").is_some());

        cache.clear();
        assert_eq!(cache.stats().total_entries, 0);
        assert_eq!(cache.stats().ttl_secs, 300);
    }
}
