//! Response cache with TTL and LRU eviction
//!
//! Adapters cache upstream answers (weather for minutes, search results a bit
//! longer) keyed by normalized query text.

use lru::LruCache;
use mentor_core::PerformanceMonitor;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
struct CachedEntry<V> {
    value: V,
    cached_at: Instant,
}

impl<V> CachedEntry<V> {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
}

/// LRU cache whose entries expire after a fixed TTL
pub struct TtlCache<V> {
    entries: RwLock<LruCache<String, CachedEntry<V>>>,
    ttl: Duration,
    stats: RwLock<CacheStats>,
    monitor: Option<Arc<PerformanceMonitor>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries)
            .or_else(|| NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            ttl,
            stats: RwLock::new(CacheStats::default()),
            monitor: None,
        }
    }

    /// Report hits and misses to a performance monitor as well
    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    fn normalize(key: &str) -> String {
        key.trim().to_lowercase()
    }

    /// Fresh value for the key, if any
    pub async fn get(&self, key: &str) -> Option<V> {
        let key = Self::normalize(key);
        let found = {
            let mut entries = self.entries.write().await;
            match entries.get(&key) {
                Some(entry) if entry.is_expired(self.ttl) => {
                    entries.pop(&key);
                    self.stats.write().await.expirations += 1;
                    None
                }
                Some(entry) => Some(entry.value.clone()),
                None => None,
            }
        };

        {
            let mut stats = self.stats.write().await;
            if found.is_some() {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
        }
        if let Some(monitor) = &self.monitor {
            monitor.record_cache(found.is_some()).await;
        }

        if found.is_some() {
            debug!(key = %key, "Cache hit");
        }
        found
    }

    pub async fn insert(&self, key: &str, value: V) {
        let entry = CachedEntry {
            value,
            cached_at: Instant::now(),
        };
        self.entries.write().await.put(Self::normalize(key), entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hit_after_insert_ignores_case() {
        let cache = TtlCache::new(4, Duration::from_secs(60));
        cache.insert("Paris", 21).await;

        assert_eq!(cache.get("  paris ").await, Some(21));
        assert_eq!(cache.get("london").await, None);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = TtlCache::new(4, Duration::from_millis(10));
        cache.insert("k", "v".to_string()).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("k").await, None);
        assert!(cache.is_empty().await);
        assert_eq!(cache.stats().await.expirations, 1);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1).await;
        cache.insert("b", 2).await;
        cache.get("a").await;
        cache.insert("c", 3).await;

        assert_eq!(cache.get("b").await, None);
        assert_eq!(cache.get("a").await, Some(1));
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_reports_to_monitor() {
        let monitor = Arc::new(PerformanceMonitor::new());
        let cache = TtlCache::new(2, Duration::from_secs(60)).with_monitor(monitor.clone());
        cache.insert("a", 1).await;
        cache.get("a").await;
        cache.get("b").await;

        let snapshot = monitor.snapshot().await;
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_misses, 1);
    }
}
