//! Time limited, size limited cache of looked up cards.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Counters describing how well the cache is doing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub ttl: Duration,
}

impl CacheStats {
    /// Percentage of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }

    /// Percentage of the capacity in use.
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            self.size as f64 / self.max_size as f64 * 100.0
        }
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    created: Instant,
    last_accessed: Instant,
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Entries expire `ttl` after insertion. When full, the least recently used
/// entry makes room.
#[derive(Debug)]
pub struct Cache<V> {
    ttl: Duration,
    max_size: usize,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> Cache<V> {
    /// An empty cache.
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl,
            max_size,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    /// Get a live entry, counting the hit or miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        self.remove_expired(&mut inner, now);

        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = now;
                let value = entry.value.clone();
                inner.hits += 1;
                Some(value)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert or replace an entry, evicting the least recently used one if full.
    pub async fn insert(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        self.remove_expired(&mut inner, now);

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
                inner.evictions += 1;
            }
        }

        let entry = Entry {
            value,
            created: now,
            last_accessed: now,
        };
        inner.entries.insert(key, entry);
    }

    /// Every live value, without touching statistics or recency.
    pub async fn values(&self) -> Vec<V> {
        let inner = self.inner.lock().await;
        let now = Instant::now();
        inner
            .entries
            .values()
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| entry.value.clone())
            .collect()
    }

    /// Current counters, after dropping expired entries.
    pub async fn stats(&self) -> CacheStats {
        let mut inner = self.inner.lock().await;
        self.remove_expired(&mut inner, Instant::now());
        CacheStats {
            size: inner.entries.len(),
            max_size: self.max_size,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            ttl: self.ttl,
        }
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.duration_since(entry.created) > self.ttl
    }

    fn remove_expired(&self, inner: &mut Inner<V>, now: Instant) {
        inner.entries.retain(|_, entry| !self.is_expired(entry, now));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = Cache::new(TTL, 10);
        cache.insert("bolt", 1).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get("bolt").await, Some(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("bolt").await, None);
        assert!(cache.values().await.is_empty());
        assert_eq!(cache.stats().await.size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn least_recently_used_is_evicted() {
        let cache = Cache::new(TTL, 2);
        cache.insert("a", 1).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert("b", 2).await;
        tokio::time::advance(Duration::from_secs(1)).await;

        // Touch "a" so "b" becomes the oldest.
        assert_eq!(cache.get("a").await, Some(1));
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert("c", 3).await;

        assert_eq!(cache.get("b").await, None);
        assert_eq!(cache.get("a").await, Some(1));
        assert_eq!(cache.get("c").await, Some(3));
        assert_eq!(cache.stats().await.evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_a_key_does_not_evict() {
        let cache = Cache::new(TTL, 1);
        cache.insert("a", 1).await;
        cache.insert("a", 2).await;
        assert_eq!(cache.get("a").await, Some(2));
        assert_eq!(cache.stats().await.evictions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn statistics_are_tracked() {
        let cache = Cache::new(TTL, 4);
        cache.insert("a", 1).await;
        cache.get("a").await;
        cache.get("a").await;
        cache.get("b").await;
        cache.values().await;

        let stats = cache.stats().await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.max_size, 4);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.ttl, TTL);
        assert!((stats.hit_rate() - 66.666).abs() < 0.01);
        assert!((stats.utilization() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_stats_have_zero_rates() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.utilization(), 0.0);
    }
}
