use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

use crate::utils::Metrics;

/// In-memory LRU cache of successful translations.
///
/// Comic pages repeat short lines ("!?", names, sound effects) a lot, so a
/// small cache saves backend calls within a batch. Entries live only for the
/// lifetime of the process. Fallback results are never stored.
#[derive(Clone)]
pub struct TranslationCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    cache: Mutex<LruCache<u64, String>>,
    namespace: String,
    metrics: Option<Metrics>,
}

impl TranslationCache {
    /// Create a cache holding up to `max_entries` translations.
    ///
    /// Returns `None` when `max_entries` is 0 (caching disabled).
    /// `namespace` separates entries produced for different models/targets.
    pub fn new(max_entries: usize, namespace: impl Into<String>, metrics: Option<Metrics>) -> Option<Self> {
        let max = NonZeroUsize::new(max_entries)?;
        Some(Self {
            inner: Arc::new(CacheInner {
                cache: Mutex::new(LruCache::new(max)),
                namespace: namespace.into(),
                metrics,
            }),
        })
    }

    /// xxHash3 key over namespace and source text
    fn key(&self, text: &str) -> u64 {
        let mut hash_input = Vec::with_capacity(self.inner.namespace.len() + 1 + text.len());
        hash_input.extend_from_slice(self.inner.namespace.as_bytes());
        hash_input.push(0);
        hash_input.extend_from_slice(text.as_bytes());
        xxh3_64(&hash_input)
    }

    pub fn get(&self, text: &str) -> Option<String> {
        let key = self.key(text);
        let hit = self.inner.cache.lock().get(&key).cloned();

        if let Some(ref m) = self.inner.metrics {
            if hit.is_some() {
                m.record_cache_hit();
            } else {
                m.record_cache_miss();
            }
        }
        hit
    }

    pub fn put(&self, text: &str, translated: &str) {
        let key = self.key(text);
        self.inner.cache.lock().put(key, translated.to_string());
    }

    pub fn len(&self) -> usize {
        self.inner.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.cache.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_put_get() {
        let cache = TranslationCache::new(8, "gpt:English", None).unwrap();
        assert!(cache.get("こんにちは").is_none());

        cache.put("こんにちは", "Hello");
        assert_eq!(cache.get("こんにちは").as_deref(), Some("Hello"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_size_disables_cache() {
        assert!(TranslationCache::new(0, "gpt:English", None).is_none());
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let english = TranslationCache::new(8, "gpt:English", None).unwrap();
        let french = TranslationCache::new(8, "gpt:French", None).unwrap();
        assert_ne!(english.key("はい"), french.key("はい"));
        assert_eq!(english.key("はい"), english.key("はい"));
    }

    #[test]
    fn test_lru_eviction() {
        let cache = TranslationCache::new(2, "ns", None).unwrap();
        cache.put("a", "A");
        cache.put("b", "B");
        cache.put("c", "C");

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("c").as_deref(), Some("C"));
    }

    #[test]
    fn test_metrics_hits_and_misses() {
        let metrics = Metrics::new();
        let cache = TranslationCache::new(4, "ns", Some(metrics.clone())).unwrap();
        cache.get("x");
        cache.put("x", "X");
        cache.get("x");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_misses, 1);
    }
}
