use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe LRU cache of question embeddings.
///
/// Keys combine the embedding model and the question text, so switching
/// models never serves a stale vector.
pub struct EmbeddingCache {
    cache: Mutex<LruCache<String, Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Hit/miss counters since creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl EmbeddingCache {
    /// Create a cache holding at most `capacity` embeddings (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn key(model: &str, text: &str) -> String {
        format!("{}\u{1F}{}", model, text)
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Vec<f32>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, model: &str, text: &str) -> Option<Vec<f32>> {
        let found = self.lock().get(&Self::key(model, text)).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub fn put(&self, model: &str, text: &str, embedding: Vec<f32>) {
        self.lock().put(Self::key(model, text), embedding);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "text-embedding-3-small";

    #[test]
    fn test_cache_put_and_get() {
        let cache = EmbeddingCache::new(10);
        cache.put(MODEL, "what is osmosis", vec![1.0, 2.0]);

        assert_eq!(cache.get(MODEL, "what is osmosis"), Some(vec![1.0, 2.0]));
        assert!(cache.get(MODEL, "what is diffusion").is_none());
    }

    #[test]
    fn test_cache_is_model_scoped() {
        let cache = EmbeddingCache::new(10);
        cache.put(MODEL, "q", vec![1.0]);

        assert!(cache.get("other-model", "q").is_none());
    }

    #[test]
    fn test_cache_get_updates_lru() {
        let cache = EmbeddingCache::new(2);

        cache.put(MODEL, "q1", vec![1.0]);
        cache.put(MODEL, "q2", vec![2.0]);
        let _ = cache.get(MODEL, "q1");
        cache.put(MODEL, "q3", vec![3.0]);

        assert!(cache.get(MODEL, "q1").is_some());
        assert!(cache.get(MODEL, "q2").is_none());
        assert!(cache.get(MODEL, "q3").is_some());
    }

    #[test]
    fn test_cache_stats_and_clear() {
        let cache = EmbeddingCache::new(0);
        cache.put(MODEL, "q1", vec![1.0]);
        cache.put(MODEL, "q2", vec![2.0]);
        assert_eq!(cache.len(), 1);

        let _ = cache.get(MODEL, "q2");
        let _ = cache.get(MODEL, "q1");
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));

        cache.clear();
        assert!(cache.is_empty());
    }
}
