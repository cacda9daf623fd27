//! Gram block cache
//!
//! The streaming Sequential trainer recomputes Gram columns in fixed-size
//! blocks every outer iteration. An LRU cache over block indices avoids
//! re-evaluating kernels for blocks that are revisited while the active set
//! is still small enough for the cache to hold them.

use lru::LruCache;
use ndarray::Array2;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// LRU cache of Gram column blocks, keyed by block index
pub struct GramBlockCache {
    cache: LruCache<usize, Arc<Array2<f64>>>,
    hits: u64,
    misses: u64,
}

impl GramBlockCache {
    /// Create a cache holding at most `capacity` blocks
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Size the cache from a memory budget in bytes, given the shape of one
    /// block (8 bytes per f64 entry)
    pub fn with_memory_limit(memory_bytes: usize, n_rows: usize, block_size: usize) -> Self {
        let block_bytes = (n_rows * block_size * 8).max(1);
        Self::new((memory_bytes / block_bytes).max(1))
    }

    /// Fetch a cached block
    pub fn get(&mut self, block_index: usize) -> Option<Arc<Array2<f64>>> {
        if let Some(block) = self.cache.get(&block_index) {
            self.hits += 1;
            Some(Arc::clone(block))
        } else {
            self.misses += 1;
            None
        }
    }

    /// Insert a freshly computed block
    pub fn put(&mut self, block_index: usize, block: Arc<Array2<f64>>) {
        self.cache.put(block_index, block);
    }

    /// Fraction of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Current cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }

    /// Drop all cached blocks and reset the counters
    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn block(value: f64) -> Arc<Array2<f64>> {
        Arc::new(arr2(&[[value]]))
    }

    #[test]
    fn test_cache_basic() {
        let mut cache = GramBlockCache::new(3);

        assert!(cache.get(0).is_none());
        assert_eq!(cache.stats().misses, 1);

        cache.put(0, block(5.0));
        let fetched = cache.get(0).unwrap();
        assert_eq!(fetched[(0, 0)], 5.0);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_cache_lru_eviction() {
        let mut cache = GramBlockCache::new(2);

        cache.put(0, block(0.0));
        cache.put(1, block(1.0));
        cache.put(2, block(2.0)); // evicts block 0

        assert!(cache.get(0).is_none());
        assert!(cache.get(1).is_some());
        assert!(cache.get(2).is_some());
    }

    #[test]
    fn test_hit_rate() {
        let mut cache = GramBlockCache::new(4);
        assert_eq!(cache.hit_rate(), 0.0);

        cache.get(0); // miss
        cache.put(0, block(1.0));
        cache.get(0); // hit
        assert_eq!(cache.hit_rate(), 0.5);
    }

    #[test]
    fn test_with_memory_limit() {
        // 2 blocks of 10x10 f64 fit in 1600 bytes
        let cache = GramBlockCache::with_memory_limit(1600, 10, 10);
        assert_eq!(cache.stats().capacity, 2);
        // never below one block
        let tiny = GramBlockCache::with_memory_limit(1, 1000, 1000);
        assert_eq!(tiny.stats().capacity, 1);
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut cache = GramBlockCache::new(2);
        cache.put(0, block(1.0));
        cache.get(0);
        cache.clear();

        assert!(cache.get(0).is_none());
        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.stats().misses, 1);
    }
}
