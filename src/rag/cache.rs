//! Bounded least-recently-used caches shared across requests.

use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use tokio::sync::Mutex;

/// Thread-safe LRU map. A capacity of zero disables storage entirely.
///
/// Every access (hit on `get`, any `put`) promotes the key; inserting past
/// capacity evicts exactly the least recently accessed key.
pub struct LruStore<K: Hash + Eq, V: Clone> {
    inner: Option<Mutex<LruCache<K, V>>>,
    capacity: usize,
}

impl<K: Hash + Eq, V: Clone> LruStore<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let cache = self.inner.as_ref()?;
        let mut guard = cache.lock().await;
        guard.get(key).cloned()
    }

    pub async fn put(&self, key: K, value: V) {
        if let Some(cache) = &self.inner {
            let mut guard = cache.lock().await;
            guard.put(key, value);
        }
    }

    pub async fn len(&self) -> usize {
        match &self.inner {
            Some(cache) => cache.lock().await.len(),
            None => 0,
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Query-embedding cache keyed by the trimmed query string.
pub struct EmbeddingCache {
    store: LruStore<String, Vec<f32>>,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            store: LruStore::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub async fn get(&self, query: &str) -> Option<Vec<f32>> {
        self.store.get(&normalize_key(query)).await
    }

    pub async fn put(&self, query: &str, vector: Vec<f32>) {
        self.store.put(normalize_key(query), vector).await;
    }

    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.store.is_empty().await
    }

    /// Returns the cached vector or computes, stores and returns a new one.
    ///
    /// The lock is not held while `compute` runs. Errors are returned as-is
    /// and nothing is stored.
    pub async fn get_or_compute<F, Fut, E>(&self, query: &str, compute: F) -> Result<Vec<f32>, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Vec<f32>, E>>,
    {
        let key = normalize_key(query);
        if let Some(hit) = self.store.get(&key).await {
            return Ok(hit);
        }

        let vector = compute(key.clone()).await?;
        self.store.put(key, vector.clone()).await;
        Ok(vector)
    }
}

fn normalize_key(query: &str) -> String {
    query.trim().to_string()
}
