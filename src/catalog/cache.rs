use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared LRU of recently read records, keyed by record id.
pub struct RecordCache<R> {
    cache: Arc<Mutex<LruCache<String, R>>>,
}

impl<R> Clone for RecordCache<R> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<R: Clone> RecordCache<R> {
    /// Returns `None` for a zero capacity, which disables caching.
    pub fn new(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        })
    }

    pub async fn get(&self, key: &str) -> Option<R> {
        let mut cache = self.cache.lock().await;
        cache.get(key).cloned()
    }

    pub async fn put(&self, key: &str, record: R) {
        let mut cache = self.cache.lock().await;
        cache.put(key.to_string(), record);
    }

    pub async fn invalidate(&self, key: &str) {
        let mut cache = self.cache.lock().await;
        cache.pop(key);
    }
}
