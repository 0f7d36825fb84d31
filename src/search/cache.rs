use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::types::RecId;

/// Normalized request signature the cache is keyed on. Only what
/// changes the evaluated identifier set is part of the key: the
/// cached set is the unfiltered evaluation, and collection scoping,
/// sort and pagination are applied after retrieval.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSignature {
    pub query: String,
    pub field: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    ids: Vec<RecId>,
    created: DateTime<Utc>,
}

/// Memoizes query → identifier list for repeat requests within one
/// index generation. Entries leave by LRU pressure, TTL expiry, or
/// explicit administrative invalidation. The core never infers index
/// mutation on its own.
pub struct SearchCache {
    inner: RwLock<LruCache<RequestSignature, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

impl SearchCache {
    pub fn new(capacity: usize, ttl_secs: i64) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        SearchCache {
            inner: RwLock::new(LruCache::new(cap)),
            ttl: Duration::seconds(ttl_secs),
            capacity: capacity.max(1),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &RequestSignature) -> Option<Vec<RecId>> {
        let mut cache = self.inner.write();
        match cache.get(key) {
            Some(entry) if Utc::now() - entry.created <= self.ttl => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Some(entry.ids.clone())
            }
            Some(_) => {
                cache.pop(key);
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a freshly computed entry. Two racing computations of the
    /// same signature produce identical content, so last-put-wins is
    /// harmless.
    pub fn put(&self, key: RequestSignature, ids: Vec<RecId>) {
        self.inner.write().put(
            key,
            CacheEntry {
                ids,
                created: Utc::now(),
            },
        );
    }

    pub fn remove(&self, key: &RequestSignature) -> bool {
        self.inner.write().pop(key).is_some()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Snapshot of live entries for operational inspection.
    pub fn entries(&self) -> Vec<(RequestSignature, DateTime<Utc>, usize)> {
        self.inner
            .read()
            .iter()
            .map(|(k, e)| (k.clone(), e.created, e.ids.len()))
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            entries: self.inner.read().len(),
            capacity: self.capacity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}
