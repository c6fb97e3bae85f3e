use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::config::{
    DEFAULT_MAX_RESPONSE_CACHE_ENTRIES, api_max_size, max_response_cache_entries,
    response_cache_enabled, response_cache_ttl_secs,
};
use crate::store::DatasetStore;

/// Serialized response body, shared by every hit on the same cache key.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub body: Bytes,
    pub cached_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DatasetStore>,
    /// Present only when response caching is enabled.
    pub response_cache: Option<Arc<DashMap<String, CachedResponse>>>,
    pub cache_ttl_secs: i64,
    /// Upper bound on cached responses; the oldest entries go first.
    pub cache_capacity: usize,
    pub max_size: usize,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    conflicts_requests_total: AtomicU64,
    conflict_countries_requests_total: AtomicU64,
    response_cache_hits_total: AtomicU64,
    response_cache_misses_total: AtomicU64,
    response_cache_evictions_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObservabilitySnapshot {
    pub conflicts_requests_total: u64,
    pub conflict_countries_requests_total: u64,
    pub response_cache_hits_total: u64,
    pub response_cache_misses_total: u64,
    pub response_cache_evictions_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            conflicts_requests_total: self.conflicts_requests_total.load(Ordering::Relaxed),
            conflict_countries_requests_total: self
                .conflict_countries_requests_total
                .load(Ordering::Relaxed),
            response_cache_hits_total: self.response_cache_hits_total.load(Ordering::Relaxed),
            response_cache_misses_total: self.response_cache_misses_total.load(Ordering::Relaxed),
            response_cache_evictions_total: self
                .response_cache_evictions_total
                .load(Ordering::Relaxed),
        }
    }

    pub fn record_conflicts_request(&self) {
        self.conflicts_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict_countries_request(&self) {
        self.conflict_countries_requests_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.response_cache_hits_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.response_cache_misses_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_evictions(&self, count: u64) {
        self.response_cache_evictions_total
            .fetch_add(count, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(store: DatasetStore) -> Self {
        Self::with_options(
            store,
            response_cache_enabled(),
            response_cache_ttl_secs(),
            api_max_size(),
        )
        .with_cache_capacity(max_response_cache_entries())
    }

    pub fn with_options(
        store: DatasetStore,
        cache_enabled: bool,
        cache_ttl_secs: i64,
        max_size: usize,
    ) -> Self {
        Self {
            store: Arc::new(store),
            response_cache: cache_enabled.then(|| Arc::new(DashMap::new())),
            cache_ttl_secs,
            cache_capacity: DEFAULT_MAX_RESPONSE_CACHE_ENTRIES,
            max_size: max_size.max(1),
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity.max(1);
        self
    }

    pub fn cache_entries(&self) -> usize {
        self.response_cache.as_ref().map_or(0, |cache| cache.len())
    }

    /// Fresh cached body for `key`, counting the hit or miss.
    pub fn cached_body(&self, key: &str, now: DateTime<Utc>) -> Option<Bytes> {
        let cache = self.response_cache.as_ref()?;
        let fresh = cache.get(key).and_then(|entry| {
            (now.signed_duration_since(entry.cached_at).num_seconds() < self.cache_ttl_secs)
                .then(|| entry.body.clone())
        });
        match fresh {
            Some(_) => self.observability.record_cache_hit(),
            None => self.observability.record_cache_miss(),
        }
        fresh
    }

    pub fn store_body(&self, key: String, body: Bytes, now: DateTime<Utc>) {
        let Some(cache) = self.response_cache.as_ref() else {
            return;
        };

        if !cache.contains_key(&key) {
            while cache.len() >= self.cache_capacity {
                if !evict_oldest_response(cache) {
                    break;
                }
                self.observability.record_cache_evictions(1);
            }
        }

        cache.insert(
            key,
            CachedResponse {
                body,
                cached_at: now,
            },
        );
    }
}

fn evict_oldest_response(cache: &DashMap<String, CachedResponse>) -> bool {
    let Some(oldest_key) = cache
        .iter()
        .min_by_key(|entry| entry.value().cached_at)
        .map(|entry| entry.key().clone())
    else {
        return false;
    };
    cache.remove(&oldest_key).is_some()
}
