use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::CACHE_EVICTION_INTERVAL_SECS;
use crate::state::AppState;

pub async fn run(state: AppState) {
    if state.response_cache.is_none() {
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(CACHE_EVICTION_INTERVAL_SECS));

    loop {
        interval.tick().await;
        evict_expired(&state, Utc::now());
    }
}

pub(crate) fn evict_expired(state: &AppState, now: DateTime<Utc>) -> usize {
    let Some(cache) = state.response_cache.as_ref() else {
        return 0;
    };

    let before = cache.len();
    cache.retain(|_, cached| {
        now.signed_duration_since(cached.cached_at).num_seconds() < state.cache_ttl_secs
    });

    let evicted = before.saturating_sub(cache.len());
    if evicted > 0 {
        state.observability.record_cache_evictions(evicted as u64);
        info!(
            "evicted {evicted} stale response cache entries ({} remaining)",
            cache.len()
        );
    }
    evicted
}
