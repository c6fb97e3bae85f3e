use std::fmt::Write as _;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::state::{AppState, ObservabilitySnapshot};
use crate::store::YearIndex;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "events": state.store.events.as_ref().map(YearIndex::len),
        "regions": state.store.regions.as_ref().map(YearIndex::len),
        "cache_enabled": state.response_cache.is_some(),
        "cache_entries": state.cache_entries(),
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = render_prometheus_metrics(
        state.store.events.as_ref().map(YearIndex::len),
        state.store.regions.as_ref().map(YearIndex::len),
        state.cache_entries(),
        state.observability.snapshot(),
    );

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

pub async fn cache_clear(State(state): State<AppState>) -> Json<serde_json::Value> {
    let Some(cache) = state.response_cache.as_ref() else {
        return Json(serde_json::json!({
            "ok": false,
            "cache_enabled": false,
            "cleared": 0,
        }));
    };

    let cleared = cache.len();
    cache.clear();
    tracing::info!(cleared, "response cache cleared");
    Json(serde_json::json!({
        "ok": true,
        "cache_enabled": true,
        "cleared": cleared,
    }))
}

fn render_prometheus_metrics(
    events: Option<usize>,
    regions: Option<usize>,
    cache_entries: usize,
    observability: ObservabilitySnapshot,
) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "# HELP conflict_map_dataset_available Whether a dataset loaded at startup (1 or 0)."
    );
    let _ = writeln!(body, "# TYPE conflict_map_dataset_available gauge");
    let _ = writeln!(
        body,
        "conflict_map_dataset_available{{dataset=\"events\"}} {}",
        u8::from(events.is_some())
    );
    let _ = writeln!(
        body,
        "conflict_map_dataset_available{{dataset=\"regions\"}} {}",
        u8::from(regions.is_some())
    );

    let _ = writeln!(
        body,
        "# HELP conflict_map_dataset_features Features indexed per dataset."
    );
    let _ = writeln!(body, "# TYPE conflict_map_dataset_features gauge");
    let _ = writeln!(
        body,
        "conflict_map_dataset_features{{dataset=\"events\"}} {}",
        events.unwrap_or(0)
    );
    let _ = writeln!(
        body,
        "conflict_map_dataset_features{{dataset=\"regions\"}} {}",
        regions.unwrap_or(0)
    );

    let _ = writeln!(
        body,
        "# HELP conflict_map_response_cache_entries Current number of cached responses."
    );
    let _ = writeln!(body, "# TYPE conflict_map_response_cache_entries gauge");
    let _ = writeln!(body, "conflict_map_response_cache_entries {cache_entries}");

    let counters = [
        (
            "conflict_map_conflicts_requests_total",
            "Total /conflicts requests.",
            observability.conflicts_requests_total,
        ),
        (
            "conflict_map_conflict_countries_requests_total",
            "Total /conflict-countries requests.",
            observability.conflict_countries_requests_total,
        ),
        (
            "conflict_map_response_cache_hits_total",
            "Dataset responses served from the response cache.",
            observability.response_cache_hits_total,
        ),
        (
            "conflict_map_response_cache_misses_total",
            "Dataset responses built because no fresh cache entry existed.",
            observability.response_cache_misses_total,
        ),
        (
            "conflict_map_response_cache_evictions_total",
            "Cached responses removed by the expiry sweep.",
            observability.response_cache_evictions_total,
        ),
    ];
    for (name, help, value) in counters {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} counter");
        let _ = writeln!(body, "{name} {value}");
    }

    body
}
