use std::path::PathBuf;

pub const DEFAULT_SERVER_PORT: u16 = 8000;
pub const DEFAULT_CONFLICTS_GEOJSON: &str = "data/processed/conflicts_events.geojson";
pub const DEFAULT_CONFLICT_COUNTRIES_GEOJSON: &str = "data/processed/conflict_countries.geojson";

pub const DEFAULT_PAGE_SIZE: usize = 10_000;
pub const DEFAULT_API_MAX_SIZE: usize = 50_000;

pub const DEFAULT_RESPONSE_CACHE_TTL_SECS: i64 = 3600; // 1 hour
pub const CACHE_EVICTION_INTERVAL_SECS: u64 = 300; // 5 minutes
pub const DEFAULT_MAX_RESPONSE_CACHE_ENTRIES: usize = 1024;

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn conflicts_geojson_path() -> PathBuf {
    path_var("CONFLICTS_GEOJSON", DEFAULT_CONFLICTS_GEOJSON)
}

pub fn conflict_countries_geojson_path() -> PathBuf {
    path_var(
        "CONFLICT_COUNTRIES_GEOJSON",
        DEFAULT_CONFLICT_COUNTRIES_GEOJSON,
    )
}

pub fn api_max_size() -> usize {
    std::env::var("API_MAX_SIZE")
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_API_MAX_SIZE)
}

pub fn response_cache_enabled() -> bool {
    std::env::var("RESPONSE_CACHE_ENABLED")
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(false)
}

pub fn response_cache_ttl_secs() -> i64 {
    std::env::var("RESPONSE_CACHE_TTL_SECS")
        .ok()
        .and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_RESPONSE_CACHE_TTL_SECS)
}

pub fn max_response_cache_entries() -> usize {
    std::env::var("MAX_RESPONSE_CACHE_ENTRIES")
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_RESPONSE_CACHE_ENTRIES)
}

fn path_var(name: &str, default: &str) -> PathBuf {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}
