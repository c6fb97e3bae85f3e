use std::time::Duration;

use conflict_map_shared::{FilterField, FilterSet};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_MIN_YEAR: i32 = 1946;
pub const DEFAULT_MAX_YEAR: i32 = 2023;
pub const DEFAULT_PLAY_INTERVAL_MS: u64 = 1500;
pub const DEFAULT_COMMIT_DEBOUNCE_MS: u64 = 150;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 3;

/// What happens to a load that is already in flight when playback stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopPolicy {
    /// The run completes and renders normally.
    #[default]
    LetInFlightRender,
    /// The run completes but its results are dropped, and any queued request
    /// is forgotten. The year cursor keeps the dropped year, so it can lead
    /// the map until the next load.
    DiscardInFlight,
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub api_base: String,
    pub min_year: i32,
    pub max_year: i32,
    pub start_year: i32,
    pub play_interval: Duration,
    /// `None` disables debounced commits from drag input.
    pub commit_debounce: Option<Duration>,
    pub stop_policy: StopPolicy,
    pub http_timeout: Duration,
    pub http_connect_timeout: Duration,
    pub initial_filters: FilterSet,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            min_year: DEFAULT_MIN_YEAR,
            max_year: DEFAULT_MAX_YEAR,
            start_year: DEFAULT_MIN_YEAR,
            play_interval: Duration::from_millis(DEFAULT_PLAY_INTERVAL_MS),
            commit_debounce: Some(Duration::from_millis(DEFAULT_COMMIT_DEBOUNCE_MS)),
            stop_policy: StopPolicy::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            http_connect_timeout: Duration::from_secs(DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
            initial_filters: FilterSet::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_env() -> Self {
        let min_year = env_parse::<i32>("MIN_YEAR").unwrap_or(DEFAULT_MIN_YEAR);
        let max_year = env_parse::<i32>("MAX_YEAR")
            .filter(|year| *year >= min_year)
            .unwrap_or(DEFAULT_MAX_YEAR.max(min_year));
        let start_year = env_parse::<i32>("START_YEAR")
            .unwrap_or(min_year)
            .clamp(min_year, max_year);

        Self {
            api_base: api_base(),
            min_year,
            max_year,
            start_year,
            play_interval: play_interval(),
            commit_debounce: commit_debounce(),
            stop_policy: stop_policy(),
            http_timeout: env_secs("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
            http_connect_timeout: env_secs(
                "HTTP_CONNECT_TIMEOUT_SECS",
                DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
            ),
            initial_filters: initial_filters(),
        }
    }
}

pub fn api_base() -> String {
    std::env::var("CONFLICT_API_BASE")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

pub fn play_interval() -> Duration {
    env_parse::<u64>("PLAY_INTERVAL_MS")
        .filter(|value| *value > 0)
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_PLAY_INTERVAL_MS))
}

pub fn commit_debounce() -> Option<Duration> {
    let ms = env_parse::<u64>("COMMIT_DEBOUNCE_MS").unwrap_or(DEFAULT_COMMIT_DEBOUNCE_MS);
    (ms > 0).then(|| Duration::from_millis(ms))
}

pub fn stop_policy() -> StopPolicy {
    std::env::var("STOP_DISCARDS_IN_FLIGHT")
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            if matches!(normalized.as_str(), "1" | "true" | "yes" | "on") {
                StopPolicy::DiscardInFlight
            } else {
                StopPolicy::LetInFlightRender
            }
        })
        .unwrap_or_default()
}

fn initial_filters() -> FilterSet {
    let mut filters = FilterSet::default();
    for field in FilterField::ALL {
        let var = format!("FILTER_{}", field.key().to_ascii_uppercase());
        let Ok(raw) = std::env::var(&var) else {
            continue;
        };
        if let Err(e) = filters.set_raw(field, &raw) {
            tracing::warn!(var = %var, error = %e, "ignoring invalid initial filter");
        }
    }
    filters
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
}

fn env_secs(name: &str, default: u64) -> Duration {
    env_parse::<u64>(name)
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conflict_map_shared::{IntensityLevel, ViolenceType};

    const VARS: [&str; 14] = [
        "CONFLICT_API_BASE",
        "MIN_YEAR",
        "MAX_YEAR",
        "START_YEAR",
        "PLAY_INTERVAL_MS",
        "COMMIT_DEBOUNCE_MS",
        "STOP_DISCARDS_IN_FLIGHT",
        "HTTP_TIMEOUT_SECS",
        "HTTP_CONNECT_TIMEOUT_SECS",
        "FILTER_REGION",
        "FILTER_TYPE_OF_VIOLENCE",
        "FILTER_TYPE_OF_CONFLICT",
        "FILTER_INTENSITY_LEVEL",
        "FILTER_MIN_BEST",
    ];

    /// Every known variable, unset unless overridden.
    fn env_with(
        overrides: &[(&'static str, &'static str)],
    ) -> Vec<(&'static str, Option<&'static str>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| *value);
                (*name, value)
            })
            .collect()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        temp_env::with_vars(env_with(&[]), || {
            let config = ViewerConfig::from_env();
            assert_eq!(config.api_base, DEFAULT_API_BASE);
            assert_eq!(config.min_year, 1946);
            assert_eq!(config.max_year, 2023);
            assert_eq!(config.start_year, 1946);
            assert_eq!(config.play_interval, Duration::from_millis(1500));
            assert_eq!(config.commit_debounce, Some(Duration::from_millis(150)));
            assert_eq!(config.stop_policy, StopPolicy::LetInFlightRender);
            assert!(config.initial_filters.is_empty());
        });
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let vars = env_with(&[
            ("PLAY_INTERVAL_MS", "0"),
            ("HTTP_TIMEOUT_SECS", "soon"),
            ("MAX_YEAR", "1900"),
            ("START_YEAR", "3000"),
        ]);
        temp_env::with_vars(vars, || {
            let config = ViewerConfig::from_env();
            assert_eq!(config.play_interval, Duration::from_millis(1500));
            assert_eq!(config.http_timeout, Duration::from_secs(10));
            assert_eq!(config.max_year, 2023);
            assert_eq!(config.start_year, 2023);
        });
    }

    #[test]
    fn explicit_values_are_honoured() {
        let vars = env_with(&[
            ("CONFLICT_API_BASE", "https://api.example.org/"),
            ("START_YEAR", "1995"),
            ("COMMIT_DEBOUNCE_MS", "0"),
            ("STOP_DISCARDS_IN_FLIGHT", "yes"),
            ("FILTER_TYPE_OF_VIOLENCE", "2"),
            ("FILTER_INTENSITY_LEVEL", "7"),
        ]);
        temp_env::with_vars(vars, || {
            let config = ViewerConfig::from_env();
            assert_eq!(config.api_base, "https://api.example.org");
            assert_eq!(config.start_year, 1995);
            assert_eq!(config.commit_debounce, None);
            assert_eq!(config.stop_policy, StopPolicy::DiscardInFlight);
            assert_eq!(
                config.initial_filters.type_of_violence,
                Some(ViolenceType::NonState)
            );
            let rejected: Option<IntensityLevel> = config.initial_filters.intensity_level;
            assert_eq!(rejected, None);
        });
    }
}
