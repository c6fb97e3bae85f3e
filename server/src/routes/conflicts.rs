use std::collections::{BTreeMap, HashMap};

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use conflict_map_shared::{Feature, FeatureCollection, Geometry, RawProperties};

use crate::config::DEFAULT_PAGE_SIZE;
use crate::routes::json_bytes_response;
use crate::state::AppState;
use crate::store::{YearIndex, as_integer, as_number, as_text};

const DATASET_CACHE_CONTROL: &str = "public, max-age=300";

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub year: i64,
    pub size: Option<i64>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub type_of_violence: Option<i64>,
    pub min_best: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CountriesQuery {
    pub year: i64,
    pub size: Option<i64>,
    pub region: Option<String>,
    pub country_name: Option<String>,
    pub type_of_conflict: Option<i64>,
    pub intensity_level: Option<i64>,
}

/// One row predicate on a property bag.
#[derive(Debug, Clone, PartialEq)]
enum Criterion<'a> {
    Text(&'static str, &'a str),
    Code(&'static str, i64),
    AtLeast(&'static str, i64),
}

impl Criterion<'_> {
    fn matches(&self, properties: &RawProperties) -> bool {
        match *self {
            Criterion::Text(field, expected) => properties
                .get(field)
                .and_then(as_text)
                .is_some_and(|value| value == expected),
            Criterion::Code(field, expected) => properties
                .get(field)
                .and_then(as_integer)
                .is_some_and(|value| value == expected),
            Criterion::AtLeast(field, floor) => properties
                .get(field)
                .and_then(as_number)
                .is_some_and(|value| value >= floor as f64),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

impl EventsQuery {
    fn criteria(&self) -> Vec<Criterion<'_>> {
        let mut criteria = Vec::new();
        if let Some(region) = non_empty(&self.region) {
            criteria.push(Criterion::Text("region", region));
        }
        if let Some(country) = non_empty(&self.country) {
            criteria.push(Criterion::Text("country", country));
        }
        if let Some(code) = self.type_of_violence {
            criteria.push(Criterion::Code("type_of_violence", code));
        }
        if let Some(floor) = self.min_best {
            criteria.push(Criterion::AtLeast("best", floor));
        }
        criteria
    }

    fn cache_filters(&self) -> BTreeMap<&'static str, Value> {
        let mut filters = BTreeMap::new();
        if let Some(region) = non_empty(&self.region) {
            filters.insert("region", json!(region));
        }
        if let Some(country) = non_empty(&self.country) {
            filters.insert("country", json!(country));
        }
        if let Some(code) = self.type_of_violence {
            filters.insert("type_of_violence", json!(code));
        }
        if let Some(floor) = self.min_best {
            filters.insert("min_best", json!(floor));
        }
        filters
    }
}

impl CountriesQuery {
    fn criteria(&self) -> Vec<Criterion<'_>> {
        let mut criteria = Vec::new();
        if let Some(region) = non_empty(&self.region) {
            criteria.push(Criterion::Text("region", region));
        }
        if let Some(name) = non_empty(&self.country_name) {
            criteria.push(Criterion::Text("country_name", name));
        }
        if let Some(code) = self.type_of_conflict {
            criteria.push(Criterion::Code("type_of_conflict", code));
        }
        if let Some(level) = self.intensity_level {
            criteria.push(Criterion::Code("intensity_level", level));
        }
        criteria
    }

    fn cache_filters(&self) -> BTreeMap<&'static str, Value> {
        let mut filters = BTreeMap::new();
        if let Some(region) = non_empty(&self.region) {
            filters.insert("region", json!(region));
        }
        if let Some(name) = non_empty(&self.country_name) {
            filters.insert("country_name", json!(name));
        }
        if let Some(code) = self.type_of_conflict {
            filters.insert("type_of_conflict", json!(code));
        }
        if let Some(level) = self.intensity_level {
            filters.insert("intensity_level", json!(level));
        }
        filters
    }
}

pub(crate) fn clamp_size(size: Option<i64>, max_size: usize) -> usize {
    let requested = size.unwrap_or(DEFAULT_PAGE_SIZE as i64).max(1);
    usize::try_from(requested).map_or(max_size, |requested| requested.min(max_size))
}

pub(crate) fn cache_key(
    prefix: &str,
    year: i64,
    size: usize,
    filters: &BTreeMap<&'static str, Value>,
) -> String {
    let filters = serde_json::to_string(filters).unwrap_or_default();
    format!("{prefix}:year={year}:size={size}:filters={filters}")
}

/// Events for one year. Rows without a geometry but with numeric
/// `longitude`/`latitude` are given a point.
pub async fn get_conflicts(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Response {
    state.observability.record_conflicts_request();
    let Some(index) = state.store.events.as_ref() else {
        return unavailable("events");
    };

    let size = clamp_size(query.size, state.max_size);
    let key = cache_key("conflicts", query.year, size, &query.cache_filters());
    serve_cached(&state, key, || {
        let criteria = query.criteria();
        select_rows(index, query.year, &criteria, size)
            .map(with_point_fallback)
            .collect()
    })
}

/// One feature per country for one year, aggregated over that country's
/// conflict rows.
pub async fn get_conflict_countries(
    State(state): State<AppState>,
    Query(query): Query<CountriesQuery>,
) -> Response {
    state.observability.record_conflict_countries_request();
    let Some(index) = state.store.regions.as_ref() else {
        return unavailable("regions");
    };

    let size = clamp_size(query.size, state.max_size);
    let key = cache_key(
        "conflict_countries",
        query.year,
        size,
        &query.cache_filters(),
    );
    serve_cached(&state, key, || {
        let criteria = query.criteria();
        aggregate_countries(select_rows(index, query.year, &criteria, size))
    })
}

fn select_rows<'a>(
    index: &'a YearIndex,
    year: i64,
    criteria: &'a [Criterion<'a>],
    size: usize,
) -> impl Iterator<Item = &'a Feature<RawProperties>> {
    index
        .year(year)
        .iter()
        .filter(move |feature| {
            criteria
                .iter()
                .all(|criterion| criterion.matches(&feature.properties))
        })
        .take(size)
}

fn serve_cached(
    state: &AppState,
    key: String,
    build: impl FnOnce() -> Vec<Feature<RawProperties>>,
) -> Response {
    let now = Utc::now();
    if let Some(body) = state.cached_body(&key, now) {
        return json_bytes_response(body, DATASET_CACHE_CONTROL);
    }

    let collection = FeatureCollection::new(build());
    let body = match serde_json::to_vec(&collection) {
        Ok(raw) => Bytes::from(raw),
        Err(e) => {
            error!(error = %e, %key, "failed to serialize feature collection");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    state.store_body(key, body.clone(), now);
    json_bytes_response(body, DATASET_CACHE_CONTROL)
}

fn unavailable(dataset: &str) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "detail": format!("{dataset} dataset unavailable") })),
    )
        .into_response()
}

fn with_point_fallback(feature: &Feature<RawProperties>) -> Feature<RawProperties> {
    let geometry = feature.geometry.clone().or_else(|| {
        let lon = feature.properties.get("longitude").and_then(as_number)?;
        let lat = feature.properties.get("latitude").and_then(as_number)?;
        Some(Geometry::point(lon, lat))
    });
    Feature::new(geometry, feature.properties.clone())
}

struct CountryAggregate {
    geometry: Geometry,
    properties: RawProperties,
    intensity_max: i64,
    count: u64,
    conflict_ids: Vec<Value>,
}

fn aggregate_countries<'a>(
    rows: impl Iterator<Item = &'a Feature<RawProperties>>,
) -> Vec<Feature<RawProperties>> {
    let mut aggregates: Vec<CountryAggregate> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let Some(geometry) = row.geometry.as_ref() else {
            continue;
        };
        let Some(name) = row
            .properties
            .get("country_name")
            .and_then(as_text)
            .filter(|name| !name.is_empty())
        else {
            continue;
        };
        let intensity = row
            .properties
            .get("intensity_level")
            .and_then(as_integer)
            .unwrap_or(0);
        let conflict_id = row
            .properties
            .get("conflict_id")
            .filter(|id| !id.is_null())
            .cloned();

        match slots.get(&name) {
            Some(&slot) => {
                let aggregate = &mut aggregates[slot];
                aggregate.count += 1;
                aggregate.intensity_max = aggregate.intensity_max.max(intensity);
                aggregate.conflict_ids.extend(conflict_id);
            }
            None => {
                slots.insert(name, aggregates.len());
                aggregates.push(CountryAggregate {
                    geometry: geometry.clone(),
                    properties: row.properties.clone(),
                    intensity_max: intensity,
                    count: 1,
                    conflict_ids: conflict_id.into_iter().collect(),
                });
            }
        }
    }

    aggregates
        .into_iter()
        .map(|aggregate| {
            let mut properties = aggregate.properties;
            properties.insert(
                "intensity_level_max".to_string(),
                json!(aggregate.intensity_max),
            );
            properties.insert("conflicts_count".to_string(), json!(aggregate.count));
            properties.insert(
                "conflict_ids".to_string(),
                Value::Array(aggregate.conflict_ids),
            );
            Feature::new(Some(aggregate.geometry), properties)
        })
        .collect()
}
