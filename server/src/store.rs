use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{error, info, warn};

use conflict_map_shared::{Feature, FeatureCollection, RawProperties};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Features of one dataset grouped by their `year` property, file order kept
/// within each year.
#[derive(Debug, Default)]
pub struct YearIndex {
    by_year: HashMap<i64, Vec<Feature<RawProperties>>>,
    total: usize,
}

impl YearIndex {
    /// Index a parsed collection. Textual NaN values become null; rows
    /// without a usable year are dropped.
    pub fn from_collection(collection: FeatureCollection<RawProperties>) -> Self {
        let mut index = Self::default();
        let mut skipped = 0usize;

        for mut feature in collection.features {
            for value in feature.properties.values_mut() {
                scrub_nan(value);
            }
            let Some(year) = feature.properties.get("year").and_then(as_integer) else {
                skipped += 1;
                continue;
            };
            index.by_year.entry(year).or_default().push(feature);
            index.total += 1;
        }

        if skipped > 0 {
            warn!(skipped, "dropped features without a year");
        }
        index
    }

    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let collection = serde_json::from_slice::<FeatureCollection<RawProperties>>(&raw)
            .map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_collection(collection))
    }

    pub fn year(&self, year: i64) -> &[Feature<RawProperties>] {
        self.by_year.get(&year).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn year_span(&self) -> Option<(i64, i64)> {
        let min = self.by_year.keys().min()?;
        let max = self.by_year.keys().max()?;
        Some((*min, *max))
    }
}

/// Both datasets. A dataset that failed to load is `None` and its endpoint
/// answers 503.
#[derive(Debug, Default)]
pub struct DatasetStore {
    pub events: Option<YearIndex>,
    pub regions: Option<YearIndex>,
}

impl DatasetStore {
    pub async fn load(events_path: &Path, regions_path: &Path) -> Self {
        Self {
            events: load_logged("events", events_path).await,
            regions: load_logged("regions", regions_path).await,
        }
    }
}

async fn load_logged(label: &str, path: &Path) -> Option<YearIndex> {
    match YearIndex::load(path).await {
        Ok(index) => {
            info!(
                dataset = label,
                path = %path.display(),
                features = index.len(),
                years = ?index.year_span(),
                "dataset loaded"
            );
            Some(index)
        }
        Err(e) => {
            error!(dataset = label, error = %e, "dataset unavailable");
            None
        }
    }
}

pub(crate) fn scrub_nan(value: &mut Value) {
    if matches!(value, Value::String(s) if s.trim().eq_ignore_ascii_case("nan")) {
        *value = Value::Null;
        return;
    }
    match value {
        Value::Array(items) => items.iter_mut().for_each(scrub_nan),
        Value::Object(map) => map.values_mut().for_each(scrub_nan),
        _ => {}
    }
}

pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

pub(crate) fn as_integer(value: &Value) -> Option<i64> {
    as_number(value)
        .filter(|n| n.fract() == 0.0)
        .map(|n| n as i64)
}

pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
