//! Typed property bags for the two datasets.
//!
//! Source rows come out of a CSV/GeoJSON pipeline, so numeric columns may
//! arrive as integers, floats or numeric strings, and any column may be null.
//! Every field is therefore optional and decoded leniently: a value of the
//! wrong shape becomes `None` instead of failing the whole collection.

use serde::{Deserialize, Serialize};

/// Per-country, per-year aggregate from the annual conflict dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionProperties {
    #[serde(default, deserialize_with = "lenient::text")]
    pub country_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub iso3: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub year: Option<i64>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub intensity_level: Option<i64>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub intensity_level_max: Option<i64>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub type_of_conflict: Option<i64>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub incompatibility: Option<i64>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub conflicts_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub conflict_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub conflict_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub side_a: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub side_b: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub territory_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub version: Option<String>,
}

impl RegionProperties {
    /// Highest intensity recorded for the country-year, 0 when unknown.
    pub fn max_intensity(&self) -> i64 {
        self.intensity_level_max
            .or(self.intensity_level)
            .unwrap_or(0)
    }
}

/// A single georeferenced event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventProperties {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub year: Option<i64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub conflict_new_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub conflict_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub conflict_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub dyad_new_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub dyad_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub type_of_violence: Option<i64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub side_a: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub side_b: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub adm_1: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub adm_2: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub where_coordinates: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub date_start: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub date_end: Option<String>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub date_prec: Option<i64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub best: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub low: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub high: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub deaths_a: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub deaths_b: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub deaths_civilians: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub deaths_unknown: Option<f64>,
}

impl EventProperties {
    /// Conflict identifier, preferring the newer id column.
    pub fn conflict_ref(&self) -> Option<&str> {
        self.conflict_new_id
            .as_deref()
            .or(self.conflict_id.as_deref())
    }
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(value_to_number(&Value::deserialize(d)?))
    }

    pub(super) fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(value_to_number(&Value::deserialize(d)?)
            .filter(|n| n.fract() == 0.0 && n.abs() < 9.0e15)
            .map(|n| n as i64))
    }

    pub(super) fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(value_to_text(&Value::deserialize(d)?))
    }

    pub(super) fn text_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items.iter().filter_map(value_to_text).collect(),
            other => value_to_text(&other).into_iter().collect(),
        })
    }

    fn value_to_number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite())
    }

    fn value_to_text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("nan"))
                    .then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("{}", f as i64),
                _ => n.to_string(),
            }),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}
