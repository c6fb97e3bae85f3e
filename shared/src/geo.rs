use serde::{Deserialize, Deserializer, Serialize};

/// Property bag kept verbatim (server side, where rows are passed through).
pub type RawProperties = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionTag {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureTag {
    #[default]
    Feature,
}

/// GeoJSON FeatureCollection with a typed property bag.
///
/// Deserialization only checks presence: the `type` tag must say
/// `FeatureCollection` and `features` must be an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "P: Serialize",
    deserialize = "P: Deserialize<'de> + Default"
))]
pub struct FeatureCollection<P> {
    #[serde(rename = "type")]
    pub tag: CollectionTag,
    pub features: Vec<Feature<P>>,
}

impl<P> FeatureCollection<P> {
    pub fn new(features: Vec<Feature<P>>) -> Self {
        Self {
            tag: CollectionTag::FeatureCollection,
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounding box over every position of every geometry, or `None` when the
    /// collection has no usable coordinates.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut bounds: Option<Bounds> = None;
        for geometry in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            geometry.visit_positions(&mut |lon, lat| {
                bounds = Some(match bounds {
                    Some(mut b) => {
                        b.extend(lon, lat);
                        b
                    }
                    None => Bounds::point(lon, lat),
                });
            });
        }
        bounds
    }
}

impl<P> Default for FeatureCollection<P> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "P: Serialize",
    deserialize = "P: Deserialize<'de> + Default"
))]
pub struct Feature<P> {
    #[serde(rename = "type", default)]
    pub tag: FeatureTag,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: P,
}

impl<P> Feature<P> {
    pub fn new(geometry: Option<Geometry>, properties: P) -> Self {
        Self {
            tag: FeatureTag::Feature,
            geometry,
            properties,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    GeometryCollection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geometries: Vec<Geometry>,
}

impl Geometry {
    pub fn point(lon: f64, lat: f64) -> Self {
        Self {
            kind: GeometryKind::Point,
            coordinates: Some(serde_json::json!([lon, lat])),
            geometries: Vec::new(),
        }
    }

    /// Calls `visit(lon, lat)` for every finite position, at any nesting depth.
    pub fn visit_positions(&self, visit: &mut impl FnMut(f64, f64)) {
        if let Some(coordinates) = &self.coordinates {
            visit_value(coordinates, visit);
        }
        for child in &self.geometries {
            child.visit_positions(visit);
        }
    }
}

fn visit_value(value: &serde_json::Value, visit: &mut impl FnMut(f64, f64)) {
    let Some(items) = value.as_array() else {
        return;
    };
    if items.len() >= 2 && items[0].is_number() && items[1].is_number() {
        let lon = items[0].as_f64().unwrap_or(f64::NAN);
        let lat = items[1].as_f64().unwrap_or(f64::NAN);
        if lon.is_finite() && lat.is_finite() {
            visit(lon, lat);
        }
        return;
    }
    for item in items {
        visit_value(item, visit);
    }
}

/// Axis-aligned lon/lat box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn point(lon: f64, lat: f64) -> Self {
        Self {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        }
    }

    pub fn extend(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
