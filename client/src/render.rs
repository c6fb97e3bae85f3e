use tracing::info;

use conflict_map_shared::{
    Bounds, EventProperties, FeatureCollection, FeatureStyle, PopupContent, RegionProperties,
    event_popup, event_style, region_popup, region_style,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Regions,
    Points,
}

impl LayerKind {
    pub const fn label(self) -> &'static str {
        match self {
            LayerKind::Regions => "regions",
            LayerKind::Points => "points",
        }
    }
}

/// A parsed collection plus the functions that turn its properties into
/// visual style and popup content.
pub struct Layer<P> {
    pub year: i32,
    pub features: FeatureCollection<P>,
    pub style: fn(&P) -> FeatureStyle,
    pub popup: fn(&P) -> PopupContent,
}

impl<P> Layer<P> {
    pub fn styled(&self) -> impl Iterator<Item = (&P, FeatureStyle)> + '_ {
        self.features
            .features
            .iter()
            .map(|feature| (&feature.properties, (self.style)(&feature.properties)))
    }
}

pub enum LayerContent {
    Regions(Layer<RegionProperties>),
    Points(Layer<EventProperties>),
}

impl LayerContent {
    pub fn regions(year: i32, features: FeatureCollection<RegionProperties>) -> Self {
        LayerContent::Regions(Layer {
            year,
            features,
            style: region_style,
            popup: region_popup,
        })
    }

    pub fn points(year: i32, features: FeatureCollection<EventProperties>) -> Self {
        LayerContent::Points(Layer {
            year,
            features,
            style: event_style,
            popup: event_popup,
        })
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            LayerContent::Regions(_) => LayerKind::Regions,
            LayerContent::Points(_) => LayerKind::Points,
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            LayerContent::Regions(layer) => layer.year,
            LayerContent::Points(layer) => layer.year,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LayerContent::Regions(layer) => layer.features.len(),
            LayerContent::Points(layer) => layer.features.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            LayerContent::Regions(layer) => layer.features.bounds(),
            LayerContent::Points(layer) => layer.features.bounds(),
        }
    }
}

/// The map surface the loader draws onto.
pub trait RenderAdapter {
    fn clear(&mut self, kind: LayerKind);
    fn add(&mut self, layer: LayerContent);
    fn fit_to_bounds(&mut self, bounds: Bounds, max_zoom: u8);
}

/// Headless renderer: keeps the last added layer of each kind and logs every
/// operation.
#[derive(Default)]
pub struct TracingRenderer {
    regions: Option<LayerContent>,
    points: Option<LayerContent>,
}

impl TracingRenderer {
    pub fn layer(&self, kind: LayerKind) -> Option<&LayerContent> {
        match kind {
            LayerKind::Regions => self.regions.as_ref(),
            LayerKind::Points => self.points.as_ref(),
        }
    }
}

impl RenderAdapter for TracingRenderer {
    fn clear(&mut self, kind: LayerKind) {
        let slot = match kind {
            LayerKind::Regions => &mut self.regions,
            LayerKind::Points => &mut self.points,
        };
        if let Some(old) = slot.take() {
            info!(layer = kind.label(), year = old.year(), "layer cleared");
        }
    }

    fn add(&mut self, layer: LayerContent) {
        let kind = layer.kind();
        match &layer {
            LayerContent::Regions(l) => {
                let at_war = l
                    .styled()
                    .filter(|(props, _)| props.max_intensity() >= 2)
                    .count();
                info!(layer = kind.label(), year = l.year, features = l.features.len(), at_war, "layer added");
            }
            LayerContent::Points(l) => {
                let fatalities: f64 = l.styled().filter_map(|(props, _)| props.best).sum();
                info!(layer = kind.label(), year = l.year, features = l.features.len(), fatalities, "layer added");
            }
        }
        match kind {
            LayerKind::Regions => self.regions = Some(layer),
            LayerKind::Points => self.points = Some(layer),
        }
    }

    fn fit_to_bounds(&mut self, bounds: Bounds, max_zoom: u8) {
        let (lon, lat) = bounds.center();
        info!(
            min_lon = bounds.min_lon,
            min_lat = bounds.min_lat,
            max_lon = bounds.max_lon,
            max_lat = bounds.max_lat,
            center_lon = lon,
            center_lat = lat,
            max_zoom,
            "view fitted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conflict_map_shared::{Feature, Geometry};

    #[test]
    fn layer_content_reports_kind_and_bounds() {
        let features = FeatureCollection::new(vec![Feature::new(
            Some(Geometry::point(12.0, 8.0)),
            EventProperties {
                best: Some(150.0),
                ..EventProperties::default()
            },
        )]);
        let layer = LayerContent::points(2005, features);

        assert_eq!(layer.kind(), LayerKind::Points);
        assert_eq!(layer.year(), 2005);
        assert_eq!(layer.bounds(), Some(Bounds::point(12.0, 8.0)));
        if let LayerContent::Points(l) = &layer {
            let styles: Vec<FeatureStyle> = l.styled().map(|(_, s)| s).collect();
            assert_eq!(styles[0].radius, Some(10.0));
            assert_eq!((l.popup)(&l.features.features[0].properties).heading, "Event");
        }
    }

    #[test]
    fn tracing_renderer_replaces_and_clears_layers() {
        let mut renderer = TracingRenderer::default();
        renderer.add(LayerContent::regions(1970, FeatureCollection::default()));
        renderer.add(LayerContent::regions(1971, FeatureCollection::default()));
        assert_eq!(
            renderer.layer(LayerKind::Regions).map(LayerContent::year),
            Some(1971)
        );

        renderer.clear(LayerKind::Regions);
        assert!(renderer.layer(LayerKind::Regions).is_none());
        assert!(renderer.layer(LayerKind::Points).is_none());
    }
}
