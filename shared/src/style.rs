use crate::{EventProperties, RegionProperties};

pub const OUTLINE_COLOR: &str = "#222222";
pub const NEUTRAL_COLOR: &str = "#888888";
/// Reframing never zooms in further than this.
pub const MAX_FIT_ZOOM: u8 = 4;

/// Visual style for one rendered feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStyle {
    pub stroke: &'static str,
    pub weight: f32,
    pub fill: &'static str,
    pub fill_opacity: f32,
    /// Marker radius in pixels; `None` for area features.
    pub radius: Option<f32>,
}

/// Fatality band colour for an event's best estimate.
pub fn color_for_best(best: Option<f64>) -> &'static str {
    match best {
        Some(b) if b.is_finite() && b < 25.0 => "#4da6ff",
        Some(b) if b.is_finite() && b < 100.0 => "#ffa500",
        Some(b) if b.is_finite() => "#ff0000",
        _ => NEUTRAL_COLOR,
    }
}

pub fn radius_for_best(best: Option<f64>) -> f32 {
    match best {
        Some(b) if b.is_finite() && b >= 100.0 => 10.0,
        Some(b) if b.is_finite() && b >= 25.0 => 8.0,
        _ => 6.0,
    }
}

/// Fill colour and opacity for a country-year's maximum intensity.
pub fn fill_for_intensity(max_intensity: i64) -> (&'static str, f32) {
    if max_intensity >= 2 {
        ("#ff0000", 0.45)
    } else if max_intensity >= 1 {
        ("#ffa500", 0.30)
    } else {
        (NEUTRAL_COLOR, 0.0)
    }
}

pub fn event_style(props: &EventProperties) -> FeatureStyle {
    FeatureStyle {
        stroke: OUTLINE_COLOR,
        weight: 1.0,
        fill: color_for_best(props.best),
        fill_opacity: 0.85,
        radius: Some(radius_for_best(props.best)),
    }
}

pub fn region_style(props: &RegionProperties) -> FeatureStyle {
    let (fill, fill_opacity) = fill_for_intensity(props.max_intensity());
    FeatureStyle {
        stroke: OUTLINE_COLOR,
        weight: 1.0,
        fill,
        fill_opacity,
        radius: None,
    }
}
