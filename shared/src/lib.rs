pub mod dataset;
pub mod filters;
pub mod geo;
pub mod popup;
pub mod properties;
pub mod style;

pub use dataset::*;
pub use filters::*;
pub use geo::*;
pub use popup::{PopupContent, PopupRow, PopupSection, event_popup, region_popup};
pub use properties::*;
pub use style::{FeatureStyle, MAX_FIT_ZOOM, event_style, region_style};
