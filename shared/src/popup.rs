use crate::{EventProperties, RegionProperties};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupSection {
    pub title: &'static str,
    pub rows: Vec<PopupRow>,
}

/// Structured popup: a heading, a subheading and titled key/value sections.
/// Rows without a value and sections without rows are left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupContent {
    pub heading: String,
    pub subheading: String,
    pub sections: Vec<PopupSection>,
}

#[derive(Default)]
struct SectionBuilder {
    rows: Vec<PopupRow>,
}

impl SectionBuilder {
    fn row(mut self, label: &'static str, value: Option<String>) -> Self {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.rows.push(PopupRow { label, value });
        }
        self
    }

    fn finish(self, title: &'static str, sections: &mut Vec<PopupSection>) {
        if !self.rows.is_empty() {
            sections.push(PopupSection {
                title,
                rows: self.rows,
            });
        }
    }
}

fn num(value: Option<f64>) -> Option<String> {
    value.map(|v| {
        if v.fract() == 0.0 && v.abs() < 9.0e15 {
            format!("{}", v as i64)
        } else {
            v.to_string()
        }
    })
}

fn int(value: Option<i64>) -> Option<String> {
    value.map(|v| v.to_string())
}

pub fn region_popup(p: &RegionProperties) -> PopupContent {
    let mut sections = Vec::new();

    SectionBuilder::default()
        .row("Country", p.country_name.clone())
        .row("ISO3", p.iso3.clone())
        .row("Year", int(p.year))
        .finish("Base", &mut sections);

    let conflict_ids = if p.conflict_ids.is_empty() {
        p.conflict_id.clone()
    } else {
        Some(p.conflict_ids.join(", "))
    };

    SectionBuilder::default()
        .row("Intensity (max)", Some(p.max_intensity().to_string()))
        .row("Type of conflict", int(p.type_of_conflict))
        .row("Incompatibility", int(p.incompatibility))
        .row("Conflicts count (in year)", int(p.conflicts_count))
        .row("Conflict IDs", conflict_ids)
        .row("Side A", p.side_a.clone())
        .row("Side B", p.side_b.clone())
        .row("Territory", p.territory_name.clone())
        .row("Dataset version", p.version.clone())
        .finish("Annual conflict", &mut sections);

    PopupContent {
        heading: p
            .country_name
            .clone()
            .unwrap_or_else(|| "Country".to_string()),
        subheading: format!("Year: {}", int(p.year).unwrap_or_default()),
        sections,
    }
}

pub fn event_popup(p: &EventProperties) -> PopupContent {
    let mut sections = Vec::new();

    SectionBuilder::default()
        .row("Conflict ID", p.conflict_ref().map(str::to_string))
        .row("Dyad ID", p.dyad_new_id.clone())
        .row("Type of violence", int(p.type_of_violence))
        .row("Side A", p.side_a.clone())
        .row("Side B", p.side_b.clone())
        .finish("IDs", &mut sections);

    SectionBuilder::default()
        .row("Region", p.region.clone())
        .row("Country", p.country.clone())
        .row("ADM-1", p.adm_1.clone())
        .row("ADM-2", p.adm_2.clone())
        .row("Where (standardized)", p.where_coordinates.clone())
        .row("Latitude", num(p.latitude))
        .row("Longitude", num(p.longitude))
        .finish("Location", &mut sections);

    SectionBuilder::default()
        .row("Date start", p.date_start.clone())
        .row("Date end", p.date_end.clone())
        .row("Date precision", int(p.date_prec))
        .finish("Time", &mut sections);

    SectionBuilder::default()
        .row("Best estimate fatalities", num(p.best))
        .row("Low estimate", num(p.low))
        .row("High estimate", num(p.high))
        .row("Deaths side A", num(p.deaths_a))
        .row("Deaths side B", num(p.deaths_b))
        .row("Civilian deaths", num(p.deaths_civilians))
        .row("Unknown deaths", num(p.deaths_unknown))
        .finish("Fatalities", &mut sections);

    let heading = p
        .dyad_name
        .clone()
        .or_else(|| p.conflict_name.clone())
        .unwrap_or_else(|| "Event".to_string());

    PopupContent {
        heading,
        subheading: format!(
            "Event ID: {} · Year: {}",
            p.id.clone().unwrap_or_default(),
            int(p.year).unwrap_or_default()
        ),
        sections,
    }
}
