use serde::{Deserialize, Serialize};

/// First year for which point-level event data exists.
pub const EVENT_EPOCH: i32 = 1989;

/// The two remotely hosted datasets a viewer can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// Yearly per-country aggregate polygons.
    Regions,
    /// Individual georeferenced events.
    Events,
}

impl Dataset {
    pub const fn path(self) -> &'static str {
        match self {
            Dataset::Regions => "/conflict-countries",
            Dataset::Events => "/conflicts",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Dataset::Regions => "regions",
            Dataset::Events => "events",
        }
    }

    /// Datasets that exist for `year`, in render order (regions first so
    /// event markers stay on top).
    pub fn for_year(year: i32) -> &'static [Dataset] {
        if year < EVENT_EPOCH {
            &[Dataset::Regions]
        } else {
            &[Dataset::Regions, Dataset::Events]
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
