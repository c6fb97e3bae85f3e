use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Dataset;

/// Ordered key/value request parameters. Only populated fields ever appear.
pub type QueryParams = Vec<(&'static str, String)>;

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal { $($variant:ident = $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub enum $name {
            $($variant = $code),+
        }

        impl $name {
            pub const fn code(self) -> u8 {
                self as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = FilterError;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    _ => Err(FilterError::OutOfRange {
                        field: $field,
                        value: code.to_string(),
                    }),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value.code()
            }
        }
    };
}

coded_enum!(
    /// Event-level violence classification (1-3).
    ViolenceType, "type_of_violence" {
        StateBased = 1,
        NonState = 2,
        OneSided = 3,
    }
);

coded_enum!(
    /// Annual conflict classification (1-4).
    ConflictType, "type_of_conflict" {
        Extrasystemic = 1,
        Interstate = 2,
        Intrastate = 3,
        InternationalizedIntrastate = 4,
    }
);

coded_enum!(
    /// Annual conflict intensity (1 = minor, 2 = war).
    IntensityLevel, "intensity_level" {
        Minor = 1,
        War = 2,
    }
);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("{field}: value {value:?} is out of range")]
    OutOfRange { field: &'static str, value: String },
    #[error("{field}: value {value:?} is not a non-negative integer")]
    NotANumber { field: &'static str, value: String },
}

/// The independently optional filter fields a user can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Region,
    TypeOfViolence,
    TypeOfConflict,
    IntensityLevel,
    MinBest,
}

impl FilterField {
    pub const ALL: [FilterField; 5] = [
        FilterField::Region,
        FilterField::TypeOfViolence,
        FilterField::TypeOfConflict,
        FilterField::IntensityLevel,
        FilterField::MinBest,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            FilterField::Region => "region",
            FilterField::TypeOfViolence => "type_of_violence",
            FilterField::TypeOfConflict => "type_of_conflict",
            FilterField::IntensityLevel => "intensity_level",
            FilterField::MinBest => "min_best",
        }
    }

    /// Fields each dataset endpoint understands, in request order.
    pub const fn for_dataset(dataset: Dataset) -> &'static [FilterField] {
        match dataset {
            Dataset::Regions => &[
                FilterField::Region,
                FilterField::TypeOfConflict,
                FilterField::IntensityLevel,
            ],
            Dataset::Events => &[
                FilterField::Region,
                FilterField::TypeOfViolence,
                FilterField::MinBest,
            ],
        }
    }
}

/// Current filter selections. `None` means "not filtered".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_of_violence: Option<ViolenceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_of_conflict: Option<ConflictType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity_level: Option<IntensityLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_best: Option<u32>,
}

impl FilterSet {
    /// Apply raw UI input to one field. Blank input clears the field; invalid
    /// input leaves the set untouched.
    pub fn set_raw(&mut self, field: FilterField, raw: &str) -> Result<(), FilterError> {
        let raw = raw.trim();
        if raw.is_empty() {
            self.clear_field(field);
            return Ok(());
        }

        match field {
            FilterField::Region => self.region = Some(raw.to_string()),
            FilterField::TypeOfViolence => {
                self.type_of_violence = Some(ViolenceType::try_from(parse_code(field, raw)?)?)
            }
            FilterField::TypeOfConflict => {
                self.type_of_conflict = Some(ConflictType::try_from(parse_code(field, raw)?)?)
            }
            FilterField::IntensityLevel => {
                self.intensity_level = Some(IntensityLevel::try_from(parse_code(field, raw)?)?)
            }
            FilterField::MinBest => {
                let value = raw.parse::<u32>().map_err(|_| FilterError::NotANumber {
                    field: field.key(),
                    value: raw.to_string(),
                })?;
                self.min_best = Some(value);
            }
        }
        Ok(())
    }

    pub fn clear_field(&mut self, field: FilterField) {
        match field {
            FilterField::Region => self.region = None,
            FilterField::TypeOfViolence => self.type_of_violence = None,
            FilterField::TypeOfConflict => self.type_of_conflict = None,
            FilterField::IntensityLevel => self.intensity_level = None,
            FilterField::MinBest => self.min_best = None,
        }
    }

    pub fn is_empty(&self) -> bool {
        FilterField::ALL
            .iter()
            .all(|field| self.encoded(*field).is_none())
    }

    /// Wire encoding of a single field, or `None` when it must be omitted.
    pub fn encoded(&self, field: FilterField) -> Option<String> {
        match field {
            FilterField::Region => self
                .region
                .as_deref()
                .map(str::trim)
                .filter(|region| !region.is_empty())
                .map(str::to_string),
            FilterField::TypeOfViolence => self.type_of_violence.map(|v| v.code().to_string()),
            FilterField::TypeOfConflict => self.type_of_conflict.map(|v| v.code().to_string()),
            FilterField::IntensityLevel => self.intensity_level.map(|v| v.code().to_string()),
            FilterField::MinBest => self.min_best.map(|v| v.to_string()),
        }
    }

    /// Request parameters for `dataset` at `year`: the year followed by the
    /// populated subset of filters relevant to that dataset.
    pub fn query_for(&self, dataset: Dataset, year: i32) -> QueryParams {
        let mut params = vec![("year", year.to_string())];
        for field in FilterField::for_dataset(dataset) {
            if let Some(value) = self.encoded(*field) {
                params.push((field.key(), value));
            }
        }
        params
    }
}

/// Canonical `key=value&...` form over every populated field.
impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for field in FilterField::ALL {
            let Some(value) = self.encoded(field) else {
                continue;
            };
            if !first {
                f.write_str("&")?;
            }
            write!(f, "{}={}", field.key(), value)?;
            first = false;
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

fn parse_code(field: FilterField, raw: &str) -> Result<u8, FilterError> {
    raw.parse::<u8>().map_err(|_| FilterError::NotANumber {
        field: field.key(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_never_reach_the_query() {
        let filters = FilterSet::default();
        assert_eq!(
            filters.query_for(Dataset::Events, 1995),
            vec![("year", "1995".to_string())]
        );
        assert_eq!(
            filters.query_for(Dataset::Regions, 1960),
            vec![("year", "1960".to_string())]
        );
    }

    #[test]
    fn each_dataset_only_receives_its_own_filters() {
        let filters = FilterSet {
            region: Some("Africa".to_string()),
            type_of_violence: Some(ViolenceType::OneSided),
            type_of_conflict: Some(ConflictType::Intrastate),
            intensity_level: Some(IntensityLevel::War),
            min_best: Some(25),
        };

        assert_eq!(
            filters.query_for(Dataset::Regions, 2001),
            vec![
                ("year", "2001".to_string()),
                ("region", "Africa".to_string()),
                ("type_of_conflict", "3".to_string()),
                ("intensity_level", "2".to_string()),
            ]
        );
        assert_eq!(
            filters.query_for(Dataset::Events, 2001),
            vec![
                ("year", "2001".to_string()),
                ("region", "Africa".to_string()),
                ("type_of_violence", "3".to_string()),
                ("min_best", "25".to_string()),
            ]
        );
    }

    #[test]
    fn blank_region_is_omitted() {
        let filters = FilterSet {
            region: Some("   ".to_string()),
            ..FilterSet::default()
        };
        assert!(filters.is_empty());
        assert_eq!(filters.query_for(Dataset::Events, 2000).len(), 1);
    }

    #[test]
    fn explicit_zero_min_best_is_sent() {
        let mut filters = FilterSet::default();
        filters.set_raw(FilterField::MinBest, "0").expect("zero is valid");
        assert_eq!(
            filters.query_for(Dataset::Events, 2000),
            vec![("year", "2000".to_string()), ("min_best", "0".to_string())]
        );
    }

    #[test]
    fn set_raw_parses_and_clears() {
        let mut filters = FilterSet::default();
        filters
            .set_raw(FilterField::TypeOfConflict, " 4 ")
            .expect("valid conflict type");
        assert_eq!(
            filters.type_of_conflict,
            Some(ConflictType::InternationalizedIntrastate)
        );

        filters
            .set_raw(FilterField::TypeOfConflict, "")
            .expect("blank clears");
        assert_eq!(filters.type_of_conflict, None);
    }

    #[test]
    fn set_raw_rejects_invalid_input_without_mutating() {
        let mut filters = FilterSet {
            intensity_level: Some(IntensityLevel::Minor),
            ..FilterSet::default()
        };

        assert_eq!(
            filters.set_raw(FilterField::IntensityLevel, "3"),
            Err(FilterError::OutOfRange {
                field: "intensity_level",
                value: "3".to_string()
            })
        );
        assert!(filters.set_raw(FilterField::MinBest, "-5").is_err());
        assert!(filters.set_raw(FilterField::TypeOfViolence, "abc").is_err());
        assert_eq!(filters.intensity_level, Some(IntensityLevel::Minor));
        assert_eq!(filters.min_best, None);
    }

    #[test]
    fn display_is_canonical() {
        let filters = FilterSet {
            min_best: Some(10),
            region: Some("Asia".to_string()),
            ..FilterSet::default()
        };
        assert_eq!(filters.to_string(), "region=Asia&min_best=10");
        assert_eq!(FilterSet::default().to_string(), "none");
    }

    #[test]
    fn coded_enums_round_trip_through_serde_as_numbers() {
        let filters = FilterSet {
            type_of_violence: Some(ViolenceType::NonState),
            ..FilterSet::default()
        };
        let json = serde_json::to_value(&filters).expect("serialize filters");
        assert_eq!(json, serde_json::json!({ "type_of_violence": 2 }));
        assert!(serde_json::from_value::<FilterSet>(serde_json::json!({ "type_of_violence": 9 })).is_err());
    }
}
