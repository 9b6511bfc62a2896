//! Load-time and query-time configuration.
//!
//! Query options are completed per query by layering user overrides over the
//! feed-level overrides over the defaults, then clamping against the feed's
//! allowable ceilings.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use hashbrown::HashSet;
use serde::Deserialize;

use crate::error::Error;
use crate::model::ShapeHint;

/// Options governing feed loading, from the JSON configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    /// Service date, `YYYYMMDD`.
    pub departure_date: String,
    pub gtfs_data_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub stop_time_filter: Option<StopTimeFilter>,
    #[serde(default = "default_between_stop_walk_km")]
    pub max_allowable_between_stop_walk_km: f64,
    #[serde(default = "f64_infinity")]
    pub max_allowable_walking_distance_km: f64,
    #[serde(default = "u32_max")]
    pub max_allowable_number_of_transfers: u32,
    #[serde(default)]
    pub water_geojson_file: Option<PathBuf>,
    #[serde(default)]
    pub shape_hints: Vec<ShapeHint>,
    #[serde(default)]
    pub preset_destinations: Vec<PresetConfig>,
    /// Feed-level query option overrides, layered under per-query options.
    #[serde(default)]
    pub query_options: QueryOptionsOverride,
}

impl LoadConfig {
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))
    }

    pub fn parsed_departure_date(&self) -> Result<NaiveDate, Error> {
        NaiveDate::parse_from_str(&self.departure_date, "%Y%m%d")
            .map_err(|_| Error::InvalidDate(self.departure_date.clone()))
    }

    pub fn ceilings(&self) -> OptionCeilings {
        OptionCeilings {
            max_number_of_transfers: self.max_allowable_number_of_transfers,
            max_walking_distance_km: self.max_allowable_walking_distance_km,
        }
    }
}

/// Optional clock-time window restricting the indexed stop-times.
#[derive(Debug, Clone, Deserialize)]
pub struct StopTimeFilter {
    #[serde(default)]
    pub earliest: Option<String>,
    #[serde(default)]
    pub latest: Option<String>,
}

/// One pre-augmented destination list.
#[derive(Debug, Clone, Deserialize)]
pub struct PresetConfig {
    pub name: String,
    pub locations_file: PathBuf,
    /// Required; validated when the preset is built.
    #[serde(default)]
    pub max_allowable_destination_walk_km: Option<f64>,
}

/// Feed-wide ceilings that per-query options are clamped against.
#[derive(Debug, Clone, Copy)]
pub struct OptionCeilings {
    pub max_number_of_transfers: u32,
    pub max_walking_distance_km: f64,
}

impl Default for OptionCeilings {
    fn default() -> Self {
        OptionCeilings {
            max_number_of_transfers: u32::MAX,
            max_walking_distance_km: f64::INFINITY,
        }
    }
}

/// Completed per-query options.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub max_walking_distance_km: f64,
    pub walking_speed_kph: f64,
    pub max_waiting_time_secs: f64,
    pub transfer_penalty_secs: f64,
    pub max_number_of_transfers: u32,
    pub max_commute_time_secs: f64,
    pub bus_multiplier: f64,
    pub rail_multiplier: f64,
    pub exclude_routes: HashSet<String>,
    pub exclude_stops: HashSet<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            max_walking_distance_km: 1.5,
            walking_speed_kph: 5.1,
            max_waiting_time_secs: 1800.0,
            transfer_penalty_secs: 30.0,
            max_number_of_transfers: 1,
            max_commute_time_secs: f64::INFINITY,
            bus_multiplier: 1.0,
            rail_multiplier: 1.0,
            exclude_routes: HashSet::new(),
            exclude_stops: HashSet::new(),
        }
    }
}

impl QueryOptions {
    /// Layers `over` on top of `self`, field by field.
    pub fn apply(mut self, over: &QueryOptionsOverride) -> QueryOptions {
        if let Some(v) = over.max_walking_distance_km {
            self.max_walking_distance_km = v;
        }
        if let Some(v) = over.walking_speed_kph {
            self.walking_speed_kph = v;
        }
        if let Some(v) = over.max_waiting_time_secs {
            self.max_waiting_time_secs = v;
        }
        if let Some(v) = over.transfer_penalty_secs {
            self.transfer_penalty_secs = v;
        }
        if let Some(v) = over.max_number_of_transfers {
            self.max_number_of_transfers = v;
        }
        if let Some(v) = over.max_commute_time_secs {
            self.max_commute_time_secs = v;
        }
        if let Some(v) = over.bus_multiplier {
            self.bus_multiplier = v;
        }
        if let Some(v) = over.rail_multiplier {
            self.rail_multiplier = v;
        }
        if let Some(routes) = &over.exclude_routes {
            self.exclude_routes = routes.iter().cloned().collect();
        }
        if let Some(stops) = &over.exclude_stops {
            self.exclude_stops = stops.iter().cloned().collect();
        }
        self
    }

    /// Caps the expensive knobs at the feed ceilings, a guard against
    /// pathologically expensive queries.
    pub fn clamp_to(mut self, ceilings: &OptionCeilings) -> QueryOptions {
        self.max_number_of_transfers = self
            .max_number_of_transfers
            .min(ceilings.max_number_of_transfers);
        self.max_walking_distance_km = self
            .max_walking_distance_km
            .min(ceilings.max_walking_distance_km);
        self
    }
}

/// Partial query options, as user or feed-level input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryOptionsOverride {
    #[serde(default)]
    pub max_walking_distance_km: Option<f64>,
    #[serde(default)]
    pub walking_speed_kph: Option<f64>,
    #[serde(default)]
    pub max_waiting_time_secs: Option<f64>,
    #[serde(default)]
    pub transfer_penalty_secs: Option<f64>,
    #[serde(default)]
    pub max_number_of_transfers: Option<u32>,
    #[serde(default)]
    pub max_commute_time_secs: Option<f64>,
    #[serde(default)]
    pub bus_multiplier: Option<f64>,
    #[serde(default)]
    pub rail_multiplier: Option<f64>,
    #[serde(default)]
    pub exclude_routes: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_stops: Option<Vec<String>>,
}

fn default_between_stop_walk_km() -> f64 {
    1.5
}

fn f64_infinity() -> f64 {
    f64::INFINITY
}

fn u32_max() -> u32 {
    u32::MAX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_layers_over_defaults() {
        let over = QueryOptionsOverride {
            max_number_of_transfers: Some(3),
            bus_multiplier: Some(2.0),
            exclude_stops: Some(vec!["S1".to_string()]),
            ..QueryOptionsOverride::default()
        };
        let opts = QueryOptions::default().apply(&over);
        assert_eq!(opts.max_number_of_transfers, 3);
        assert_eq!(opts.bus_multiplier, 2.0);
        assert!(opts.exclude_stops.contains("S1"));
        // Untouched fields keep their defaults.
        assert_eq!(opts.walking_speed_kph, 5.1);
    }

    #[test]
    fn clamping_caps_at_feed_ceilings() {
        let ceilings = OptionCeilings {
            max_number_of_transfers: 2,
            max_walking_distance_km: 2.0,
        };
        let over = QueryOptionsOverride {
            max_number_of_transfers: Some(50),
            max_walking_distance_km: Some(25.0),
            ..QueryOptionsOverride::default()
        };
        let opts = QueryOptions::default().apply(&over).clamp_to(&ceilings);
        assert_eq!(opts.max_number_of_transfers, 2);
        assert_eq!(opts.max_walking_distance_km, 2.0);
    }

    #[test]
    fn config_json_with_defaults() {
        let raw = r#"{
            "departure_date": "20070604",
            "gtfs_data_dirs": ["./feed"]
        }"#;
        let config: LoadConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.max_allowable_between_stop_walk_km, 1.5);
        assert!(config.max_allowable_walking_distance_km.is_infinite());
        assert_eq!(config.max_allowable_number_of_transfers, u32::MAX);
        assert!(config.parsed_departure_date().is_ok());
    }

    #[test]
    fn bad_departure_date_is_fatal() {
        let config = LoadConfig {
            departure_date: "2007-06-04".to_string(),
            gtfs_data_dirs: vec![],
            stop_time_filter: None,
            max_allowable_between_stop_walk_km: 1.5,
            max_allowable_walking_distance_km: f64::INFINITY,
            max_allowable_number_of_transfers: u32::MAX,
            water_geojson_file: None,
            shape_hints: vec![],
            preset_destinations: vec![],
            query_options: QueryOptionsOverride::default(),
        };
        assert!(matches!(
            config.parsed_departure_date(),
            Err(Error::InvalidDate(_))
        ));
    }
}
