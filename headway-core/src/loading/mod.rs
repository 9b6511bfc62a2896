//! This module is responsible for loading data from the various inputs
//! (GTFS directories, locations CSVs, water GeoJSON, JSON configuration)
//! and building the indexed feed and online router.

mod builder;
mod config;
pub mod gtfs;
mod locations;
mod transfers;

pub use builder::{create_router, index_feed};
pub use config::{
    LoadConfig, OptionCeilings, PresetConfig, QueryOptions, QueryOptionsOverride, StopTimeFilter,
};
pub use gtfs::parse_clock_time;
pub use locations::read_locations;
