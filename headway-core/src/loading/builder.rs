use log::info;

use super::config::LoadConfig;
use super::gtfs::{load_feed_dir, parse_clock_time};
use super::locations::read_locations;
use super::transfers::build_walking_transfers;
use crate::error::Error;
use crate::model::{Feed, IndexedFeed, ShapeHint};
use crate::routing::OnlineRouter;
use crate::water::WaterFilter;

/// Indexes a merged feed and derives its walking-transfer graph. Exposed so
/// callers with an in-memory feed (tests, embedders) can skip the CSV layer.
pub fn index_feed(
    feed: Feed,
    water: WaterFilter,
    hints: &[ShapeHint],
    max_between_stop_walk_km: f64,
) -> IndexedFeed {
    let mut indexed = IndexedFeed::from_feed(feed, water, hints);
    build_walking_transfers(&mut indexed, max_between_stop_walk_km);
    indexed
}

/// Creates an online router from the load configuration: reads and merges
/// every GTFS directory, applies the service-date and stop-time filters,
/// builds the indices and walking transfers, and pre-augments the presets.
///
/// # Errors
///
/// Returns an error on unreadable or malformed inputs and on invalid
/// configuration; see the crate error type for the kinds.
pub fn create_router(config: &LoadConfig) -> Result<OnlineRouter, Error> {
    let date = config.parsed_departure_date()?;
    if config.gtfs_data_dirs.is_empty() {
        return Err(Error::InvalidConfig(
            "gtfs_data_dirs must name at least one GTFS directory".to_string(),
        ));
    }

    let mut feeds = Vec::with_capacity(config.gtfs_data_dirs.len());
    for dir in &config.gtfs_data_dirs {
        if !dir.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "GTFS directory '{}' does not exist",
                dir.display()
            )));
        }
        feeds.push(load_feed_dir(dir)?);
    }
    let mut feed = Feed::merge(feeds);

    feed.filter_by_date(date);
    if let Some(window) = &config.stop_time_filter {
        let earliest = window
            .earliest
            .as_deref()
            .map(parse_clock_time)
            .transpose()?
            .unwrap_or(0);
        let latest = window
            .latest
            .as_deref()
            .map(parse_clock_time)
            .transpose()?
            .unwrap_or(u32::MAX);
        feed.filter_stop_times(earliest, latest)?;
    }

    let water = match &config.water_geojson_file {
        Some(path) => WaterFilter::from_path(path)?,
        None => WaterFilter::default(),
    };

    let indexed = index_feed(
        feed,
        water,
        &config.shape_hints,
        config.max_allowable_between_stop_walk_km,
    );

    let mut router = OnlineRouter::new(indexed, config.query_options.clone(), config.ceilings());
    for preset in &config.preset_destinations {
        let walk_km = preset.max_allowable_destination_walk_km.ok_or_else(|| {
            Error::InvalidConfig(format!(
                "preset '{}' is missing max_allowable_destination_walk_km",
                preset.name
            ))
        })?;
        let destinations = read_locations(&preset.locations_file)?;
        info!(
            "Pre-augmenting preset '{}' with {} destinations",
            preset.name,
            destinations.len()
        );
        router.add_preset(preset.name.clone(), destinations, walk_km)?;
    }

    info!("Router ready");
    Ok(router)
}
