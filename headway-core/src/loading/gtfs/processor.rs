//! Conversion of raw GTFS records into the typed feed.

use std::path::Path;

use log::info;

use super::de::{
    deserialize_gtfs_file, deserialize_optional_gtfs_file, parse_clock_time, parse_gtfs_date,
};
use super::raw_types::{
    RawCalendar, RawCalendarDate, RawRoute, RawShape, RawStop, RawStopTime, RawTransfer, RawTrip,
};
use crate::error::Error;
use crate::model::types::{
    Calendar, CalendarDate, ExceptionType, Route, RouteType, ShapePoint, Stop, StopTime,
    Transfer, TransferType, Trip,
};
use crate::model::Feed;

fn opt(raw: String) -> Option<String> {
    if raw.is_empty() { None } else { Some(raw) }
}

fn parse_f64(raw: &str, what: &str) -> Result<f64, Error> {
    raw.parse()
        .map_err(|_| Error::InvalidFeed(format!("non-numeric {what} '{raw}'")))
}

fn parse_u32(raw: &str, what: &str) -> Result<u32, Error> {
    raw.parse()
        .map_err(|_| Error::InvalidFeed(format!("non-numeric {what} '{raw}'")))
}

/// Loads one GTFS directory into a typed feed. `stops.txt` and
/// `stop_times.txt` must exist; every other file is optional and treated as
/// empty when absent.
pub fn load_feed_dir(dir: &Path) -> Result<Feed, Error> {
    let feed_name = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    let raw_stops: Vec<RawStop> = deserialize_gtfs_file(&dir.join("stops.txt"))?;
    let raw_stop_times: Vec<RawStopTime> = deserialize_gtfs_file(&dir.join("stop_times.txt"))?;
    let raw_trips: Vec<RawTrip> = deserialize_optional_gtfs_file(&dir.join("trips.txt"))?;
    let raw_routes: Vec<RawRoute> = deserialize_optional_gtfs_file(&dir.join("routes.txt"))?;
    let raw_calendars: Vec<RawCalendar> =
        deserialize_optional_gtfs_file(&dir.join("calendar.txt"))?;
    let raw_calendar_dates: Vec<RawCalendarDate> =
        deserialize_optional_gtfs_file(&dir.join("calendar_dates.txt"))?;
    let raw_shapes: Vec<RawShape> = deserialize_optional_gtfs_file(&dir.join("shapes.txt"))?;
    let raw_transfers: Vec<RawTransfer> =
        deserialize_optional_gtfs_file(&dir.join("transfers.txt"))?;

    let stops = raw_stops
        .into_iter()
        .map(|raw| {
            Ok(Stop {
                lat: parse_f64(&raw.stop_lat, "stop_lat")?,
                lng: parse_f64(&raw.stop_lon, "stop_lon")?,
                stop_id: raw.stop_id,
                stop_name: raw.stop_name,
                stop_desc: opt(raw.stop_desc),
                parent_station: opt(raw.parent_station),
                feed_name: feed_name.clone(),
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let stop_times = raw_stop_times
        .into_iter()
        .map(|raw| {
            if raw.departure_time.is_empty() {
                return Err(Error::InvalidFeed(format!(
                    "stop time for trip '{}' at stop '{}' has no departure_time",
                    raw.trip_id, raw.stop_id
                )));
            }
            let departure_secs = parse_clock_time(&raw.departure_time)?;
            let arrival_secs = if raw.arrival_time.is_empty() {
                departure_secs
            } else {
                parse_clock_time(&raw.arrival_time)?
            };
            Ok(StopTime {
                stop_sequence: parse_u32(&raw.stop_sequence, "stop_sequence")?,
                trip_id: raw.trip_id,
                stop_id: raw.stop_id,
                arrival_secs,
                departure_secs,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let trips = raw_trips
        .into_iter()
        .map(|raw| {
            let direction_id = match raw.direction_id.as_str() {
                "" | "0" => 0,
                "1" => 1,
                other => {
                    return Err(Error::InvalidFeed(format!(
                        "trip '{}' has direction_id '{other}'",
                        raw.trip_id
                    )));
                }
            };
            Ok(Trip {
                trip_id: raw.trip_id,
                route_id: raw.route_id,
                service_id: raw.service_id,
                direction_id,
                shape_id: opt(raw.shape_id),
                headsign: opt(raw.trip_headsign),
                short_name: opt(raw.trip_short_name),
                block_id: opt(raw.block_id),
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let routes = raw_routes
        .into_iter()
        .map(|raw| {
            Ok(Route {
                route_type: RouteType::from_gtfs(parse_u32(&raw.route_type, "route_type")?)?,
                route_id: raw.route_id,
                short_name: opt(raw.route_short_name),
                long_name: opt(raw.route_long_name),
                color: opt(raw.route_color),
                text_color: opt(raw.route_text_color),
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let calendars = raw_calendars
        .into_iter()
        .map(|raw| {
            let weekday = |bit: &str| bit == "1";
            Ok(Calendar {
                weekdays: [
                    weekday(&raw.monday),
                    weekday(&raw.tuesday),
                    weekday(&raw.wednesday),
                    weekday(&raw.thursday),
                    weekday(&raw.friday),
                    weekday(&raw.saturday),
                    weekday(&raw.sunday),
                ],
                start_date: parse_gtfs_date(&raw.start_date)?,
                end_date: parse_gtfs_date(&raw.end_date)?,
                service_id: raw.service_id,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let calendar_dates = raw_calendar_dates
        .into_iter()
        .map(|raw| {
            Ok(CalendarDate {
                date: parse_gtfs_date(&raw.date)?,
                exception: ExceptionType::from_gtfs(parse_u32(
                    &raw.exception_type,
                    "exception_type",
                )?)?,
                service_id: raw.service_id,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let shapes = raw_shapes
        .into_iter()
        .map(|raw| {
            Ok(ShapePoint {
                lat: parse_f64(&raw.shape_pt_lat, "shape_pt_lat")?,
                lng: parse_f64(&raw.shape_pt_lon, "shape_pt_lon")?,
                sequence: parse_u32(&raw.shape_pt_sequence, "shape_pt_sequence")?,
                shape_id: raw.shape_id,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let transfers = raw_transfers
        .into_iter()
        .map(|raw| {
            let transfer_type = if raw.transfer_type.is_empty() {
                TransferType::Recommended
            } else {
                TransferType::from_gtfs(parse_u32(&raw.transfer_type, "transfer_type")?)?
            };
            let min_transfer_secs = if raw.min_transfer_time.is_empty() {
                None
            } else {
                Some(parse_u32(&raw.min_transfer_time, "min_transfer_time")?)
            };
            Ok(Transfer {
                from_stop_id: raw.from_stop_id,
                to_stop_id: raw.to_stop_id,
                transfer_type,
                min_transfer_secs,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    info!(
        "Loaded {}: {} stops, {} stop times, {} trips, {} routes",
        dir.display(),
        stops.len(),
        stop_times.len(),
        trips.len(),
        routes.len()
    );

    Ok(Feed {
        stops,
        stop_times,
        trips,
        routes,
        calendars,
        calendar_dates,
        shapes,
        transfers,
        feed_name,
        feeds_with_transfers: Default::default(),
    })
}
