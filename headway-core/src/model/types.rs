//! Typed GTFS entities and the derived walking-edge records.

use std::cmp::Ordering;

use chrono::NaiveDate;
use geo::Point;
use serde::Deserialize;

use crate::error::Error;
use crate::Secs;

/// A transit stop or station.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub stop_id: String,
    pub stop_name: String,
    pub stop_desc: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub parent_station: Option<String>,
    /// Name of the source feed, set during multi-feed merge.
    pub feed_name: Option<String>,
}

impl Stop {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }
}

/// One scheduled call of a trip at a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTime {
    pub trip_id: String,
    pub stop_id: String,
    /// 1-based position of this call within its trip.
    pub stop_sequence: u32,
    pub arrival_secs: Secs,
    pub departure_secs: Secs,
}

impl StopTime {
    /// The schedule instant this call is indexed and costed by. The source
    /// system keys everything on the departure time, including the reported
    /// arrival at a downstream stop; that behavior is preserved.
    pub fn time_of_day(&self) -> Secs {
        self.departure_secs
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub trip_id: String,
    pub route_id: String,
    pub service_id: String,
    pub direction_id: u8,
    pub shape_id: Option<String>,
    pub headsign: Option<String>,
    pub short_name: Option<String>,
    pub block_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteType {
    LightRail,
    Subway,
    Rail,
    Bus,
    Ferry,
    CableCar,
    Gondola,
    Funicular,
}

impl RouteType {
    pub fn from_gtfs(code: u32) -> Result<Self, Error> {
        match code {
            0 => Ok(RouteType::LightRail),
            1 => Ok(RouteType::Subway),
            2 => Ok(RouteType::Rail),
            3 => Ok(RouteType::Bus),
            4 => Ok(RouteType::Ferry),
            5 => Ok(RouteType::CableCar),
            6 => Ok(RouteType::Gondola),
            7 => Ok(RouteType::Funicular),
            other => Err(Error::InvalidFeed(format!("unknown route_type {other}"))),
        }
    }

    /// Everything that is not a bus takes the rail cost multiplier.
    pub fn is_rail(self) -> bool {
        !matches!(self, RouteType::Bus)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub route_id: String,
    pub route_type: RouteType,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub color: Option<String>,
    pub text_color: Option<String>,
}

impl Route {
    /// Human-facing label for itinerary descriptions.
    pub fn label(&self) -> &str {
        self.short_name
            .as_deref()
            .or(self.long_name.as_deref())
            .unwrap_or(&self.route_id)
    }
}

/// Weekly service availability window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    pub service_id: String,
    /// Monday through Sunday.
    pub weekdays: [bool; 7],
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Calendar {
    pub fn runs_on(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        self.start_date <= date
            && date <= self.end_date
            && self.weekdays[date.weekday().num_days_from_monday() as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    ServiceAdded,
    ServiceRemoved,
}

impl ExceptionType {
    pub fn from_gtfs(code: u32) -> Result<Self, Error> {
        match code {
            1 => Ok(ExceptionType::ServiceAdded),
            2 => Ok(ExceptionType::ServiceRemoved),
            other => Err(Error::InvalidFeed(format!(
                "unknown calendar exception_type {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDate {
    pub service_id: String,
    pub date: NaiveDate,
    pub exception: ExceptionType,
}

/// One vertex of a trip shape polyline.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePoint {
    pub shape_id: String,
    pub lat: f64,
    pub lng: f64,
    pub sequence: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Recommended,
    Timed,
    MinTime,
    Infeasible,
}

impl TransferType {
    pub fn from_gtfs(code: u32) -> Result<Self, Error> {
        match code {
            0 => Ok(TransferType::Recommended),
            1 => Ok(TransferType::Timed),
            2 => Ok(TransferType::MinTime),
            3 => Ok(TransferType::Infeasible),
            other => Err(Error::InvalidFeed(format!("unknown transfer type {other}"))),
        }
    }
}

/// A row of `transfers.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub transfer_type: TransferType,
    pub min_transfer_secs: Option<Secs>,
}

/// Cost of a derived walking edge: either a crow-flies distance or a fixed
/// feed-declared duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WalkCost {
    Km(f64),
    Secs(Secs),
}

/// Directed walkable edge between two stops.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkingTransfer {
    pub to_stop_id: String,
    pub cost: WalkCost,
}

impl WalkingTransfer {
    /// Deterministic ordering for per-origin edge lists: feed-declared
    /// (seconds) edges first by `(secs, stop_id)`, then walked edges by
    /// `(km, stop_id)`.
    pub fn ordering(&self, other: &Self) -> Ordering {
        match (self.cost, other.cost) {
            (WalkCost::Secs(a), WalkCost::Secs(b)) => {
                a.cmp(&b).then_with(|| self.to_stop_id.cmp(&other.to_stop_id))
            }
            (WalkCost::Km(a), WalkCost::Km(b)) => a
                .total_cmp(&b)
                .then_with(|| self.to_stop_id.cmp(&other.to_stop_id)),
            (WalkCost::Secs(_), WalkCost::Km(_)) => Ordering::Less,
            (WalkCost::Km(_), WalkCost::Secs(_)) => Ordering::Greater,
        }
    }
}

/// A named query endpoint or preset destination.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Location {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Location {
            id: id.into(),
            latitude,
            longitude,
        }
    }
}
