//! GTFS CSV loading for the transit feed.

mod de;
mod processor;
mod raw_types;

pub use de::{parse_clock_time, parse_gtfs_date};
pub use processor::load_feed_dir;
pub use raw_types::{
    RawCalendar, RawCalendarDate, RawRoute, RawShape, RawStop, RawStopTime, RawTransfer, RawTrip,
};
