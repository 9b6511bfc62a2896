//! Data model for public transportation routing
//!
//! Typed GTFS entities, the merged feed, and the derived indices the
//! router works against.

pub mod feed;
pub mod indexed;
pub mod types;

pub use feed::Feed;
pub use indexed::{IndexedFeed, ShapeHint};
pub use types::{
    Calendar, CalendarDate, ExceptionType, Location, Route, RouteType, ShapePoint, Stop,
    StopTime, Transfer, TransferType, Trip, WalkCost, WalkingTransfer,
};
