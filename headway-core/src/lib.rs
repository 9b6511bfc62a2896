//! Schedule-based public transit routing over GTFS feeds.
//!
//! The crate loads one or more GTFS directories, merges them into a single
//! feed, derives the indices a round-based (RAPTOR-style) router needs, and
//! answers stop-to-stop and coordinate-to-coordinate queries. Query endpoints
//! that are not transit stops are spliced into the network at query time as
//! ephemeral stops joined to nearby real stops by walking edges, optionally
//! filtered by an impassable-water barrier.

pub mod error;
pub mod geometry;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;
pub mod spatial;
pub mod water;

pub use error::Error;

/// Seconds since midnight for schedule times. Values above 86400 are
/// wraparound (after-midnight) service and are kept as-is.
pub type Secs = u32;
