//! Query entry points and query-time feed augmentation.
//!
//! Coordinate endpoints are spliced into the network as ephemeral stops:
//! the augmented feed is a layered view over the immutable indexed feed,
//! with owned overlay maps for the synthetic stops and their walking edges.
//! Lookup precedence is overlay first, then base; walking-edge lookup
//! chains both.

use hashbrown::HashMap;

use super::itinerary::{trace_route, Route};
use super::raptor::{find_best_k, run_raptor};
use crate::error::Error;
use crate::loading::{OptionCeilings, QueryOptions, QueryOptionsOverride};
use crate::model::types::{Location, Stop, WalkCost, WalkingTransfer};
use crate::model::{IndexedFeed, Route as TransitRoute, StopTime, Trip};
use crate::spatial::StopIndex;
use crate::Secs;

/// A per-query layered view: the immutable base plus ephemeral stops and
/// walking edges for the query's endpoints.
pub struct AugmentedFeed<'a> {
    base: &'a IndexedFeed,
    extra_stops: HashMap<String, Stop>,
    extra_walks: HashMap<String, Vec<WalkingTransfer>>,
}

impl<'a> AugmentedFeed<'a> {
    /// A view with nothing overlaid, for stop-to-stop queries.
    pub fn passthrough(base: &'a IndexedFeed) -> Self {
        AugmentedFeed {
            base,
            extra_stops: HashMap::new(),
            extra_walks: HashMap::new(),
        }
    }

    /// Splices an origin and a set of destinations into the network.
    /// Destination-side edges run from real stops to each destination;
    /// origin-side edges run from the origin to everything within walking
    /// range, destinations included. Candidate edges must not cross water.
    pub fn for_query(
        base: &'a IndexedFeed,
        origin: &Location,
        destinations: &[Location],
        walk_radius_km: f64,
    ) -> Result<Self, Error> {
        let (mut extra_stops, mut extra_walks, extended_index) =
            destination_overlay(base, destinations, walk_radius_km)?;
        splice_origin(
            base,
            &mut extra_stops,
            &mut extra_walks,
            &extended_index,
            origin,
            walk_radius_km,
        )?;
        Ok(AugmentedFeed {
            base,
            extra_stops,
            extra_walks,
        })
    }

    pub fn base(&self) -> &IndexedFeed {
        self.base
    }

    pub fn stop(&self, stop_id: &str) -> Option<&Stop> {
        self.extra_stops
            .get(stop_id)
            .or_else(|| self.base.stop(stop_id))
    }

    pub fn trip(&self, trip_id: &str) -> Option<&Trip> {
        self.base.trip(trip_id)
    }

    pub fn route(&self, route_id: &str) -> Option<&TransitRoute> {
        self.base.route(route_id)
    }

    pub fn stop_time(&self, index: u32) -> &StopTime {
        self.base.stop_time(index)
    }

    pub fn departures_at(&self, stop_id: &str) -> &[u32] {
        self.base.departures_at(stop_id)
    }

    pub fn trip_calls(&self, trip_id: &str) -> &[u32] {
        self.base.trip_calls(trip_id)
    }

    /// Ephemeral stops never have scheduled departures.
    pub fn has_departures(&self, stop_id: &str) -> bool {
        self.base.has_departures(stop_id)
    }

    /// Base edges first, then the query overlay's.
    pub fn walking_transfers_from<'s>(
        &'s self,
        stop_id: &str,
    ) -> impl Iterator<Item = &'s WalkingTransfer> + 's {
        self.base
            .walking_transfers_from(stop_id)
            .iter()
            .chain(self.extra_walks.get(stop_id).into_iter().flatten())
    }
}

fn synthetic_stop(location: &Location) -> Stop {
    Stop {
        stop_id: location.id.clone(),
        stop_name: location.id.clone(),
        stop_desc: None,
        lat: location.latitude,
        lng: location.longitude,
        parent_station: None,
        feed_name: None,
    }
}

type Overlay = (
    HashMap<String, Stop>,
    HashMap<String, Vec<WalkingTransfer>>,
    StopIndex,
);

/// Builds the destination side of an overlay: synthetic stops, edges from
/// nearby real stops to each destination, and a copy of the stop index
/// extended with the destination points (so an origin search sees them).
fn destination_overlay(
    base: &IndexedFeed,
    destinations: &[Location],
    walk_radius_km: f64,
) -> Result<Overlay, Error> {
    let mut extra_stops: HashMap<String, Stop> = HashMap::new();
    let mut extra_walks: HashMap<String, Vec<WalkingTransfer>> = HashMap::new();
    let mut extended_index = base.stop_index.clone();

    for location in destinations {
        if base.stop(&location.id).is_some() || extra_stops.contains_key(&location.id) {
            return Err(Error::LocationIdCollision(location.id.clone()));
        }
        extra_stops.insert(location.id.clone(), synthetic_stop(location));

        // Destination edges come from real stops only, hence the base index.
        for neighbor in base
            .stop_index
            .search(location.latitude, location.longitude, walk_radius_km)
        {
            let stop = base.stop(&neighbor.id).expect("indexed stop exists");
            if base
                .water
                .crosses(stop.lat, stop.lng, location.latitude, location.longitude)
            {
                continue;
            }
            extra_walks
                .entry(neighbor.id.clone())
                .or_default()
                .push(WalkingTransfer {
                    to_stop_id: location.id.clone(),
                    cost: WalkCost::Km(neighbor.km),
                });
        }
        extended_index.insert(location.id.clone(), location.latitude, location.longitude);
    }
    for edges in extra_walks.values_mut() {
        edges.sort_by(WalkingTransfer::ordering);
    }
    Ok((extra_stops, extra_walks, extended_index))
}

/// Adds the origin's synthetic stop and its outgoing edges. Searching the
/// extended index makes direct origin-to-destination walks fall out of the
/// same pass.
fn splice_origin(
    base: &IndexedFeed,
    extra_stops: &mut HashMap<String, Stop>,
    extra_walks: &mut HashMap<String, Vec<WalkingTransfer>>,
    extended_index: &StopIndex,
    origin: &Location,
    walk_radius_km: f64,
) -> Result<(), Error> {
    if base.stop(&origin.id).is_some() || extra_stops.contains_key(&origin.id) {
        return Err(Error::LocationIdCollision(origin.id.clone()));
    }
    extra_stops.insert(origin.id.clone(), synthetic_stop(origin));

    let mut edges = Vec::new();
    for neighbor in extended_index.search(origin.latitude, origin.longitude, walk_radius_km) {
        let target = extra_stops
            .get(&neighbor.id)
            .or_else(|| base.stop(&neighbor.id))
            .expect("indexed stop exists");
        if base
            .water
            .crosses(origin.latitude, origin.longitude, target.lat, target.lng)
        {
            continue;
        }
        edges.push(WalkingTransfer {
            to_stop_id: neighbor.id.clone(),
            cost: WalkCost::Km(neighbor.km),
        });
    }
    edges.sort_by(WalkingTransfer::ordering);
    extra_walks.insert(origin.id.clone(), edges);
    Ok(())
}

/// A pre-augmented destination list, built once at load time. Queries clone
/// the overlay and splice their origin into it.
pub struct PresetFeed {
    pub name: String,
    pub destinations: Vec<Location>,
    extra_stops: HashMap<String, Stop>,
    extra_walks: HashMap<String, Vec<WalkingTransfer>>,
    extended_index: StopIndex,
}

impl PresetFeed {
    pub fn build(
        base: &IndexedFeed,
        name: impl Into<String>,
        destinations: Vec<Location>,
        destination_walk_km: f64,
    ) -> Result<Self, Error> {
        let (extra_stops, extra_walks, extended_index) =
            destination_overlay(base, &destinations, destination_walk_km)?;
        Ok(PresetFeed {
            name: name.into(),
            destinations,
            extra_stops,
            extra_walks,
            extended_index,
        })
    }

    fn augment<'a>(
        &self,
        base: &'a IndexedFeed,
        origin: &Location,
        walk_radius_km: f64,
    ) -> Result<AugmentedFeed<'a>, Error> {
        let mut extra_stops = self.extra_stops.clone();
        let mut extra_walks = self.extra_walks.clone();
        splice_origin(
            base,
            &mut extra_stops,
            &mut extra_walks,
            &self.extended_index,
            origin,
            walk_radius_km,
        )?;
        Ok(AugmentedFeed {
            base,
            extra_stops,
            extra_walks,
        })
    }
}

/// The online router: the indexed feed, the feed-level option layer, and
/// the preset overlays. Immutable once built; safe to share across query
/// threads.
pub struct OnlineRouter {
    feed: IndexedFeed,
    feed_options: QueryOptionsOverride,
    ceilings: OptionCeilings,
    presets: HashMap<String, PresetFeed>,
}

impl OnlineRouter {
    pub fn new(
        feed: IndexedFeed,
        feed_options: QueryOptionsOverride,
        ceilings: OptionCeilings,
    ) -> Self {
        OnlineRouter {
            feed,
            feed_options,
            ceilings,
            presets: HashMap::new(),
        }
    }

    pub fn indexed(&self) -> &IndexedFeed {
        &self.feed
    }

    /// Builds and caches a pre-augmented feed for a recurring destination
    /// list.
    pub fn add_preset(
        &mut self,
        name: impl Into<String>,
        destinations: Vec<Location>,
        destination_walk_km: f64,
    ) -> Result<(), Error> {
        let name = name.into();
        let preset = PresetFeed::build(&self.feed, name.clone(), destinations, destination_walk_km)?;
        self.presets.insert(name, preset);
        Ok(())
    }

    /// `defaults <- feed options <- user options`, clamped to the feed
    /// ceilings.
    pub fn complete_options(&self, user: &QueryOptionsOverride) -> QueryOptions {
        QueryOptions::default()
            .apply(&self.feed_options)
            .apply(user)
            .clamp_to(&self.ceilings)
    }

    /// Route between two stops of the feed. Unknown stop ids are treated as
    /// unreachable, not as errors.
    pub fn stop_to_stop(
        &self,
        origin_stop_id: &str,
        dep_secs: Secs,
        dest_stop_id: &str,
        user: &QueryOptionsOverride,
    ) -> Option<Route> {
        let opts = self.complete_options(user);
        if self.feed.stop(origin_stop_id).is_none() || self.feed.stop(dest_stop_id).is_none() {
            return None;
        }
        let feed = AugmentedFeed::passthrough(&self.feed);
        let tau = run_raptor(&feed, origin_stop_id, dep_secs, &opts);
        let k = find_best_k(&tau, dest_stop_id, opts.transfer_penalty_secs)?;
        trace_route(&feed, &tau, dep_secs, dest_stop_id, k)
    }

    /// Route between two coordinates.
    pub fn one_to_one(
        &self,
        origin: &Location,
        dep_secs: Secs,
        destination: &Location,
        user: &QueryOptionsOverride,
    ) -> Result<Option<Route>, Error> {
        let opts = self.complete_options(user);
        let feed = AugmentedFeed::for_query(
            &self.feed,
            origin,
            std::slice::from_ref(destination),
            opts.max_walking_distance_km,
        )?;
        let tau = run_raptor(&feed, &origin.id, dep_secs, &opts);
        let Some(k) = find_best_k(&tau, &destination.id, opts.transfer_penalty_secs) else {
            return Ok(None);
        };
        Ok(trace_route(&feed, &tau, dep_secs, &destination.id, k))
    }

    /// Travel time in seconds to every destination; unreachable
    /// destinations map to infinity.
    pub fn one_to_many(
        &self,
        origin: &Location,
        dep_secs: Secs,
        destinations: &[Location],
        user: &QueryOptionsOverride,
    ) -> Result<HashMap<String, f64>, Error> {
        let opts = self.complete_options(user);
        let feed = AugmentedFeed::for_query(
            &self.feed,
            origin,
            destinations,
            opts.max_walking_distance_km,
        )?;
        let tau = run_raptor(&feed, &origin.id, dep_secs, &opts);
        Ok(self.collect_travel_times(&tau, dep_secs, destinations.iter().map(|d| &d.id), &opts))
    }

    /// Same as [`one_to_many`](Self::one_to_many) over a cached preset.
    pub fn one_to_many_preset(
        &self,
        origin: &Location,
        dep_secs: Secs,
        preset_name: &str,
        user: &QueryOptionsOverride,
    ) -> Result<HashMap<String, f64>, Error> {
        let opts = self.complete_options(user);
        let preset = self
            .presets
            .get(preset_name)
            .ok_or_else(|| Error::UnknownPreset(preset_name.to_string()))?;
        let feed = preset.augment(&self.feed, origin, opts.max_walking_distance_km)?;
        let tau = run_raptor(&feed, &origin.id, dep_secs, &opts);
        Ok(self.collect_travel_times(
            &tau,
            dep_secs,
            preset.destinations.iter().map(|d| &d.id),
            &opts,
        ))
    }

    /// Fold of [`one_to_many`](Self::one_to_many) over every origin.
    pub fn many_to_many(
        &self,
        origins: &[Location],
        dep_secs: Secs,
        destinations: &[Location],
        user: &QueryOptionsOverride,
    ) -> Result<HashMap<String, HashMap<String, f64>>, Error> {
        let mut result = HashMap::new();
        for origin in origins {
            result.insert(
                origin.id.clone(),
                self.one_to_many(origin, dep_secs, destinations, user)?,
            );
        }
        Ok(result)
    }

    fn collect_travel_times<'i>(
        &self,
        tau: &super::raptor::Tau,
        dep_secs: Secs,
        dest_ids: impl Iterator<Item = &'i String>,
        opts: &QueryOptions,
    ) -> HashMap<String, f64> {
        dest_ids
            .map(|id| {
                let travel = find_best_k(tau, id, opts.transfer_penalty_secs)
                    .and_then(|k| tau.reach(k, id))
                    .map_or(f64::INFINITY, |info| info.time - dep_secs as f64);
                (id.clone(), travel)
            })
            .collect()
    }
}
