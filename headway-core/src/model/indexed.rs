//! Derived indices over a merged feed.
//!
//! `IndexedFeed` owns the raw [`Feed`] and adds the id-keyed maps the router
//! needs, the stop spatial index, and the walking-transfer graph built by
//! `loading::transfers`. Built once per process and immutable afterwards.

use geo::Coord;
use hashbrown::HashMap;
use log::warn;

use super::feed::Feed;
use super::types::{Route, Stop, StopTime, Trip, WalkingTransfer};
use crate::geometry::closest_point_on_line_string;
use crate::spatial::StopIndex;
use crate::water::WaterFilter;

/// Config-supplied fallback shape for trips missing a `shape_id`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ShapeHint {
    pub route_id: String,
    #[serde(default)]
    pub direction_id: u8,
    pub shape_id: String,
}

#[derive(Debug, Clone)]
pub struct IndexedFeed {
    pub feed: Feed,
    /// Stop-time indices per stop, sorted by time of day.
    stop_times_by_stop: HashMap<String, Vec<u32>>,
    /// Stop-time indices per trip, sorted by stop sequence.
    stop_times_by_trip: HashMap<String, Vec<u32>>,
    trips_by_id: HashMap<String, u32>,
    stops_by_id: HashMap<String, u32>,
    routes_by_id: HashMap<String, u32>,
    /// Shape polylines as (lng, lat) coordinates, ordered by point sequence.
    shapes_by_id: HashMap<String, Vec<Coord<f64>>>,
    children_by_parent: HashMap<String, Vec<String>>,
    /// `"{direction_id}{route_id}"` -> fallback shape id.
    shape_hints: HashMap<String, String>,
    /// Directed walking edges per origin stop, deduplicated and sorted.
    pub walking_transfers: HashMap<String, Vec<WalkingTransfer>>,
    pub stop_index: StopIndex,
    pub water: WaterFilter,
}

impl IndexedFeed {
    /// Builds every index except the walking-transfer graph, which
    /// `loading::transfers::build_walking_transfers` fills in afterwards.
    pub fn from_feed(feed: Feed, water: WaterFilter, hints: &[ShapeHint]) -> IndexedFeed {
        let stops_by_id: HashMap<String, u32> = feed
            .stops
            .iter()
            .enumerate()
            .map(|(idx, stop)| (stop.stop_id.clone(), idx as u32))
            .collect();
        let trips_by_id: HashMap<String, u32> = feed
            .trips
            .iter()
            .enumerate()
            .map(|(idx, trip)| (trip.trip_id.clone(), idx as u32))
            .collect();
        let routes_by_id: HashMap<String, u32> = feed
            .routes
            .iter()
            .enumerate()
            .map(|(idx, route)| (route.route_id.clone(), idx as u32))
            .collect();

        let mut stop_times_by_stop: HashMap<String, Vec<u32>> = HashMap::new();
        let mut stop_times_by_trip: HashMap<String, Vec<u32>> = HashMap::new();
        let mut orphaned = 0usize;
        for (idx, st) in feed.stop_times.iter().enumerate() {
            if !stops_by_id.contains_key(&st.stop_id) || !trips_by_id.contains_key(&st.trip_id) {
                orphaned += 1;
                continue;
            }
            stop_times_by_stop
                .entry(st.stop_id.clone())
                .or_default()
                .push(idx as u32);
            stop_times_by_trip
                .entry(st.trip_id.clone())
                .or_default()
                .push(idx as u32);
        }
        if orphaned > 0 {
            warn!("Dropped {orphaned} stop times referencing unknown stops or trips");
        }
        for indices in stop_times_by_stop.values_mut() {
            indices.sort_by_key(|&i| feed.stop_times[i as usize].time_of_day());
        }
        for indices in stop_times_by_trip.values_mut() {
            indices.sort_by_key(|&i| feed.stop_times[i as usize].stop_sequence);
        }

        let mut children_by_parent: HashMap<String, Vec<String>> = HashMap::new();
        for stop in &feed.stops {
            if let Some(parent) = &stop.parent_station {
                children_by_parent
                    .entry(parent.clone())
                    .or_default()
                    .push(stop.stop_id.clone());
            }
        }
        for children in children_by_parent.values_mut() {
            children.sort();
        }

        let mut shapes_by_id: HashMap<String, Vec<(u32, Coord<f64>)>> = HashMap::new();
        for point in &feed.shapes {
            shapes_by_id.entry(point.shape_id.clone()).or_default().push((
                point.sequence,
                Coord {
                    x: point.lng,
                    y: point.lat,
                },
            ));
        }
        let shapes_by_id: HashMap<String, Vec<Coord<f64>>> = shapes_by_id
            .into_iter()
            .map(|(id, mut points)| {
                points.sort_by_key(|&(seq, _)| seq);
                (id, points.into_iter().map(|(_, c)| c).collect())
            })
            .collect();

        let shape_hints = derive_shape_hints(&feed, &shapes_by_id, hints);

        let stop_index = StopIndex::build(
            feed.stops
                .iter()
                .map(|s| (s.stop_id.clone(), s.lat, s.lng)),
        );

        IndexedFeed {
            feed,
            stop_times_by_stop,
            stop_times_by_trip,
            trips_by_id,
            stops_by_id,
            routes_by_id,
            shapes_by_id,
            children_by_parent,
            shape_hints,
            walking_transfers: HashMap::new(),
            stop_index,
            water,
        }
    }

    pub fn stop(&self, stop_id: &str) -> Option<&Stop> {
        self.stops_by_id
            .get(stop_id)
            .map(|&idx| &self.feed.stops[idx as usize])
    }

    pub fn trip(&self, trip_id: &str) -> Option<&Trip> {
        self.trips_by_id
            .get(trip_id)
            .map(|&idx| &self.feed.trips[idx as usize])
    }

    pub fn route(&self, route_id: &str) -> Option<&Route> {
        self.routes_by_id
            .get(route_id)
            .map(|&idx| &self.feed.routes[idx as usize])
    }

    pub fn stop_time(&self, index: u32) -> &StopTime {
        &self.feed.stop_times[index as usize]
    }

    /// Stop-time indices at `stop_id`, ordered by time of day.
    pub fn departures_at(&self, stop_id: &str) -> &[u32] {
        self.stop_times_by_stop
            .get(stop_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Stop-time indices of `trip_id`, ordered by stop sequence.
    pub fn trip_calls(&self, trip_id: &str) -> &[u32] {
        self.stop_times_by_trip
            .get(trip_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_departures(&self, stop_id: &str) -> bool {
        !self.departures_at(stop_id).is_empty()
    }

    pub fn children_of(&self, parent_id: &str) -> &[String] {
        self.children_by_parent
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn walking_transfers_from(&self, stop_id: &str) -> &[WalkingTransfer] {
        self.walking_transfers
            .get(stop_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The shape polyline for a trip: its own `shape_id`, or the hint for
    /// its direction and route.
    pub fn shape_for_trip(&self, trip: &Trip) -> Option<&[Coord<f64>]> {
        let shape_id = trip.shape_id.as_deref().or_else(|| {
            self.shape_hints
                .get(&shape_hint_key(trip.direction_id, &trip.route_id))
                .map(String::as_str)
        })?;
        self.shapes_by_id.get(shape_id).map(Vec::as_slice)
    }

    /// The slice of a trip's shape between two stops, for client display.
    /// Projects both stops onto the polyline and returns the stretch between
    /// the projections (endpoints included).
    pub fn shape_between(
        &self,
        trip_id: &str,
        from_stop_id: &str,
        to_stop_id: &str,
    ) -> Option<Vec<Coord<f64>>> {
        let trip = self.trip(trip_id)?;
        let shape = self.shape_for_trip(trip)?;
        let from = self.stop(from_stop_id)?;
        let to = self.stop(to_stop_id)?;
        let from_hit = closest_point_on_line_string(
            Coord {
                x: from.lng,
                y: from.lat,
            },
            shape,
        )?;
        let to_hit = closest_point_on_line_string(
            Coord {
                x: to.lng,
                y: to.lat,
            },
            shape,
        )?;

        let mut slice = Vec::new();
        if from_hit.before_index <= to_hit.before_index {
            slice.push(from_hit.point);
            slice.extend_from_slice(&shape[from_hit.after_index..=to_hit.before_index]);
            slice.push(to_hit.point);
        } else {
            // Stop order runs against the digitized shape direction.
            slice.push(from_hit.point);
            let mut middle = shape[to_hit.after_index..=from_hit.before_index].to_vec();
            middle.reverse();
            slice.extend(middle);
            slice.push(to_hit.point);
        }
        slice.dedup();
        Some(slice)
    }
}

fn shape_hint_key(direction_id: u8, route_id: &str) -> String {
    format!("{direction_id}{route_id}")
}

/// For every (direction, route) with trips missing a shape, falls back to
/// the longest shape any trip of that key carries. User hints override.
fn derive_shape_hints(
    feed: &Feed,
    shapes: &HashMap<String, Vec<Coord<f64>>>,
    overrides: &[ShapeHint],
) -> HashMap<String, String> {
    let mut hints: HashMap<String, String> = HashMap::new();
    for trip in &feed.trips {
        let Some(shape_id) = &trip.shape_id else {
            continue;
        };
        let Some(points) = shapes.get(shape_id) else {
            continue;
        };
        let key = shape_hint_key(trip.direction_id, &trip.route_id);
        let better = match hints.get(&key).and_then(|current| shapes.get(current)) {
            None => true,
            Some(current) => {
                points.len() > current.len()
                    || (points.len() == current.len() && shape_id.as_str() < hints[&key].as_str())
            }
        };
        if better {
            hints.insert(key, shape_id.clone());
        }
    }
    for hint in overrides {
        hints.insert(
            shape_hint_key(hint.direction_id, &hint.route_id),
            hint.shape_id.clone(),
        );
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{RouteType, ShapePoint};

    fn small_feed() -> Feed {
        Feed {
            stops: vec![
                Stop {
                    stop_id: "A".to_string(),
                    stop_name: "A".to_string(),
                    stop_desc: None,
                    lat: 47.0,
                    lng: 8.0,
                    parent_station: None,
                    feed_name: None,
                },
                Stop {
                    stop_id: "B".to_string(),
                    stop_name: "B".to_string(),
                    stop_desc: None,
                    lat: 47.0,
                    lng: 8.02,
                    parent_station: None,
                    feed_name: None,
                },
            ],
            stop_times: vec![
                StopTime {
                    trip_id: "T1".to_string(),
                    stop_id: "B".to_string(),
                    stop_sequence: 2,
                    arrival_secs: 7200,
                    departure_secs: 7200,
                },
                StopTime {
                    trip_id: "T1".to_string(),
                    stop_id: "A".to_string(),
                    stop_sequence: 1,
                    arrival_secs: 3600,
                    departure_secs: 3600,
                },
            ],
            trips: vec![Trip {
                trip_id: "T1".to_string(),
                route_id: "R1".to_string(),
                service_id: "S".to_string(),
                direction_id: 0,
                shape_id: Some("SH1".to_string()),
                headsign: None,
                short_name: None,
                block_id: None,
            }],
            routes: vec![Route {
                route_id: "R1".to_string(),
                route_type: RouteType::Bus,
                short_name: None,
                long_name: None,
                color: None,
                text_color: None,
            }],
            shapes: vec![
                ShapePoint {
                    shape_id: "SH1".to_string(),
                    lat: 47.0,
                    lng: 8.0,
                    sequence: 1,
                },
                ShapePoint {
                    shape_id: "SH1".to_string(),
                    lat: 47.0,
                    lng: 8.01,
                    sequence: 2,
                },
                ShapePoint {
                    shape_id: "SH1".to_string(),
                    lat: 47.0,
                    lng: 8.02,
                    sequence: 3,
                },
            ],
            ..Feed::default()
        }
    }

    #[test]
    fn trip_calls_sorted_by_sequence() {
        let indexed = IndexedFeed::from_feed(small_feed(), WaterFilter::default(), &[]);
        let calls: Vec<u32> = indexed.trip_calls("T1").to_vec();
        let seqs: Vec<u32> = calls
            .iter()
            .map(|&i| indexed.stop_time(i).stop_sequence)
            .collect();
        assert_eq!(seqs, [1, 2]);
    }

    #[test]
    fn departures_sorted_by_time() {
        let indexed = IndexedFeed::from_feed(small_feed(), WaterFilter::default(), &[]);
        assert!(indexed.has_departures("A"));
        assert_eq!(
            indexed
                .stop_time(indexed.departures_at("A")[0])
                .time_of_day(),
            3600
        );
        assert!(!indexed.has_departures("MISSING"));
    }

    #[test]
    fn shape_between_slices_polyline() {
        let indexed = IndexedFeed::from_feed(small_feed(), WaterFilter::default(), &[]);
        let slice = indexed.shape_between("T1", "A", "B").unwrap();
        assert_eq!(slice.first().unwrap().x, 8.0);
        assert_eq!(slice.last().unwrap().x, 8.02);
        assert!(slice.len() >= 3);
    }

    #[test]
    fn shape_hint_fallback_for_shapeless_trip() {
        let mut feed = small_feed();
        feed.trips.push(Trip {
            trip_id: "T2".to_string(),
            route_id: "R1".to_string(),
            service_id: "S".to_string(),
            direction_id: 0,
            shape_id: None,
            headsign: None,
            short_name: None,
            block_id: None,
        });
        let indexed = IndexedFeed::from_feed(feed, WaterFilter::default(), &[]);
        let trip = indexed.trip("T2").unwrap().clone();
        assert!(indexed.shape_for_trip(&trip).is_some());
    }
}
