//! Walking-transfer construction.
//!
//! Combines three sources into the footpath graph: free intra-station
//! transfers, explicit MIN_TIME transfers from the feed, and proximity
//! footpaths between served stops. Proximity pairs are rejected when they
//! cross water, when both stops serve the same route set, or when their
//! source feed declared its own transfers.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use log::info;

use crate::model::types::{TransferType, WalkCost, WalkingTransfer};
use crate::model::IndexedFeed;
use crate::spatial::StopIndex;

/// Fills `indexed.walking_transfers` from the three transfer sources,
/// deduplicating per ordered pair and sorting each origin's list.
pub(crate) fn build_walking_transfers(indexed: &mut IndexedFeed, max_between_stop_walk_km: f64) {
    let mut edges: Vec<(String, WalkingTransfer)> = Vec::new();
    intra_station_transfers(indexed, &mut edges);
    explicit_min_time_transfers(indexed, &mut edges);
    proximity_footpaths(indexed, max_between_stop_walk_km, &mut edges);

    // One edge per ordered pair: a feed-declared duration beats a derived
    // crow-flies distance; within a kind the smaller value wins.
    let mut per_origin: HashMap<String, HashMap<String, WalkingTransfer>> = HashMap::new();
    for (from, edge) in edges {
        if from == edge.to_stop_id {
            continue;
        }
        let slot = per_origin
            .entry(from)
            .or_default()
            .entry(edge.to_stop_id.clone());
        slot.and_modify(|current| {
            if beats(edge.cost, current.cost) {
                *current = edge.clone();
            }
        })
        .or_insert(edge);
    }

    let mut walking_transfers: HashMap<String, Vec<WalkingTransfer>> = HashMap::new();
    let mut edge_count = 0usize;
    for (from, by_dest) in per_origin {
        let mut list: Vec<WalkingTransfer> = by_dest.into_values().collect();
        list.sort_by(WalkingTransfer::ordering);
        edge_count += list.len();
        walking_transfers.insert(from, list);
    }
    info!(
        "Built walking transfers: {edge_count} edges from {} stops",
        walking_transfers.len()
    );
    indexed.walking_transfers = walking_transfers;
}

/// Whether cost `a` wins over `b` for the same ordered stop pair.
fn beats(a: WalkCost, b: WalkCost) -> bool {
    match (a, b) {
        (WalkCost::Secs(x), WalkCost::Secs(y)) => x < y,
        (WalkCost::Km(x), WalkCost::Km(y)) => x < y,
        (WalkCost::Secs(_), WalkCost::Km(_)) => true,
        (WalkCost::Km(_), WalkCost::Secs(_)) => false,
    }
}

/// Free transfers among same-station stops: every ordered pair of members
/// of a parent station (the children plus the parent itself when it is a
/// stop) costs zero seconds.
fn intra_station_transfers(indexed: &IndexedFeed, edges: &mut Vec<(String, WalkingTransfer)>) {
    let parents: BTreeSet<&String> = indexed
        .feed
        .stops
        .iter()
        .filter_map(|stop| stop.parent_station.as_ref())
        .collect();

    for parent in parents {
        let members = station_members(indexed, parent);
        for a in &members {
            for b in &members {
                if a != b {
                    edges.push((
                        a.clone(),
                        WalkingTransfer {
                            to_stop_id: b.clone(),
                            cost: WalkCost::Secs(0),
                        },
                    ));
                }
            }
        }
    }
}

/// Children of `station_id` plus the station itself when it exists as a
/// stop record.
fn station_members(indexed: &IndexedFeed, station_id: &str) -> Vec<String> {
    let mut members: Vec<String> = indexed.children_of(station_id).to_vec();
    if indexed.stop(station_id).is_some() {
        members.push(station_id.to_string());
    }
    members
}

/// Explicit MIN_TIME transfers, expanded over every (member-of-from,
/// member-of-to) pair. A transfer with identical endpoints still expands to
/// its sibling pairs; only identity pairs are skipped.
fn explicit_min_time_transfers(indexed: &IndexedFeed, edges: &mut Vec<(String, WalkingTransfer)>) {
    for transfer in &indexed.feed.transfers {
        if transfer.transfer_type != TransferType::MinTime {
            continue;
        }
        let Some(secs) = transfer.min_transfer_secs else {
            continue;
        };
        let from_members = station_members(indexed, &transfer.from_stop_id);
        let to_members = station_members(indexed, &transfer.to_stop_id);
        for a in &from_members {
            for b in &to_members {
                if a != b {
                    edges.push((
                        a.clone(),
                        WalkingTransfer {
                            to_stop_id: b.clone(),
                            cost: WalkCost::Secs(secs),
                        },
                    ));
                }
            }
        }
    }
}

/// Crow-flies footpaths between stops that actually have service.
fn proximity_footpaths(
    indexed: &IndexedFeed,
    max_km: f64,
    edges: &mut Vec<(String, WalkingTransfer)>,
) {
    let served: Vec<&crate::model::Stop> = indexed
        .feed
        .stops
        .iter()
        .filter(|stop| indexed.has_departures(&stop.stop_id))
        .collect();
    let routes_by_stop: HashMap<&str, BTreeSet<&str>> = served
        .iter()
        .map(|stop| {
            let routes: BTreeSet<&str> = indexed
                .departures_at(&stop.stop_id)
                .iter()
                .filter_map(|&idx| indexed.trip(&indexed.stop_time(idx).trip_id))
                .map(|trip| trip.route_id.as_str())
                .collect();
            (stop.stop_id.as_str(), routes)
        })
        .collect();

    let served_index = StopIndex::build(
        served
            .iter()
            .map(|stop| (stop.stop_id.clone(), stop.lat, stop.lng)),
    );
    let pairs = served_index.intersect(&served_index, max_km);

    for (from_id, neighbors) in &pairs {
        let from = indexed.stop(from_id).unwrap();
        for neighbor in neighbors {
            // Each unordered pair once.
            if *from_id >= neighbor.id {
                continue;
            }
            let to = indexed.stop(&neighbor.id).unwrap();
            if routes_by_stop[from_id.as_str()] == routes_by_stop[neighbor.id.as_str()] {
                continue;
            }
            if let (Some(feed_a), Some(feed_b)) = (&from.feed_name, &to.feed_name) {
                if feed_a == feed_b && indexed.feed.feeds_with_transfers.contains(feed_a) {
                    continue;
                }
            }
            if indexed.water.crosses(from.lat, from.lng, to.lat, to.lng) {
                continue;
            }
            edges.push((
                from_id.clone(),
                WalkingTransfer {
                    to_stop_id: neighbor.id.clone(),
                    cost: WalkCost::Km(neighbor.km),
                },
            ));
            edges.push((
                neighbor.id.clone(),
                WalkingTransfer {
                    to_stop_id: from_id.clone(),
                    cost: WalkCost::Km(neighbor.km),
                },
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{Route, RouteType, Stop, StopTime, Transfer, Trip};
    use crate::model::Feed;
    use crate::water::WaterFilter;
    use geo::Coord;

    fn stop(id: &str, lat: f64, lng: f64, parent: Option<&str>) -> Stop {
        Stop {
            stop_id: id.to_string(),
            stop_name: id.to_string(),
            stop_desc: None,
            lat,
            lng,
            parent_station: parent.map(String::from),
            feed_name: Some("demo".to_string()),
        }
    }

    fn trip(id: &str, route: &str) -> Trip {
        Trip {
            trip_id: id.to_string(),
            route_id: route.to_string(),
            service_id: "S".to_string(),
            direction_id: 0,
            shape_id: None,
            headsign: None,
            short_name: None,
            block_id: None,
        }
    }

    fn route(id: &str) -> Route {
        Route {
            route_id: id.to_string(),
            route_type: RouteType::Bus,
            short_name: None,
            long_name: None,
            color: None,
            text_color: None,
        }
    }

    fn stop_time(trip: &str, stop: &str, seq: u32, secs: u32) -> StopTime {
        StopTime {
            trip_id: trip.to_string(),
            stop_id: stop.to_string(),
            stop_sequence: seq,
            arrival_secs: secs,
            departure_secs: secs,
        }
    }

    fn build(feed: Feed, water: WaterFilter, max_km: f64) -> IndexedFeed {
        let mut indexed = IndexedFeed::from_feed(feed, water, &[]);
        build_walking_transfers(&mut indexed, max_km);
        indexed
    }

    fn edge_to<'a>(
        indexed: &'a IndexedFeed,
        from: &str,
        to: &str,
    ) -> Option<&'a WalkingTransfer> {
        indexed
            .walking_transfers_from(from)
            .iter()
            .find(|t| t.to_stop_id == to)
    }

    #[test]
    fn intra_station_pairs_are_free_and_symmetric() {
        let feed = Feed {
            stops: vec![
                stop("P", 47.0, 8.0, None),
                stop("P1", 47.0, 8.0001, Some("P")),
                stop("P2", 47.0, 8.0002, Some("P")),
            ],
            ..Feed::default()
        };
        let indexed = build(feed, WaterFilter::default(), 1.5);
        for (a, b) in [("P1", "P2"), ("P2", "P1"), ("P", "P1"), ("P1", "P")] {
            assert_eq!(edge_to(&indexed, a, b).unwrap().cost, WalkCost::Secs(0));
        }
        // No self-loops.
        assert!(edge_to(&indexed, "P1", "P1").is_none());
    }

    #[test]
    fn explicit_min_time_expands_over_children() {
        let feed = Feed {
            stops: vec![
                stop("A", 47.0, 8.0, None),
                stop("A1", 47.0, 8.0001, Some("A")),
                stop("B", 47.1, 8.1, None),
                stop("B1", 47.1, 8.1001, Some("B")),
            ],
            transfers: vec![Transfer {
                from_stop_id: "A".to_string(),
                to_stop_id: "B".to_string(),
                transfer_type: TransferType::MinTime,
                min_transfer_secs: Some(240),
            }],
            ..Feed::default()
        };
        let indexed = build(feed, WaterFilter::default(), 0.0);
        for from in ["A", "A1"] {
            for to in ["B", "B1"] {
                assert_eq!(
                    edge_to(&indexed, from, to).unwrap().cost,
                    WalkCost::Secs(240)
                );
            }
        }
        // Directed: nothing back from B.
        assert!(edge_to(&indexed, "B", "A").is_none());
    }

    fn proximity_feed() -> Feed {
        Feed {
            stops: vec![
                stop("X", 47.0, 8.0, None),
                stop("Y", 47.0, 8.01, None),
                stop("UNSERVED", 47.0, 8.005, None),
            ],
            trips: vec![trip("T1", "R1"), trip("T2", "R2")],
            routes: vec![route("R1"), route("R2")],
            stop_times: vec![
                stop_time("T1", "X", 1, 21600),
                stop_time("T2", "Y", 1, 21600),
            ],
            ..Feed::default()
        }
    }

    #[test]
    fn proximity_footpaths_link_served_stops_both_ways() {
        let indexed = build(proximity_feed(), WaterFilter::default(), 1.5);
        let forward = edge_to(&indexed, "X", "Y").unwrap();
        let WalkCost::Km(km) = forward.cost else {
            panic!("expected walked edge");
        };
        assert!(km > 0.7 && km < 0.9);
        assert!(edge_to(&indexed, "Y", "X").is_some());
        // Unserved stops take no part in proximity pairing.
        assert!(edge_to(&indexed, "X", "UNSERVED").is_none());
        assert!(indexed.walking_transfers_from("UNSERVED").is_empty());
    }

    #[test]
    fn water_barrier_rejects_crossing_pairs() {
        let water = WaterFilter::from_polylines(vec![vec![
            Coord { x: 8.005, y: 46.9 },
            Coord { x: 8.005, y: 47.1 },
        ]]);
        let indexed = build(proximity_feed(), water, 1.5);
        assert!(edge_to(&indexed, "X", "Y").is_none());
    }

    #[test]
    fn identical_route_sets_are_redundant() {
        let mut feed = proximity_feed();
        // Both stops now served by the same single route.
        feed.trips = vec![trip("T1", "R1"), trip("T2", "R1")];
        let indexed = build(feed, WaterFilter::default(), 1.5);
        assert!(edge_to(&indexed, "X", "Y").is_none());
    }

    #[test]
    fn feeds_with_declared_transfers_suppress_proximity() {
        let mut feed = proximity_feed();
        feed.feeds_with_transfers.insert("demo".to_string());
        let indexed = build(feed, WaterFilter::default(), 1.5);
        assert!(edge_to(&indexed, "X", "Y").is_none());
    }

    #[test]
    fn explicit_duration_beats_derived_distance() {
        let mut feed = proximity_feed();
        feed.transfers = vec![Transfer {
            from_stop_id: "X".to_string(),
            to_stop_id: "Y".to_string(),
            transfer_type: TransferType::MinTime,
            min_transfer_secs: Some(300),
        }];
        // feeds_with_transfers is only populated by the merge step, so the
        // proximity source still produces the X-Y pair here.
        let mut indexed = IndexedFeed::from_feed(feed, WaterFilter::default(), &[]);
        build_walking_transfers(&mut indexed, 1.5);
        assert_eq!(
            edge_to(&indexed, "X", "Y").unwrap().cost,
            WalkCost::Secs(300)
        );
        // The reverse direction keeps its walked cost.
        assert!(matches!(
            edge_to(&indexed, "Y", "X").unwrap().cost,
            WalkCost::Km(_)
        ));
    }
}
