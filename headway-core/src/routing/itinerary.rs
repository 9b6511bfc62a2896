//! Step-by-step route reconstruction from a finished `Tau`.

use geo::{Distance, Haversine, Point};
use serde::Serialize;

use super::online::AugmentedFeed;
use super::raptor::{ReachMode, Tau};
use crate::Secs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepMode {
    Transit,
    Walk,
}

/// One hop of an itinerary.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub from: String,
    pub to: String,
    pub mode: StepMode,
    pub depart_secs: f64,
    pub arrive_secs: f64,
    pub travel_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_stops: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub description: String,
}

/// A reconstructed journey.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub departure_secs: f64,
    pub arrive_time_secs: f64,
    pub travel_time_secs: f64,
    pub walking_distance_km: f64,
    pub steps: Vec<Step>,
}

/// Walks backward from `(dest, k)` along `prev_stop`/`prev_k`, emitting one
/// step per hop. `None` when the chain is broken (the destination was not
/// reached in round `k`).
pub fn trace_route(
    feed: &AugmentedFeed<'_>,
    tau: &Tau,
    dep_secs: Secs,
    dest: &str,
    k: usize,
) -> Option<Route> {
    let arrival = tau.reach(k, dest)?.time;
    let mut steps: Vec<Step> = Vec::new();

    let mut cursor = (dest.to_string(), k);
    loop {
        let info = tau.reach(cursor.1, &cursor.0)?;
        match &info.mode {
            ReachMode::Origin => break,
            ReachMode::Transit { trip_id } => {
                let from = info.prev_stop.clone()?;
                steps.push(transit_step(feed, trip_id, &from, &cursor.0, info.time)?);
                cursor = (from, info.prev_k?);
            }
            ReachMode::Walk => {
                let from = info.prev_stop.clone()?;
                let prev_k = info.prev_k?;
                let depart = tau.reach(prev_k, &from)?.time;
                steps.push(walk_step(feed, &from, &cursor.0, depart, info.time)?);
                cursor = (from, prev_k);
            }
        }
    }
    steps.reverse();

    let walking_distance_km = steps.iter().filter_map(|s| s.distance_km).sum();
    Some(Route {
        departure_secs: dep_secs as f64,
        arrive_time_secs: arrival,
        travel_time_secs: arrival - dep_secs as f64,
        walking_distance_km,
        steps,
    })
}

fn transit_step(
    feed: &AugmentedFeed<'_>,
    trip_id: &str,
    from: &str,
    to: &str,
    arrive_secs: f64,
) -> Option<Step> {
    let calls = feed.trip_calls(trip_id);
    let to_pos = calls.iter().position(|&idx| {
        let call = feed.stop_time(idx);
        call.stop_id == to && call.time_of_day() as f64 == arrive_secs
    })?;
    // The boarding call is the last visit of `from` before the alighting
    // call (trips revisiting a stop are rare but legal).
    let from_pos = calls[..to_pos]
        .iter()
        .rposition(|&idx| feed.stop_time(idx).stop_id == from)?;
    let board = feed.stop_time(calls[from_pos]);
    let alight = feed.stop_time(calls[to_pos]);
    let depart_secs = board.time_of_day() as f64;

    let trip = feed.trip(trip_id);
    let route_id = trip.map(|t| t.route_id.clone());
    let route_label = route_id
        .as_deref()
        .and_then(|id| feed.route(id))
        .map(|route| route.label().to_string())
        .or_else(|| route_id.clone())
        .unwrap_or_else(|| trip_id.to_string());
    let from_name = stop_name(feed, from);
    let to_name = stop_name(feed, to);
    let num_stops = alight.stop_sequence - board.stop_sequence;

    Some(Step {
        from: from.to_string(),
        to: to.to_string(),
        mode: StepMode::Transit,
        depart_secs,
        arrive_secs,
        travel_secs: arrive_secs - depart_secs,
        trip_id: Some(trip_id.to_string()),
        route_id,
        num_stops: Some(num_stops),
        distance_km: None,
        description: format!("Ride {route_label} from {from_name} to {to_name}"),
    })
}

fn walk_step(
    feed: &AugmentedFeed<'_>,
    from: &str,
    to: &str,
    depart_secs: f64,
    arrive_secs: f64,
) -> Option<Step> {
    let from_stop = feed.stop(from)?;
    let to_stop = feed.stop(to)?;
    let meters = Haversine.distance(
        Point::new(from_stop.lng, from_stop.lat),
        Point::new(to_stop.lng, to_stop.lat),
    );
    Some(Step {
        from: from.to_string(),
        to: to.to_string(),
        mode: StepMode::Walk,
        depart_secs,
        arrive_secs,
        travel_secs: arrive_secs - depart_secs,
        trip_id: None,
        route_id: None,
        num_stops: None,
        distance_km: Some(meters / 1000.0),
        description: format!(
            "Walk from {} to {}",
            from_stop.stop_name, to_stop.stop_name
        ),
    })
}

fn stop_name(feed: &AugmentedFeed<'_>, stop_id: &str) -> String {
    feed.stop(stop_id)
        .map(|stop| stop.stop_name.clone())
        .unwrap_or_else(|| stop_id.to_string())
}
