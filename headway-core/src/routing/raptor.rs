//! Round-based reachability over the transit network.
//!
//! The router alternates vehicle-boarding rounds and walking rounds over a
//! list of reach maps (`Tau`). `tau[k]` holds, for every stop, the best way
//! to reach it in exactly k alternating rounds. Boarding rounds start from
//! an empty map so that journeys which look bad mid-way but pay off later
//! survive; walking rounds copy the previous frontier forward so a transit
//! arrival can be extended by one walk. Relaxation is by strictly lower
//! accumulated cost, where cost is waiting time plus multiplier-weighted
//! ride time plus walking time.

use hashbrown::{HashMap, HashSet};

use super::online::AugmentedFeed;
use crate::loading::QueryOptions;
use crate::Secs;

/// How a stop was reached in some round.
#[derive(Debug, Clone, PartialEq)]
pub enum ReachMode {
    Origin,
    Transit { trip_id: String },
    Walk,
}

/// Best-known arrival at a stop after a given number of rounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachInfo {
    /// Arrival instant, seconds since midnight. Fractional once a walk leg
    /// is involved.
    pub time: f64,
    /// Accumulated cost since departure: waiting plus weighted riding plus
    /// walking.
    pub cost: f64,
    pub mode: ReachMode,
    pub prev_stop: Option<String>,
    pub prev_k: Option<usize>,
}

pub type ReachMap = HashMap<String, ReachInfo>;

/// Reach maps per round, with the per-round frontier (stops improved in
/// that round) kept as a sidecar set.
#[derive(Debug, Default)]
pub struct Tau {
    pub rounds: Vec<ReachMap>,
    pub frontiers: Vec<HashSet<String>>,
}

impl Tau {
    fn new() -> Self {
        Tau::default()
    }

    fn push_round(&mut self) {
        self.rounds.push(ReachMap::new());
        self.frontiers.push(HashSet::new());
    }

    pub fn reach(&self, k: usize, stop_id: &str) -> Option<&ReachInfo> {
        self.rounds.get(k).and_then(|round| round.get(stop_id))
    }

    /// Relaxation: install `candidate` at `stop_id` in round `k` unless an
    /// entry with equal or lower cost is already there. Newly installed
    /// entries join the round's frontier.
    fn add_connection(&mut self, k: usize, stop_id: &str, candidate: ReachInfo) {
        match self.rounds[k].entry(stop_id.to_string()) {
            hashbrown::hash_map::Entry::Occupied(mut entry) => {
                if entry.get().cost > candidate.cost {
                    entry.insert(candidate);
                    self.frontiers[k].insert(stop_id.to_string());
                }
            }
            hashbrown::hash_map::Entry::Vacant(entry) => {
                entry.insert(candidate);
                self.frontiers[k].insert(stop_id.to_string());
            }
        }
    }

    /// Frontier stops of round `k` in deterministic order.
    fn frontier_sorted(&self, k: usize) -> Vec<String> {
        let mut stops: Vec<String> = self.frontiers[k].iter().cloned().collect();
        stops.sort();
        stops
    }
}

/// Runs the full round sequence from `origin` departing at `dep_secs`.
///
/// Performs `1 + max_number_of_transfers` boarding rounds, each followed by
/// a walking round; an origin without scheduled departures (an ephemeral
/// query endpoint) gets one extra walking round up front to enter the
/// network. Stops early when a round moves nothing.
pub fn run_raptor(
    feed: &AugmentedFeed<'_>,
    origin: &str,
    dep_secs: Secs,
    opts: &QueryOptions,
) -> Tau {
    let last_valid = dep_secs as f64 + opts.max_commute_time_secs;
    let mut tau = Tau::new();
    tau.push_round();
    tau.rounds[0].insert(
        origin.to_string(),
        ReachInfo {
            time: dep_secs as f64,
            cost: 0.0,
            mode: ReachMode::Origin,
            prev_stop: None,
            prev_k: None,
        },
    );
    tau.frontiers[0].insert(origin.to_string());

    let mut k = 1;
    if !feed.has_departures(origin) {
        tau.push_round();
        make_transfers(feed, &mut tau, 0, opts, last_valid);
        k = 2;
    }

    for _ in 0..=opts.max_number_of_transfers {
        tau.push_round();
        take_vehicles(feed, &mut tau, k, opts, last_valid);
        tau.push_round();
        make_transfers(feed, &mut tau, k, opts, last_valid);
        if tau.frontiers[k + 1].is_empty() {
            break;
        }
        k += 2;
    }
    tau
}

/// Boarding round: for every frontier stop of round `k - 1`, board each
/// departure within the waiting window and record every downstream call of
/// the boarded trip into round `k`.
fn take_vehicles(
    feed: &AugmentedFeed<'_>,
    tau: &mut Tau,
    k: usize,
    opts: &QueryOptions,
    last_valid: f64,
) {
    for stop_id in tau.frontier_sorted(k - 1) {
        let reach = tau.rounds[k - 1][&stop_id].clone();
        let departures = feed.departures_at(&stop_id);
        let first = departures
            .partition_point(|&idx| (feed.stop_time(idx).time_of_day() as f64) < reach.time);

        for &board_idx in &departures[first..] {
            let board = feed.stop_time(board_idx);
            let board_secs = board.time_of_day() as f64;
            if board_secs > reach.time + opts.max_waiting_time_secs {
                break;
            }
            let Some(trip) = feed.trip(&board.trip_id) else {
                continue;
            };
            if opts.exclude_routes.contains(&trip.route_id) {
                continue;
            }
            let Some(route) = feed.route(&trip.route_id) else {
                continue;
            };
            let multiplier = if route.route_type.is_rail() {
                opts.rail_multiplier
            } else {
                opts.bus_multiplier
            };
            // A negative multiplier disables the whole mode.
            if multiplier < 0.0 {
                continue;
            }
            let wait = board_secs - reach.time;

            let calls = feed.trip_calls(&board.trip_id);
            let downstream =
                calls.partition_point(|&idx| feed.stop_time(idx).stop_sequence <= board.stop_sequence);
            for &call_idx in &calls[downstream..] {
                let call = feed.stop_time(call_idx);
                let arrival = call.time_of_day() as f64;
                if arrival > last_valid {
                    break;
                }
                if opts.exclude_stops.contains(&call.stop_id) {
                    continue;
                }
                let travel = arrival - board_secs;
                tau.add_connection(
                    k,
                    &call.stop_id,
                    ReachInfo {
                        time: arrival,
                        cost: reach.cost + wait + multiplier * travel,
                        mode: ReachMode::Transit {
                            trip_id: board.trip_id.clone(),
                        },
                        prev_stop: Some(stop_id.clone()),
                        prev_k: Some(k - 1),
                    },
                );
            }
        }
    }
}

/// Walking round: copy round `from_k`'s frontier forward into `from_k + 1`,
/// then extend every non-walk frontier stop by its walking edges. Two walks
/// in a row are forbidden.
fn make_transfers(
    feed: &AugmentedFeed<'_>,
    tau: &mut Tau,
    from_k: usize,
    opts: &QueryOptions,
    last_valid: f64,
) {
    let to_k = from_k + 1;
    let frontier = tau.frontier_sorted(from_k);
    for stop_id in &frontier {
        let info = tau.rounds[from_k][stop_id].clone();
        tau.rounds[to_k].insert(stop_id.clone(), info);
        tau.frontiers[to_k].insert(stop_id.clone());
    }

    for stop_id in &frontier {
        let reach = tau.rounds[from_k][stop_id].clone();
        if matches!(reach.mode, ReachMode::Walk) {
            continue;
        }
        for transfer in feed.walking_transfers_from(stop_id) {
            if opts.exclude_stops.contains(&transfer.to_stop_id) {
                continue;
            }
            let secs = match transfer.cost {
                crate::model::WalkCost::Km(km) => {
                    if km > opts.max_walking_distance_km {
                        continue;
                    }
                    km * 3600.0 / opts.walking_speed_kph
                }
                crate::model::WalkCost::Secs(secs) => secs as f64,
            };
            let arrival = reach.time + secs;
            if arrival > last_valid {
                continue;
            }
            tau.add_connection(
                to_k,
                &transfer.to_stop_id,
                ReachInfo {
                    time: arrival,
                    cost: reach.cost + secs,
                    mode: ReachMode::Walk,
                    prev_stop: Some(stop_id.clone()),
                    prev_k: Some(from_k),
                },
            );
        }
    }
}

/// Number of transfers of the journey ending at `(stop_id, k)`: the count
/// of transit legs on its predecessor chain, minus the free first boarding.
pub fn num_transfers(tau: &Tau, stop_id: &str, k: usize) -> usize {
    let mut transit_legs = 0usize;
    let mut cursor = tau.reach(k, stop_id);
    while let Some(info) = cursor {
        if matches!(info.mode, ReachMode::Transit { .. }) {
            transit_legs += 1;
        }
        cursor = match (&info.prev_stop, info.prev_k) {
            (Some(prev), Some(prev_k)) => tau.reach(prev_k, prev),
            _ => None,
        };
    }
    transit_legs.saturating_sub(1)
}

/// The round whose entry for `dest` minimizes
/// `cost + num_transfers * transfer_penalty_secs`; `None` when the
/// destination was never reached. Ties go to the earliest round.
pub fn find_best_k(tau: &Tau, dest: &str, transfer_penalty_secs: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for k in 0..tau.rounds.len() {
        let Some(info) = tau.reach(k, dest) else {
            continue;
        };
        let score = info.cost + num_transfers(tau, dest, k) as f64 * transfer_penalty_secs;
        if best.is_none_or(|(_, best_score)| score < best_score) {
            best = Some((k, score));
        }
    }
    best.map(|(k, _)| k)
}
