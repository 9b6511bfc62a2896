mod itinerary;
mod online;
mod raptor;

pub use itinerary::{trace_route, Route, Step, StepMode};
pub use online::{AugmentedFeed, OnlineRouter, PresetFeed};
pub use raptor::{find_best_k, num_transfers, run_raptor, ReachInfo, ReachMap, ReachMode, Tau};
