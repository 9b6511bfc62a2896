// Re-export key components
pub use crate::loading::{
    LoadConfig, OptionCeilings, QueryOptions, QueryOptionsOverride, create_router,
    index_feed, parse_clock_time, read_locations,
};
pub use crate::model::{Feed, IndexedFeed, Location, Stop, StopTime};
pub use crate::routing::{OnlineRouter, Route, Step, StepMode, Tau, find_best_k, run_raptor};
pub use crate::spatial::StopIndex;
pub use crate::water::WaterFilter;

pub use crate::Error;
pub use crate::Secs;
