// src/sampler/mod.rs
// =============================================================================
// Station sampling: from "which lines exist?" to "one station per line".
//
// Submodules:
// - types: LineId / StationId
// - site: addresses of the upstream pages
// - lines: LineSource, enumerates every line from the listing page
// - stations: StationResolver, finds a line's terminal station
// - queue: WorkQueue of lines still waiting for a station
// - results: ResultSet of stations found
// - pool: the workers that drain the queue into the result set
// =============================================================================

mod lines;
mod pool;
mod queue;
mod results;
mod site;
mod stations;
mod types;

pub use lines::LineSource;
pub use pool::{run_pool, PoolReport, PoolSettings};
pub use queue::WorkQueue;
pub use results::ResultSet;
pub use site::TransitSite;
pub use stations::StationResolver;
pub use types::{LineId, StationId};
