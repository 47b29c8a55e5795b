// src/schedule/mod.rs
// =============================================================================
// Running the sampler on a timer, forever.
//
// - retry: fixed-delay retry helper with an optional ceiling
// - cycle: the Scheduler (one cycle = enumerate, drain, persist) and the
//   supervisor loop around it
// =============================================================================

mod cycle;
mod retry;

pub use cycle::{CycleSettings, Scheduler};
pub use retry::RetryPolicy;
