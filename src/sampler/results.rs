// src/sampler/results.rs
// =============================================================================
// Stations discovered during one cycle.
//
// Several lines often end at the same terminal, so the set collapses them.
// A BTreeSet keeps the ids sorted, which makes the written artifact stable
// from one cycle to the next.
// =============================================================================

use std::collections::BTreeSet;
use std::sync::Mutex;

use super::types::StationId;

#[derive(Debug, Default)]
pub struct ResultSet {
    stations: Mutex<BTreeSet<StationId>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a station. Returns false if it was already known.
    pub fn insert(&self, station: StationId) -> bool {
        self.stations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(station)
    }

    pub fn len(&self) -> usize {
        self.stations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of the stations found so far.
    pub fn snapshot(&self) -> Vec<StationId> {
        self.stations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .copied()
            .collect()
    }
}
