// src/sink/mod.rs
// =============================================================================
// Where a finished cycle's stations end up.
//
// The artifact is a plain JSON array of station numbers, e.g.
//
//   [
//     101,
//     202
//   ]
//
// Each cycle overwrites the previous artifact in full.
// =============================================================================

mod file;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::sampler::StationId;

pub use file::JsonFileSink;

/// Failure to persist the artifact.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Filesystem operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination for the sampled station list.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Replaces the stored artifact with `stations`.
    async fn persist(&self, stations: &[StationId]) -> Result<(), SinkError>;

    /// Human-readable location, for log lines.
    fn describe(&self) -> String;
}
