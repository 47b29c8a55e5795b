// src/sink/file.rs
// =============================================================================
// Local JSON file artifact, replaced atomically on every write.
// =============================================================================

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{ArtifactSink, SinkError};
use crate::sampler::StationId;

/// Writes the station list as pretty JSON to a single file.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a sibling temp file, then renames it over the target.
    /// Readers see either the old artifact or the new one, never a mix.
    async fn write_atomic(&self, bytes: &[u8]) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_error(parent))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(io_error(&tmp))?;
        file.write_all(bytes).await.map_err(io_error(&tmp))?;
        file.flush().await.map_err(io_error(&tmp))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(io_error(&self.path))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError {
    let path = path.to_path_buf();
    move |source| SinkError::Io { path, source }
}

#[async_trait]
impl ArtifactSink for JsonFileSink {
    async fn persist(&self, stations: &[StationId]) -> Result<(), SinkError> {
        let bytes = serde_json::to_vec_pretty(stations)?;
        self.write_atomic(&bytes).await?;
        debug!("Wrote {} stations to {}", stations.len(), self.path().display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path().display().to_string()
    }
}
