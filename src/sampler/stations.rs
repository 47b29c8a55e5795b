// src/sampler/stations.rs
// =============================================================================
// Station resolution: one fetch per line, one terminal station out.
//
// A line's detail page lists its stops in order as links like
//   <a class="select_station" id="station_101">...</a>
// The last one is the terminal stop, and that is the station we sample for
// the line.
//
// Outcomes:
// - Ok(StationId): found it
// - NotFound: the page has no (usable) station links
// - Parse: the link id is there but is not a positive number
// - Transport / Status: from the fetch itself
// =============================================================================

use async_trait::async_trait;
use tracing::{debug, info};

use crate::fetch::{Document, FetchError};

use super::site::TransitSite;
use super::types::{id_token, LineId, StationId};

/// Station links that close their list; the last match is the terminal.
pub const STATION_SELECTOR: &str = ".select_station:last-child";

/// Resolves one representative station per line.
#[async_trait]
pub trait StationResolver: Send + Sync {
    async fn resolve_station(&self, line: &LineId) -> Result<StationId, FetchError>;
}

/// Picks the terminal station out of a line detail page.
pub fn parse_terminal_station(document: &Document, line: &LineId) -> Result<StationId, FetchError> {
    let last_id = document.element_ids(STATION_SELECTOR)?.pop().flatten();

    let Some(token) = last_id.as_deref().and_then(id_token) else {
        return Err(FetchError::NotFound(line.clone()));
    };

    StationId::parse(token).ok_or_else(|| {
        FetchError::parse(format!(
            "station id '{}' for line {} is not a positive number",
            token, line
        ))
    })
}

#[async_trait]
impl StationResolver for TransitSite {
    async fn resolve_station(&self, line: &LineId) -> Result<StationId, FetchError> {
        debug!("Fetching HTML for line {}", line);
        let document = self.fetch(&self.line_url(line)).await?;

        match parse_terminal_station(&document, line) {
            Ok(station) => {
                info!("Found station {} for line {} ✅", station, line);
                Ok(station)
            }
            Err(e) => {
                info!("No station found for line {} ❌", line);
                Err(e)
            }
        }
    }
}
