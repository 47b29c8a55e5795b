// src/sampler/lines.rs
// =============================================================================
// Line enumeration: one fetch of the listing page, every line token out.
//
// The listing is a table where each line is a row like
//   <tr class="display_lines_tr_forms" id="line_3A"> ... </tr>
// The same line can show up in several rows, so tokens are deduplicated
// (first appearance wins the position).
//
// Enumeration is all-or-nothing: a page without rows is an error, not an
// empty result. Whoever calls this retries the whole thing.
// =============================================================================

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::fetch::{Document, FetchError};

use super::site::TransitSite;
use super::types::{id_token, LineId};

/// Structural marker of one line row on the listing page.
pub const LINE_ROW_SELECTOR: &str = ".display_lines_tr_forms";

/// Produces the full set of line identifiers.
#[async_trait]
pub trait LineSource: Send + Sync {
    /// Returns every line exactly once, or fails as a unit.
    async fn enumerate_lines(&self) -> Result<Vec<LineId>, FetchError>;
}

/// Extracts unique line tokens from a listing page.
pub fn parse_line_ids(document: &Document) -> Result<Vec<LineId>, FetchError> {
    let row_ids = document.element_ids(LINE_ROW_SELECTOR)?;
    if row_ids.is_empty() {
        return Err(FetchError::parse(format!(
            "no '{}' rows on {}",
            LINE_ROW_SELECTOR,
            document.url()
        )));
    }

    let mut seen = HashSet::new();
    let lines: Vec<LineId> = row_ids
        .iter()
        .flatten()
        .filter_map(|id| id_token(id).and_then(LineId::new))
        .filter(|line| seen.insert(line.clone()))
        .collect();

    if lines.is_empty() {
        return Err(FetchError::parse(format!(
            "{} line rows on {} but none carries a line id",
            row_ids.len(),
            document.url()
        )));
    }

    Ok(lines)
}

#[async_trait]
impl LineSource for TransitSite {
    async fn enumerate_lines(&self) -> Result<Vec<LineId>, FetchError> {
        let url = self.listing_url();
        info!("Fetching HTML for all lines {}", url);
        let document = self.fetch(&url).await?;

        debug!("Querying line numbers in listing");
        let lines = parse_line_ids(&document)?;

        let names: Vec<&str> = lines.iter().map(LineId::as_str).collect();
        info!("Found {} lines: {}", lines.len(), names.join(", "));
        Ok(lines)
    }
}
