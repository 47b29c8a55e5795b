// src/sampler/site.rs
// =============================================================================
// The upstream transit website.
//
// Two kinds of pages matter:
// - the listing of all lines:  {base}/prikaz-svih-linija
// - one page per line:         {base}/line_details/{line}
//
// TransitSite only knows these addresses; what to pull out of each page is
// in lines.rs (LineSource) and stations.rs (StationResolver).
// =============================================================================

use crate::fetch::{Document, FetchError, HttpFetcher};

use super::types::LineId;

#[derive(Clone)]
pub struct TransitSite {
    fetcher: HttpFetcher,
    base_url: String,
}

impl TransitSite {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn listing_url(&self) -> String {
        format!("{}/prikaz-svih-linija", self.base_url)
    }

    pub fn line_url(&self, line: &LineId) -> String {
        format!("{}/line_details/{}", self.base_url, line)
    }

    pub(crate) async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        self.fetcher.fetch_document(url).await
    }
}
