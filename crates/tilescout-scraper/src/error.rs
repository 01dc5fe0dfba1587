use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("could not read listing summary from {url}: {reason}")]
    SummaryParse { url: String, reason: String },

    #[error("city boundary unavailable: {reason}")]
    BoundaryUnavailable { reason: String },

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ScraperError {
    /// Returns `true` for failures scoped to a single region's probe or page
    /// fetch. Under the `skip` policy these end that region's work but let
    /// the run continue.
    #[must_use]
    pub fn is_region_scoped(&self) -> bool {
        matches!(
            self,
            ScraperError::Http(_)
                | ScraperError::UnexpectedStatus { .. }
                | ScraperError::SummaryParse { .. }
        )
    }
}
