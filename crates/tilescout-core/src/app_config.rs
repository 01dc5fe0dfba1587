use std::path::PathBuf;
use std::str::FromStr;

use crate::grid::GridSpec;

/// Which extractor turns a results page into [`crate::ListingRecord`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Scrape the rendered listing cards.
    Cards,
    /// Parse embedded `application/ld+json` metadata blocks.
    Metadata,
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionStrategy::Cards => write!(f, "cards"),
            ExtractionStrategy::Metadata => write!(f, "metadata"),
        }
    }
}

impl FromStr for ExtractionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cards" | "card" => Ok(ExtractionStrategy::Cards),
            "metadata" | "jsonld" => Ok(ExtractionStrategy::Metadata),
            other => Err(format!("unknown strategy \"{other}\" (expected cards or metadata)")),
        }
    }
}

/// What happens when a probe or page fetch fails for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionErrorPolicy {
    /// Log the failure, record it on the run, and move to the next region.
    Skip,
    /// Stop the whole run and return the error.
    Abort,
}

impl std::fmt::Display for RegionErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionErrorPolicy::Skip => write!(f, "skip"),
            RegionErrorPolicy::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for RegionErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(RegionErrorPolicy::Skip),
            "abort" => Ok(RegionErrorPolicy::Abort),
            other => Err(format!("unknown policy \"{other}\" (expected skip or abort)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub boundary_url: String,
    pub search_base_url: String,
    pub listing_base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Minimum spacing between consecutive outbound requests.
    pub inter_request_delay_ms: u64,
    /// Listings shown per results page.
    pub page_capacity: u32,
    /// Number of progress checkpoint groups per pass.
    pub batch_count: usize,
    pub initial_grid: GridSpec,
    pub refine_grid: GridSpec,
    /// Maximum number of refinement passes after the initial one.
    pub max_depth: u32,
    pub on_region_error: RegionErrorPolicy,
    pub strategy: ExtractionStrategy,
    pub output_dir: PathBuf,
}
