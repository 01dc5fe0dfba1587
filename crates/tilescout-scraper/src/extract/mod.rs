//! Turning one fetched results page into listing records.
//!
//! Two interchangeable strategies exist:
//!
//! 1. [`CardExtractor`]: scrape the rendered listing cards, one record per
//!    card, with each field extracted independently.
//! 2. [`MetadataExtractor`]: parse the page's embedded
//!    `application/ld+json` blocks, classifying each block before reading it.
//!
//! Neither strategy fails a page. A missing card field becomes `None` plus an
//! entry in [`ExtractionOutcome::incomplete`]; a metadata block of the wrong
//! shape becomes a [`DeferredBlock`] for manual review.

mod cards;
mod metadata;

use reqwest::Url;
use scraper::Html;
use serde::Serialize;
use tilescout_core::{ExtractionStrategy, ListingRecord};

pub use cards::CardExtractor;
pub use metadata::MetadataExtractor;

/// A raw metadata block that could not be read as a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeferredBlock {
    /// Position of the block among the page's metadata scripts.
    pub index: usize,
    pub reason: String,
    /// The block as parsed, or the script text as a JSON string when it was
    /// not valid JSON.
    pub raw: serde_json::Value,
}

/// Everything extracted from one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutcome {
    pub records: Vec<ListingRecord>,
    /// Indices into `records` of records with at least one missing field.
    /// Each index appears at most once.
    pub incomplete: Vec<usize>,
    pub deferred: Vec<DeferredBlock>,
}

/// A strategy for reading listing records out of a results page.
pub trait RecordExtractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Extracts every listing the strategy recognises on `page`.
    fn extract(&self, page: &Html) -> ExtractionOutcome;
}

/// Builds the extractor for `strategy`. Relative card links are resolved
/// against `listing_base_url`.
#[must_use]
pub fn extractor_for(
    strategy: ExtractionStrategy,
    listing_base_url: &Url,
) -> Box<dyn RecordExtractor> {
    match strategy {
        ExtractionStrategy::Cards => Box::new(CardExtractor::new(listing_base_url.clone())),
        ExtractionStrategy::Metadata => Box::new(MetadataExtractor::new()),
    }
}
