pub mod batch;
pub mod client;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod pagination;
mod rate_limit;

pub use batch::{split_batches, BatchRun, FailureStage, RegionFailure, ReviewItem};
pub use client::{ListingCountResult, ListingsClient, ViewportCounts};
pub use error::ScraperError;
pub use extract::{
    extractor_for, CardExtractor, DeferredBlock, ExtractionOutcome, MetadataExtractor,
    RecordExtractor,
};
pub use orchestrator::{AdaptiveRun, BatchOrchestrator, BatchSettings};
pub use pagination::pages_needed;
