//! The adaptive probe / split / paginate loop.
//!
//! Each region moves through:
//!
//! ```text
//! Pending -> Probed -> NoListings                      (done)
//!                   -> Oversized                       (done for this pass)
//!                   -> Clean -> Paginating -> Done
//! ```
//!
//! A pass never recurses. [`BatchOrchestrator::run_adaptive`] chains passes,
//! re-partitioning the previous pass's oversized regions, up to a depth cap.

use serde::Serialize;
use tilescout_core::{partition, AppConfig, GridSpec, Region, RegionErrorPolicy};

use crate::batch::{split_batches, BatchRun, FailureStage, RegionFailure};
use crate::client::{ListingCountResult, ListingsClient};
use crate::error::ScraperError;
use crate::extract::RecordExtractor;
use crate::pagination::{pages_needed, DEFAULT_PAGE_CAPACITY};

/// Tunables for one orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Number of progress checkpoints per pass. Has no effect on results.
    pub batch_count: usize,
    pub page_capacity: u32,
    pub on_region_error: RegionErrorPolicy,
}

impl BatchSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            batch_count: config.batch_count,
            page_capacity: config.page_capacity,
            on_region_error: config.on_region_error,
        }
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_count: 5,
            page_capacity: DEFAULT_PAGE_CAPACITY,
            on_region_error: RegionErrorPolicy::Skip,
        }
    }
}

/// Result of a multi-pass adaptive run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdaptiveRun {
    /// One entry per pass; pass 0 covers the initial regions.
    pub passes: Vec<BatchRun>,
    /// Oversized regions still truncated when the depth cap was reached, or
    /// too small to split further.
    pub unresolved: Vec<Region>,
}

impl AdaptiveRun {
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.passes.iter().map(|p| p.records.len()).sum()
    }

    /// Records with at least one missing field, across all passes.
    #[must_use]
    pub fn incomplete_records(&self) -> usize {
        self.passes.iter().map(BatchRun::incomplete_count).sum()
    }
}

/// Drives probing, pagination, and extraction over a set of regions, one
/// request at a time.
pub struct BatchOrchestrator<'a> {
    client: &'a ListingsClient,
    extractor: &'a dyn RecordExtractor,
    settings: BatchSettings,
}

impl<'a> BatchOrchestrator<'a> {
    #[must_use]
    pub fn new(
        client: &'a ListingsClient,
        extractor: &'a dyn RecordExtractor,
        settings: BatchSettings,
    ) -> Self {
        Self {
            client,
            extractor,
            settings,
        }
    }

    /// Runs one pass over `regions`.
    ///
    /// Oversized regions are collected in [`BatchRun::oversized`] and not
    /// split here.
    ///
    /// # Errors
    ///
    /// Under [`RegionErrorPolicy::Abort`], the first probe or page failure.
    /// Under [`RegionErrorPolicy::Skip`], only errors that are not scoped to
    /// a single region.
    pub async fn run_pass(&self, regions: &[Region]) -> Result<BatchRun, ScraperError> {
        let mut run = BatchRun::default();
        let batches = split_batches(regions, self.settings.batch_count);
        let batch_total = batches.len();

        for (n, batch) in batches.into_iter().enumerate() {
            for region in batch {
                self.process_region(region, &mut run).await?;
            }
            tracing::info!(
                batch = n + 1,
                of = batch_total,
                records = run.records.len(),
                oversized = run.oversized.len(),
                failed = run.failed.len(),
                "batch complete"
            );
        }

        Ok(run)
    }

    /// Runs `initial`, then keeps re-partitioning oversized regions with
    /// `refine` and running the result, for at most `max_depth` extra passes.
    ///
    /// # Errors
    ///
    /// Propagates any error [`BatchOrchestrator::run_pass`] returns.
    pub async fn run_adaptive(
        &self,
        initial: &[Region],
        refine: GridSpec,
        max_depth: u32,
    ) -> Result<AdaptiveRun, ScraperError> {
        let mut result = AdaptiveRun::default();
        let mut working = initial.to_vec();
        let mut depth = 0;

        loop {
            tracing::info!(pass = depth, regions = working.len(), "starting pass");
            let run = self.run_pass(&working).await?;
            let oversized = run.oversized.clone();
            tracing::info!(
                pass = depth,
                records = run.records.len(),
                oversized = oversized.len(),
                empty = run.empty.len(),
                pages = run.pages_fetched,
                "pass complete"
            );
            result.passes.push(run);

            if oversized.is_empty() {
                break;
            }
            if depth >= max_depth {
                tracing::warn!(
                    count = oversized.len(),
                    max_depth,
                    "oversized regions remain at depth cap"
                );
                result.unresolved.extend(oversized);
                break;
            }

            working.clear();
            for region in &oversized {
                match partition(region, refine) {
                    Ok(cells) => working.extend(cells),
                    Err(e) => {
                        tracing::warn!(%region, error = %e, "cannot split oversized region further");
                        result.unresolved.push(*region);
                    }
                }
            }
            if working.is_empty() {
                break;
            }
            depth += 1;
        }

        Ok(result)
    }

    async fn process_region(&self, region: &Region, run: &mut BatchRun) -> Result<(), ScraperError> {
        run.regions_probed += 1;

        let counts = match self.client.probe(region).await {
            Ok(ListingCountResult::NoListings) => {
                tracing::info!(%region, "no listings");
                run.empty.push(*region);
                return Ok(());
            }
            Ok(ListingCountResult::Counts(counts)) => counts,
            Err(e) => return self.recover(run, region, FailureStage::Probe, e),
        };

        if !counts.is_clean() {
            tracing::info!(
                %region,
                visible = counts.visible,
                total = counts.total,
                "oversized region queued for re-split"
            );
            run.oversized.push(*region);
            return Ok(());
        }

        let pages = pages_needed(counts.visible, self.settings.page_capacity);
        tracing::info!(%region, visible = counts.visible, pages, "paginating clean region");

        for page in 1..=pages {
            let outcome = match self.client.fetch_page(&counts.viewport_url, page).await {
                Ok(document) => self.extractor.extract(&document),
                Err(e) => return self.recover(run, region, FailureStage::Page(page), e),
            };
            run.absorb_page(region, page, outcome);
        }

        Ok(())
    }

    /// Applies the region error policy to a failed probe or page fetch.
    fn recover(
        &self,
        run: &mut BatchRun,
        region: &Region,
        stage: FailureStage,
        error: ScraperError,
    ) -> Result<(), ScraperError> {
        if self.settings.on_region_error == RegionErrorPolicy::Abort || !error.is_region_scoped() {
            return Err(error);
        }

        tracing::warn!(%region, ?stage, error = %error, "skipping region after failure");
        run.failed.push(RegionFailure {
            region: *region,
            stage,
            message: error.to_string(),
        });
        Ok(())
    }
}
