//! Per-pass accumulators and the batch split used for progress checkpoints.

use std::collections::BTreeMap;

use serde::Serialize;
use tilescout_core::{ListingRecord, RecordKind, Region};

use crate::extract::{DeferredBlock, ExtractionOutcome};

/// Splits `items` into `batch_count` order-preserving groups whose sizes
/// differ by at most one; the first `len % batch_count` groups get the
/// extra element.
///
/// Returns fewer groups than requested when there are fewer items than
/// batches, and never returns an empty group. A `batch_count` of zero is
/// treated as one.
#[must_use]
pub fn split_batches<T>(items: &[T], batch_count: usize) -> Vec<&[T]> {
    let batch_count = batch_count.max(1);
    let base = items.len() / batch_count;
    let extra = items.len() % batch_count;

    let mut batches = Vec::with_capacity(batch_count.min(items.len()));
    let mut start = 0;
    for i in 0..batch_count {
        let len = base + usize::from(i < extra);
        if len == 0 {
            break;
        }
        batches.push(&items[start..start + len]);
        start += len;
    }
    batches
}

/// Where a region's work stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "page", rename_all = "snake_case")]
pub enum FailureStage {
    Probe,
    Page(u32),
}

/// A region whose probe or page fetch failed under the skip policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionFailure {
    pub region: Region,
    #[serde(flatten)]
    pub stage: FailureStage,
    pub message: String,
}

/// A deferred metadata block, tagged with where it was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewItem {
    pub region: Region,
    pub page: u32,
    #[serde(flatten)]
    pub block: DeferredBlock,
}

/// Everything one extraction pass produced.
///
/// Created empty at the start of a pass and handed back to the caller at the
/// end; the orchestrator is its only writer in between.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchRun {
    /// Records in extraction order.
    pub records: Vec<ListingRecord>,
    /// Regions whose visible count was below their total; they need a finer
    /// grid.
    pub oversized: Vec<Region>,
    /// Regions the site reported no listings for.
    pub empty: Vec<Region>,
    /// Region (canonical string) to page number to indices of incomplete
    /// records on that page.
    pub incomplete: BTreeMap<String, BTreeMap<u32, Vec<usize>>>,
    pub needs_review: Vec<ReviewItem>,
    pub failed: Vec<RegionFailure>,
    pub regions_probed: usize,
    pub pages_fetched: usize,
}

impl BatchRun {
    /// Merges one page's extraction outcome into the run.
    pub fn absorb_page(&mut self, region: &Region, page: u32, outcome: ExtractionOutcome) {
        self.pages_fetched += 1;

        if !outcome.incomplete.is_empty() {
            self.incomplete
                .entry(region.to_string())
                .or_default()
                .insert(page, outcome.incomplete);
        }

        self.needs_review
            .extend(outcome.deferred.into_iter().map(|block| ReviewItem {
                region: *region,
                page,
                block,
            }));
        self.records.extend(outcome.records);
    }

    /// Records of one kind, in extraction order.
    pub fn records_of(&self, kind: RecordKind) -> impl Iterator<Item = &ListingRecord> + '_ {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    /// Count of incomplete records across all regions and pages.
    #[must_use]
    pub fn incomplete_count(&self) -> usize {
        self.incomplete
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }
}
