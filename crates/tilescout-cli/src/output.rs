//! Persistence of run results: one CSV of records per pass and a JSON run
//! report carrying everything that is not a record.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tilescout_core::{ListingRecord, Region};
use tilescout_scraper::{AdaptiveRun, BatchRun, RegionFailure, ReviewItem};

use crate::collect::CollectOptions;

pub(crate) const REPORT_FILE_NAME: &str = "run_report.json";

/// CSV column order; matches the serialized field order of [`ListingRecord`].
const RECORD_COLUMNS: [&str; 10] = [
    "kind",
    "address",
    "postal_code",
    "price",
    "beds",
    "baths",
    "square_footage",
    "latitude",
    "longitude",
    "url",
];

/// File name for pass `n` (0-based), e.g. `pass_1.csv` for the first pass.
pub(crate) fn pass_file_name(n: usize) -> String {
    format!("pass_{}.csv", n + 1)
}

/// Writes records as CSV with a header row, even when there are no records.
pub(crate) fn write_records<W: Write>(writer: W, records: &[ListingRecord]) -> anyhow::Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(RECORD_COLUMNS)?;
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

pub(crate) fn write_records_file(path: &Path, records: &[ListingRecord]) -> anyhow::Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_records(BufWriter::new(file), records)
        .with_context(|| format!("failed to write records to {}", path.display()))
}

/// Per-pass diagnostics for the run report.
#[derive(Debug, Serialize)]
pub(crate) struct PassReport<'a> {
    pub pass: usize,
    pub file: String,
    pub records: usize,
    pub incomplete_records: usize,
    pub regions_probed: usize,
    pub pages_fetched: usize,
    pub oversized: &'a [Region],
    pub empty: &'a [Region],
    pub failed: &'a [RegionFailure],
    pub incomplete: &'a BTreeMap<String, BTreeMap<u32, Vec<usize>>>,
    pub needs_review: &'a [ReviewItem],
}

impl<'a> PassReport<'a> {
    fn new(pass: usize, file: String, run: &'a BatchRun) -> Self {
        Self {
            pass,
            file,
            records: run.records.len(),
            incomplete_records: run.incomplete_count(),
            regions_probed: run.regions_probed,
            pages_fetched: run.pages_fetched,
            oversized: &run.oversized,
            empty: &run.empty,
            failed: &run.failed,
            incomplete: &run.incomplete,
            needs_review: &run.needs_review,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RunReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub bounds: Region,
    pub initial_grid: String,
    pub refine_grid: String,
    pub max_depth: u32,
    pub strategy: String,
    pub total_records: usize,
    pub incomplete_records: usize,
    pub passes: Vec<PassReport<'a>>,
    pub unresolved: &'a [Region],
}

impl<'a> RunReport<'a> {
    pub(crate) fn new(
        bounds: Region,
        options: &CollectOptions,
        result: &'a AdaptiveRun,
        files: Vec<String>,
    ) -> Self {
        let passes = result
            .passes
            .iter()
            .zip(files)
            .enumerate()
            .map(|(n, (run, file))| PassReport::new(n + 1, file, run))
            .collect();

        Self {
            generated_at: Utc::now(),
            bounds,
            initial_grid: options.grid.to_string(),
            refine_grid: options.refine.to_string(),
            max_depth: options.max_depth,
            strategy: options.strategy.to_string(),
            total_records: result.total_records(),
            incomplete_records: result.incomplete_records(),
            passes,
            unresolved: &result.unresolved,
        }
    }
}

pub(crate) fn write_report_file(path: &Path, report: &RunReport<'_>) -> anyhow::Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    writer.flush()?;
    Ok(())
}
