//! The `collect` command: boundary, grid, adaptive passes, persistence.
//!
//! A fatal error (boundary unavailable, or a region failure under the abort
//! policy) ends the command before anything is written.

use std::path::PathBuf;

use anyhow::Context;
use tilescout_core::{partition, AppConfig, ExtractionStrategy, GridSpec, Region};
use tilescout_scraper::{extractor_for, BatchOrchestrator, BatchSettings, ListingsClient};

use crate::output::{self, RunReport};

/// Per-run settings, after CLI flags have been layered over the config.
#[derive(Debug, Clone)]
pub(crate) struct CollectOptions {
    pub grid: GridSpec,
    pub refine: GridSpec,
    pub max_depth: u32,
    pub strategy: ExtractionStrategy,
    pub output_dir: PathBuf,
    /// Overrides the city boundary lookup.
    pub region: Option<Region>,
}

pub(crate) async fn run_collect(config: &AppConfig, options: &CollectOptions) -> anyhow::Result<()> {
    let client = ListingsClient::from_config(config).context("failed to build listings client")?;

    let bounds = match options.region {
        Some(region) => region,
        None => client.resolve_bounding_box(&config.boundary_url).await?,
    };
    let initial = partition(&bounds, options.grid)
        .with_context(|| format!("failed to partition {bounds} into {}", options.grid))?;

    tracing::info!(
        bounds = %bounds,
        grid = %options.grid,
        refine = %options.refine,
        max_depth = options.max_depth,
        strategy = %options.strategy,
        spacing_ms = client.min_request_spacing().as_millis(),
        "starting collection"
    );

    let extractor = extractor_for(options.strategy, client.listing_base_url());
    let orchestrator = BatchOrchestrator::new(
        &client,
        extractor.as_ref(),
        BatchSettings::from_config(config),
    );
    let result = orchestrator
        .run_adaptive(&initial, options.refine, options.max_depth)
        .await?;

    std::fs::create_dir_all(&options.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            options.output_dir.display()
        )
    })?;

    let mut files = Vec::with_capacity(result.passes.len());
    for (n, pass) in result.passes.iter().enumerate() {
        let name = output::pass_file_name(n);
        let path = options.output_dir.join(&name);
        output::write_records_file(&path, &pass.records)?;
        tracing::info!(path = %path.display(), records = pass.records.len(), "wrote pass records");
        files.push(name);
    }

    let report = RunReport::new(bounds, options, &result, files);
    let report_path = options.output_dir.join(output::REPORT_FILE_NAME);
    output::write_report_file(&report_path, &report)?;

    println!(
        "collected {} records ({} incomplete) over {} passes; {} unresolved regions; report at {}",
        result.total_records(),
        result.incomplete_records(),
        result.passes.len(),
        result.unresolved.len(),
        report_path.display()
    );

    Ok(())
}
