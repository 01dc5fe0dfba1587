mod collect;
mod output;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tilescout_core::{partition, ExtractionStrategy, GridSpec, Region};
use tilescout_scraper::{ListingCountResult, ListingsClient};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tilescout")]
#[command(about = "Collect real-estate listings by tiling a city into viewport searches")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve the city boundary, tile it, and scrape every clean region
    Collect {
        /// Initial grid as `{lon}x{lat}` (default: TILESCOUT_INITIAL_GRID)
        #[arg(long)]
        grid: Option<GridSpec>,

        /// Grid used to re-split oversized regions (default: TILESCOUT_REFINE_GRID)
        #[arg(long)]
        refine: Option<GridSpec>,

        /// Maximum refinement passes after the first (default: TILESCOUT_MAX_DEPTH)
        #[arg(long)]
        max_depth: Option<u32>,

        /// `cards` or `metadata` (default: TILESCOUT_STRATEGY)
        #[arg(long)]
        strategy: Option<ExtractionStrategy>,

        /// Directory for pass CSVs and the run report (default: TILESCOUT_OUTPUT_DIR)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Tile this `minLat:maxLat:minLon:maxLon` box instead of the city boundary
        #[arg(long)]
        region: Option<Region>,
    },
    /// Report visible and total listing counts for one region
    Probe {
        #[arg(long)]
        region: Region,
    },
    /// Print the sub-regions a grid split produces (no network)
    Grid {
        #[arg(long)]
        region: Region,

        #[arg(long, default_value_t = 2)]
        lon: u32,

        #[arg(long, default_value_t = 2)]
        lat: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = tilescout_core::load_app_config().context("failed to load configuration")?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Collect {
            grid,
            refine,
            max_depth,
            strategy,
            output,
            region,
        } => {
            let options = collect::CollectOptions {
                grid: grid.unwrap_or(config.initial_grid),
                refine: refine.unwrap_or(config.refine_grid),
                max_depth: max_depth.unwrap_or(config.max_depth),
                strategy: strategy.unwrap_or(config.strategy),
                output_dir: output.unwrap_or_else(|| config.output_dir.clone()),
                region,
            };
            collect::run_collect(&config, &options).await?;
        }
        Commands::Probe { region } => {
            let client = ListingsClient::from_config(&config)?;
            match client.probe(&region).await? {
                ListingCountResult::NoListings => println!("{region}: no listings"),
                ListingCountResult::Counts(counts) => {
                    let status = if counts.is_clean() { "clean" } else { "oversized" };
                    println!(
                        "{region}: {} of {} visible ({status})\n{}",
                        counts.visible, counts.total, counts.viewport_url
                    );
                }
            }
        }
        Commands::Grid { region, lon, lat } => {
            let grid = GridSpec::new(lon, lat)?;
            for cell in partition(&region, grid)? {
                println!("{cell}");
            }
        }
    }

    Ok(())
}
