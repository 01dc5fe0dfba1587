use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{AppConfig, ExtractionStrategy, RegionErrorPolicy};
use crate::grid::GridSpec;
use crate::ConfigError;

pub const DEFAULT_BOUNDARY_URL: &str =
    "https://opendata.vancouver.ca/api/explore/v2.1/catalog/datasets/city-boundary/records?limit=20";
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://www.redfin.ca/bc/vancouver";
pub const DEFAULT_LISTING_BASE_URL: &str = "https://www.redfin.com";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default, so an empty environment yields the
/// Vancouver two-pass setup: 6x6 initial grid, 2x2 refinement, one
/// refinement pass, one second between requests.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let non_empty = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        if raw.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "value is empty".to_string(),
            });
        }
        Ok(raw)
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_positive_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().parse::<u32>() {
            Ok(0) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            }),
            Ok(v) => Ok(v),
            Err(e) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        }
    };

    let parse_grid = |var: &str, default: &str| -> Result<GridSpec, ConfigError> {
        let raw = or_default(var, default);
        GridSpec::from_str(&raw).map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let log_level = or_default("TILESCOUT_LOG_LEVEL", "info");
    let boundary_url = non_empty("TILESCOUT_BOUNDARY_URL", DEFAULT_BOUNDARY_URL)?;
    let search_base_url = non_empty("TILESCOUT_SEARCH_BASE_URL", DEFAULT_SEARCH_BASE_URL)?;
    let listing_base_url = non_empty("TILESCOUT_LISTING_BASE_URL", DEFAULT_LISTING_BASE_URL)?;
    let user_agent = non_empty("TILESCOUT_USER_AGENT", DEFAULT_USER_AGENT)?;

    let request_timeout_secs = parse_u64("TILESCOUT_REQUEST_TIMEOUT_SECS", "30")?;
    let inter_request_delay_ms = parse_u64("TILESCOUT_INTER_REQUEST_DELAY_MS", "1000")?;
    let page_capacity = parse_positive_u32("TILESCOUT_PAGE_CAPACITY", "9")?;
    let batch_count = parse_positive_u32("TILESCOUT_BATCH_COUNT", "5")? as usize;

    let initial_grid = parse_grid("TILESCOUT_INITIAL_GRID", "6x6")?;
    let refine_grid = parse_grid("TILESCOUT_REFINE_GRID", "2x2")?;
    let max_depth = or_default("TILESCOUT_MAX_DEPTH", "1")
        .trim()
        .parse::<u32>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "TILESCOUT_MAX_DEPTH".to_string(),
            reason: e.to_string(),
        })?;

    let on_region_error = or_default("TILESCOUT_ON_REGION_ERROR", "skip")
        .parse::<RegionErrorPolicy>()
        .map_err(|reason| ConfigError::InvalidEnvVar {
            var: "TILESCOUT_ON_REGION_ERROR".to_string(),
            reason,
        })?;
    let strategy = or_default("TILESCOUT_STRATEGY", "cards")
        .parse::<ExtractionStrategy>()
        .map_err(|reason| ConfigError::InvalidEnvVar {
            var: "TILESCOUT_STRATEGY".to_string(),
            reason,
        })?;

    let output_dir = PathBuf::from(or_default("TILESCOUT_OUTPUT_DIR", "./data/raw_extraction"));

    Ok(AppConfig {
        log_level,
        boundary_url,
        search_base_url,
        listing_base_url,
        user_agent,
        request_timeout_secs,
        inter_request_delay_ms,
        page_capacity,
        batch_count,
        initial_grid,
        refine_grid,
        max_depth,
        on_region_error,
        strategy,
        output_dir,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
