pub mod app_config;
pub mod config;
pub mod grid;
pub mod listing;
pub mod region;

pub use app_config::{AppConfig, ExtractionStrategy, RegionErrorPolicy};
pub use config::{load_app_config, load_app_config_from_env};
pub use grid::{partition, GridError, GridSpec};
pub use listing::{ListingField, ListingRecord, RecordKind};
pub use region::{Region, RegionError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
