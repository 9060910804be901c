pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(test)]
mod testing;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{Settings, TomlConfig};

pub use adapters::{HttpRecordFetcher, LocalStorage};
pub use core::{etl::EtlEngine, pipeline::PointsPipeline};
pub use utils::error::{PointsError, Result};
