pub mod cache;
pub mod classifier;
pub mod crawler;
pub mod dataset;
pub mod etl;
pub mod export;
pub mod normalizer;
pub mod pipeline;

pub use crate::domain::ports::{ConfigProvider, Pipeline, RecordFetcher, Storage};
pub use crate::utils::error::Result;
