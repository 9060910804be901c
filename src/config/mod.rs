#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::adapters::events_page::DEFAULT_EVENTS_PAGE_URL;
use crate::adapters::geocode::{DEFAULT_GEOCODING_DELAY_MS, DEFAULT_GEOCODING_ENDPOINT};
use crate::adapters::http::DEFAULT_API_ENDPOINT;
use crate::core::crawler::{DEFAULT_MISS_LIMIT, DEFAULT_RECENCY_MONTHS};
use crate::core::dataset::{DEFAULT_RISING_STAR_COUNT, DEFAULT_RISING_STAR_WINDOW_DAYS};
use crate::core::export::DEFAULT_CHUNK_SIZE;
use crate::core::normalizer::DEFAULT_DANCE_STYLE;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, Validate,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 1000;

/// 合併預設值、設定檔與命令列之後的最終設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub api_endpoint: String,
    pub request_timeout_secs: Option<u64>,
    pub events_page_url: String,
    pub geocoding_endpoint: String,
    pub geocoding_api_key: Option<String>,
    pub geocoding_delay_ms: u64,
    /// 快取檔所在目錄
    pub data_dir: String,
    pub cache_file: String,
    pub events_cache_file: String,
    pub location_cache_file: String,
    pub output_path: String,
    pub full_scan: bool,
    pub skip_fetch: bool,
    pub start_id: u64,
    pub miss_limit: u32,
    pub recency_months: u32,
    pub checkpoint_interval: u64,
    pub dance_style: String,
    pub rising_star_window_days: i64,
    pub rising_star_count: usize,
    pub chunk_size: u64,
    pub monitor: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            request_timeout_secs: None,
            events_page_url: DEFAULT_EVENTS_PAGE_URL.to_string(),
            geocoding_endpoint: DEFAULT_GEOCODING_ENDPOINT.to_string(),
            geocoding_api_key: None,
            geocoding_delay_ms: DEFAULT_GEOCODING_DELAY_MS,
            data_dir: ".".to_string(),
            cache_file: "raw_responses.json.zip".to_string(),
            events_cache_file: "raw_events.html.zip".to_string(),
            location_cache_file: "locations.json".to_string(),
            output_path: "./output".to_string(),
            full_scan: false,
            skip_fetch: false,
            start_id: 1,
            miss_limit: DEFAULT_MISS_LIMIT,
            recency_months: DEFAULT_RECENCY_MONTHS,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            dance_style: DEFAULT_DANCE_STYLE.to_string(),
            rising_star_window_days: DEFAULT_RISING_STAR_WINDOW_DAYS,
            rising_star_count: DEFAULT_RISING_STAR_COUNT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            monitor: false,
        }
    }
}

impl ConfigProvider for Settings {
    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn request_timeout_secs(&self) -> Option<u64> {
        self.request_timeout_secs
    }

    fn events_page_url(&self) -> &str {
        &self.events_page_url
    }

    fn cache_file(&self) -> &str {
        &self.cache_file
    }

    fn events_cache_file(&self) -> &str {
        &self.events_cache_file
    }

    fn location_cache_file(&self) -> &str {
        &self.location_cache_file
    }

    fn geocoding_endpoint(&self) -> &str {
        &self.geocoding_endpoint
    }

    fn geocoding_api_key(&self) -> Option<&str> {
        self.geocoding_api_key.as_deref().filter(|k| !k.is_empty())
    }

    fn geocoding_delay_ms(&self) -> u64 {
        self.geocoding_delay_ms
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn full_scan(&self) -> bool {
        self.full_scan
    }

    fn skip_fetch(&self) -> bool {
        self.skip_fetch
    }

    fn start_id(&self) -> u64 {
        self.start_id
    }

    fn miss_limit(&self) -> u32 {
        self.miss_limit
    }

    fn recency_months(&self) -> u32 {
        self.recency_months
    }

    fn checkpoint_interval(&self) -> u64 {
        self.checkpoint_interval
    }

    fn dance_style(&self) -> &str {
        &self.dance_style
    }

    fn rising_star_window_days(&self) -> i64 {
        self.rising_star_window_days
    }

    fn rising_star_count(&self) -> usize {
        self.rising_star_count
    }

    fn chunk_size(&self) -> u64 {
        self.chunk_size
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("api_endpoint", &self.api_endpoint)?;
        validate_url("events_page_url", &self.events_page_url)?;
        validate_url("geocoding_endpoint", &self.geocoding_endpoint)?;
        validate_path("data_dir", &self.data_dir)?;
        validate_path("output_path", &self.output_path)?;
        validate_non_empty_string("cache_file", &self.cache_file)?;
        validate_non_empty_string("events_cache_file", &self.events_cache_file)?;
        validate_non_empty_string("location_cache_file", &self.location_cache_file)?;
        validate_non_empty_string("dance_style", &self.dance_style)?;
        validate_positive_number("start_id", self.start_id, 1)?;
        validate_positive_number("miss_limit", u64::from(self.miss_limit), 1)?;
        validate_positive_number("recency_months", u64::from(self.recency_months), 1)?;
        validate_positive_number("chunk_size", self.chunk_size, 1)?;
        validate_positive_number("rising_star_count", self.rising_star_count as u64, 1)?;
        validate_range("rising_star_window_days", self.rising_star_window_days, 1, 3650)?;
        if let Some(timeout) = self.request_timeout_secs {
            validate_positive_number("request_timeout_secs", timeout, 1)?;
        }
        Ok(())
    }
}
