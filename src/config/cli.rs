use crate::config::{Settings, TomlConfig};
use crate::utils::error::Result;
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// 命令列參數。每個旗標都可以用環境變數設定，且優先於設定檔
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "points-etl")]
#[command(about = "Harvests competition points records and builds the dancer dataset")]
pub struct CliConfig {
    /// TOML 設定檔
    #[arg(long, env = "POINTS_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub api_endpoint: Option<String>,

    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    #[arg(long)]
    pub events_page_url: Option<String>,

    #[arg(long, env = "OPEN_WEATHER_MAP_API_KEY", hide_env_values = true)]
    pub geocoding_api_key: Option<String>,

    #[arg(long, help = "Directory holding the response, events and location caches")]
    pub data_dir: Option<String>,

    #[arg(long)]
    pub output_path: Option<String>,

    // 環境變數只要存在就開啟，值為空、0、false、no、off 時視為關閉
    #[arg(
        long,
        env = "FULLDANCERCHECK",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new(),
        help = "Scan every id instead of refreshing recent dancers"
    )]
    pub full_scan: bool,

    #[arg(
        long,
        env = "SKIPFETCH",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new(),
        help = "Build from the caches without any network access"
    )]
    pub skip_fetch: bool,

    #[arg(long)]
    pub start_id: Option<u64>,

    #[arg(long)]
    pub miss_limit: Option<u32>,

    #[arg(long)]
    pub recency_months: Option<u32>,

    #[arg(long)]
    pub checkpoint_interval: Option<u64>,

    #[arg(long)]
    pub dance_style: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[arg(long, help = "Log CPU and memory usage after each phase")]
    pub monitor: bool,
}

impl CliConfig {
    /// 預設值 → 設定檔 → 命令列，依序覆蓋
    pub fn resolve(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => {
                tracing::info!("📄 Loading configuration from {}", path.display());
                TomlConfig::from_file(path)?.into_settings()
            }
            None => Settings::default(),
        };
        self.apply_to(&mut settings);
        Ok(settings)
    }

    fn apply_to(&self, settings: &mut Settings) {
        if let Some(v) = &self.api_endpoint {
            settings.api_endpoint = v.clone();
        }
        if self.request_timeout_secs.is_some() {
            settings.request_timeout_secs = self.request_timeout_secs;
        }
        if let Some(v) = &self.events_page_url {
            settings.events_page_url = v.clone();
        }
        if self.geocoding_api_key.is_some() {
            settings.geocoding_api_key = self.geocoding_api_key.clone();
        }
        if let Some(v) = &self.data_dir {
            settings.data_dir = v.clone();
        }
        if let Some(v) = &self.output_path {
            settings.output_path = v.clone();
        }
        if let Some(v) = self.start_id {
            settings.start_id = v;
        }
        if let Some(v) = self.miss_limit {
            settings.miss_limit = v;
        }
        if let Some(v) = self.recency_months {
            settings.recency_months = v;
        }
        if let Some(v) = self.checkpoint_interval {
            settings.checkpoint_interval = v;
        }
        if let Some(v) = &self.dance_style {
            settings.dance_style = v.clone();
        }
        // 旗標只能開啟，不會關掉設定檔裡已開啟的選項
        settings.full_scan |= self.full_scan;
        settings.skip_fetch |= self.skip_fetch;
        settings.monitor |= self.monitor;
    }
}
