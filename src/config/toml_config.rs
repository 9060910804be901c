use crate::config::Settings;
use crate::utils::error::{PointsError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

/// `points.toml`。所有區段與欄位皆可省略，省略時沿用預設值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    pub api_endpoint: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub events_page_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeocodingConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub data_dir: Option<String>,
    pub cache_file: Option<String>,
    pub events_cache_file: Option<String>,
    pub location_cache_file: Option<String>,
    pub checkpoint_interval: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub full_scan: Option<bool>,
    pub skip_fetch: Option<bool>,
    pub start_id: Option<u64>,
    pub miss_limit: Option<u32>,
    pub recency_months: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub dance_style: Option<String>,
    pub rising_star_window_days: Option<i64>,
    pub rising_star_count: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: Option<String>,
    pub chunk_size: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: Option<bool>,
}

fn set<T>(target: &mut T, value: &Option<T>)
where
    T: Clone,
{
    if let Some(value) = value {
        *target = value.clone();
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| PointsError::ConfigError {
            message: format!("cannot read '{}': {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed)?)
    }

    /// 替換環境變數 (例如 ${OPEN_WEATHER_MAP_API_KEY})，未設定的變數保留原字串
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 把檔案中有寫的欄位覆蓋到 `settings`
    pub fn apply_to(&self, settings: &mut Settings) {
        let source = &self.source;
        set(&mut settings.api_endpoint, &source.api_endpoint);
        if source.request_timeout_secs.is_some() {
            settings.request_timeout_secs = source.request_timeout_secs;
        }
        set(&mut settings.events_page_url, &source.events_page_url);

        let geocoding = &self.geocoding;
        set(&mut settings.geocoding_endpoint, &geocoding.endpoint);
        if geocoding.api_key.is_some() {
            settings.geocoding_api_key = geocoding.api_key.clone();
        }
        set(&mut settings.geocoding_delay_ms, &geocoding.delay_ms);

        let cache = &self.cache;
        set(&mut settings.data_dir, &cache.data_dir);
        set(&mut settings.cache_file, &cache.cache_file);
        set(&mut settings.events_cache_file, &cache.events_cache_file);
        set(&mut settings.location_cache_file, &cache.location_cache_file);
        set(&mut settings.checkpoint_interval, &cache.checkpoint_interval);

        let crawl = &self.crawl;
        set(&mut settings.full_scan, &crawl.full_scan);
        set(&mut settings.skip_fetch, &crawl.skip_fetch);
        set(&mut settings.start_id, &crawl.start_id);
        set(&mut settings.miss_limit, &crawl.miss_limit);
        set(&mut settings.recency_months, &crawl.recency_months);

        let dataset = &self.dataset;
        set(&mut settings.dance_style, &dataset.dance_style);
        set(
            &mut settings.rising_star_window_days,
            &dataset.rising_star_window_days,
        );
        set(&mut settings.rising_star_count, &dataset.rising_star_count);

        set(&mut settings.output_path, &self.load.output_path);
        set(&mut settings.chunk_size, &self.load.chunk_size);
        set(&mut settings.monitor, &self.monitoring.enabled);
    }

    pub fn into_settings(self) -> Settings {
        let mut settings = Settings::default();
        self.apply_to(&mut settings);
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::Validate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
[source]
api_endpoint = "http://localhost:9000/find"

[crawl]
full_scan = true
miss_limit = 50

[load]
output_path = "./site/assets"
"#;

        let settings = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .into_settings();

        assert_eq!(settings.api_endpoint, "http://localhost:9000/find");
        assert!(settings.full_scan);
        assert_eq!(settings.miss_limit, 50);
        assert_eq!(settings.output_path, "./site/assets");
        assert_eq!(settings.recency_months, 15);
        assert_eq!(settings.chunk_size, 20);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("POINTS_TEST_GEOCODING_KEY", "secret-key");

        let toml_content = r#"
[geocoding]
api_key = "${POINTS_TEST_GEOCODING_KEY}"
delay_ms = 0
"#;

        let settings = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .into_settings();
        assert_eq!(settings.geocoding_api_key.as_deref(), Some("secret-key"));
        assert_eq!(settings.geocoding_delay_ms, 0);

        std::env::remove_var("POINTS_TEST_GEOCODING_KEY");
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let toml_content = r#"
[source]
api_endpoint = "invalid-url"
"#;

        let settings = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .into_settings();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let result = TomlConfig::from_toml_str("[pipeline]\nname = \"x\"\n");
        assert!(matches!(result, Err(PointsError::TomlError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\ndata_dir = \"/var/lib/points\"\ncheckpoint_interval = 0").unwrap();

        let settings = TomlConfig::from_file(file.path()).unwrap().into_settings();
        assert_eq!(settings.data_dir, "/var/lib/points");
        assert_eq!(settings.checkpoint_interval, 0);
    }
}
