use crate::domain::model::{Dataset, DancerRecord, Harvest};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn request_timeout_secs(&self) -> Option<u64>;
    fn events_page_url(&self) -> &str;
    fn cache_file(&self) -> &str;
    fn events_cache_file(&self) -> &str;
    fn location_cache_file(&self) -> &str;
    fn geocoding_endpoint(&self) -> &str;
    fn geocoding_api_key(&self) -> Option<&str>;
    fn geocoding_delay_ms(&self) -> u64;
    fn output_path(&self) -> &str;
    fn full_scan(&self) -> bool;
    fn skip_fetch(&self) -> bool;
    fn start_id(&self) -> u64;
    fn miss_limit(&self) -> u32;
    fn recency_months(&self) -> u32;
    fn checkpoint_interval(&self) -> u64;
    fn dance_style(&self) -> &str;
    fn rising_star_window_days(&self) -> i64;
    fn rising_star_count(&self) -> usize;
    fn chunk_size(&self) -> u64;
}

/// 以編號查詢單一舞者。查無資料與暫時失敗回傳 `Ok(None)`；
/// 有內容卻不是舞者紀錄時回傳錯誤，中止整次執行
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch(&self, id: u64) -> Result<Option<DancerRecord>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Harvest>;
    async fn transform(&self, harvest: Harvest) -> Result<Dataset>;
    async fn load(&self, dataset: Dataset) -> Result<String>;
}
