use crate::adapters::events_page::EventsPageSource;
use crate::adapters::geocode::{Geocoder, LocationCache};
use crate::core::cache::CacheStore;
use crate::core::crawler::{recency_cutoff, CrawlOptions, CrawlReport, Crawler};
use crate::core::dataset::DatasetBuilder;
use crate::core::export::{write_dataset, DATABASE_FILE};
use crate::core::normalizer::Normalizer;
use crate::domain::model::{Dataset, Harvest};
use crate::domain::ports::{ConfigProvider, Pipeline, RecordFetcher, Storage};
use crate::utils::error::Result;
use chrono::NaiveDateTime;

/// 抓取 → 組裝 → 輸出。
///
/// `storage` 放快取（舞者、活動頁、地點），`output` 放輸出的資料集
pub struct PointsPipeline<S: Storage, C: ConfigProvider, F: RecordFetcher> {
    storage: S,
    output: S,
    config: C,
    fetcher: F,
    normalizer: Normalizer,
    events_page: EventsPageSource,
    geocoder: Geocoder,
    now: NaiveDateTime,
}

impl<S: Storage, C: ConfigProvider, F: RecordFetcher> PointsPipeline<S, C, F> {
    pub fn new(storage: S, output: S, config: C, fetcher: F) -> Self {
        let normalizer = Normalizer::new(config.dance_style());
        let events_page = EventsPageSource::new(config.events_page_url().to_string());
        let geocoder = Geocoder::new(
            config.geocoding_endpoint().to_string(),
            config.geocoding_api_key().map(str::to_string),
            config.geocoding_delay_ms(),
            !config.skip_fetch(),
        );

        Self {
            storage,
            output,
            config,
            fetcher,
            normalizer,
            events_page,
            geocoder,
            now: chrono::Local::now().naive_local(),
        }
    }

    /// 固定「現在時間」，影響近期活躍判斷、新秀區間與 last_updated
    pub fn with_clock(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    async fn crawl(&self, cache: &mut CacheStore) -> Result<CrawlReport> {
        let crawler = Crawler::new(
            &self.fetcher,
            &self.storage,
            self.config.cache_file(),
            CrawlOptions {
                miss_limit: self.config.miss_limit(),
                checkpoint_interval: self.config.checkpoint_interval(),
            },
        );

        if self.config.full_scan() {
            tracing::info!("🌐 Full scan requested");
            crawler.full_scan(cache, self.config.start_id()).await
        } else {
            let cutoff = recency_cutoff(self.now.date(), self.config.recency_months());
            crawler
                .abbreviated_refresh(cache, &self.normalizer, cutoff)
                .await
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, F: RecordFetcher> Pipeline for PointsPipeline<S, C, F> {
    async fn extract(&self) -> Result<Harvest> {
        let mut cache = CacheStore::load(&self.storage, self.config.cache_file()).await?;
        tracing::info!("📦 Loaded {} cached dancers", cache.len());

        let mut requests_made = 0;
        if self.config.skip_fetch() {
            tracing::info!("⏭️ Skipping remote fetch, using cached records only");
        } else {
            let report = self.crawl(&mut cache).await?;
            cache.save(&self.storage, self.config.cache_file()).await?;
            tracing::info!(
                "Made {} requests, fetched {} records ({} refreshed)",
                report.requests_made,
                report.records_fetched,
                report.refreshed
            );
            requests_made = report.requests_made;
        }

        let mut upcoming_events = self
            .events_page
            .upcoming_events(
                &self.storage,
                self.config.events_cache_file(),
                !self.config.skip_fetch(),
            )
            .await?;
        if !self.config.skip_fetch() {
            // 活動頁面也算一次請求
            requests_made += 1;
        }

        let location_file = self.config.location_cache_file();
        let mut locations = LocationCache::load(&self.storage, location_file).await?;
        self.geocoder
            .annotate(&mut locations, &mut upcoming_events)
            .await;
        locations.save(&self.storage, location_file).await?;
        tracing::info!(
            "📅 {} upcoming events, {} known locations",
            upcoming_events.len(),
            locations.len()
        );

        Ok(Harvest {
            dancers: cache.into_records(),
            upcoming_events,
            requests_made,
        })
    }

    async fn transform(&self, harvest: Harvest) -> Result<Dataset> {
        DatasetBuilder::new(self.normalizer.clone(), self.now)
            .with_rising_stars(
                self.config.rising_star_window_days(),
                self.config.rising_star_count(),
            )
            .build(harvest)
    }

    async fn load(&self, dataset: Dataset) -> Result<String> {
        let written = write_dataset(&self.output, &dataset, self.config.chunk_size()).await?;
        tracing::debug!("Wrote {} files", written);
        Ok(format!("{}/{}", self.config.output_path(), DATABASE_FILE))
    }
}
