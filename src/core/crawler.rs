//! 增量爬取舞者紀錄。
//!
//! 編號由上游依序配發但中間有空號；連續 `miss_limit` 個編號查無資料時，
//! 視為已經掃到編號空間的尾端。這是經驗法則，不是保證：上游若長時間
//! 故障，同樣會讓掃描提早結束。

use crate::core::cache::CacheStore;
use crate::core::normalizer::Normalizer;
use crate::domain::ports::{RecordFetcher, Storage};
use crate::utils::error::Result;
use chrono::{Months, NaiveDate};

pub const DEFAULT_MISS_LIMIT: u32 = 200;
pub const DEFAULT_RECENCY_MONTHS: u32 = 15;
const PROGRESS_EVERY: u64 = 500;

/// 最近一次成績晚於此日期的舞者才需要重新抓取
pub fn recency_cutoff(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, Copy)]
pub struct CrawlOptions {
    pub miss_limit: u32,
    /// 每成功抓取幾筆就寫一次快取，0 代表只在最後寫入
    pub checkpoint_interval: u64,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            miss_limit: DEFAULT_MISS_LIMIT,
            checkpoint_interval: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub requests_made: u64,
    pub records_fetched: u64,
    /// 重新整理階段中成功更新的活躍舞者數
    pub refreshed: u64,
    /// 最後一個查詢的編號
    pub last_id: Option<u64>,
}

impl CrawlReport {
    fn absorb(&mut self, other: CrawlReport) {
        self.requests_made += other.requests_made;
        self.records_fetched += other.records_fetched;
        self.refreshed += other.refreshed;
        if other.last_id.is_some() {
            self.last_id = other.last_id;
        }
    }
}

/// 依序抓取，前一筆完成後才發出下一筆
pub struct Crawler<'a, F: RecordFetcher, S: Storage> {
    fetcher: &'a F,
    storage: &'a S,
    cache_path: &'a str,
    options: CrawlOptions,
}

impl<'a, F: RecordFetcher, S: Storage> Crawler<'a, F, S> {
    pub fn new(fetcher: &'a F, storage: &'a S, cache_path: &'a str, options: CrawlOptions) -> Self {
        Self {
            fetcher,
            storage,
            cache_path,
            options,
        }
    }

    /// 抓取單一編號並寫入快取，回傳是否成功
    async fn fetch_into(&self, cache: &mut CacheStore, id: u64) -> Result<bool> {
        match self.fetcher.fetch(id).await? {
            Some(record) => {
                cache.put(id, record);
                Ok(true)
            }
            None => {
                tracing::debug!("Empty result on {}", id);
                Ok(false)
            }
        }
    }

    async fn checkpoint(&self, cache: &CacheStore, successes: u64) -> Result<()> {
        let interval = self.options.checkpoint_interval;
        if interval > 0 && successes % interval == 0 {
            tracing::info!("💾 Checkpoint: saving {} cached dancers", cache.len());
            cache.save(self.storage, self.cache_path).await?;
        }
        Ok(())
    }

    /// 從 `start_id` 往上掃描，直到連續 `miss_limit` 次查無資料
    pub async fn full_scan(&self, cache: &mut CacheStore, start_id: u64) -> Result<CrawlReport> {
        let mut report = CrawlReport::default();
        let mut current_id = start_id;
        let mut miss_streak = 0u32;

        tracing::info!(
            "🔎 Scanning from id {} (stop after {} consecutive misses)",
            start_id,
            self.options.miss_limit
        );

        loop {
            if current_id % PROGRESS_EVERY == 0 {
                tracing::info!("Getting {}", current_id);
            }

            let success = self.fetch_into(cache, current_id).await?;
            report.requests_made += 1;
            report.last_id = Some(current_id);

            if success {
                miss_streak = 0;
                report.records_fetched += 1;
                self.checkpoint(cache, report.records_fetched).await?;
            } else {
                miss_streak += 1;
                if miss_streak >= self.options.miss_limit {
                    tracing::info!(
                        "🛑 {} consecutive misses, stopping at id {}",
                        miss_streak,
                        current_id
                    );
                    break;
                }
            }
            current_id += 1;
        }

        Ok(report)
    }

    /// 只重新抓取近期有成績的舞者，再從快取中最大編號的下一號繼續掃描新舞者
    pub async fn abbreviated_refresh(
        &self,
        cache: &mut CacheStore,
        normalizer: &Normalizer,
        cutoff: NaiveDate,
    ) -> Result<CrawlReport> {
        let max_id = cache.max_id();
        let active: Vec<u64> = cache
            .records()
            .values()
            .filter(|record| {
                normalizer
                    .latest_placement_date(record)
                    .is_some_and(|latest| latest > cutoff)
            })
            .map(|record| record.id)
            .collect();

        tracing::info!(
            "🔄 Refreshing {} of {} cached dancers active after {}",
            active.len(),
            cache.len(),
            cutoff
        );

        let mut report = CrawlReport::default();
        for id in active {
            let success = self.fetch_into(cache, id).await?;
            report.requests_made += 1;
            report.last_id = Some(id);
            if success {
                report.refreshed += 1;
                report.records_fetched += 1;
                self.checkpoint(cache, report.records_fetched).await?;
            }
        }

        let start_id = max_id.map_or(1, |id| id + 1);
        let scan = self.full_scan(cache, start_id).await?;
        report.absorb(scan);

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DancerRecord;
    use crate::testing::{competition, dancer, tree, MemoryStorage};
    use crate::utils::error::PointsError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// 編號落在 `present` 中才回傳紀錄，並記錄所有請求
    struct FakeFetcher {
        present: HashSet<u64>,
        broken: Option<u64>,
        requests: Mutex<Vec<u64>>,
    }

    impl FakeFetcher {
        fn with_ids(ids: impl IntoIterator<Item = u64>) -> Self {
            Self {
                present: ids.into_iter().collect(),
                broken: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        /// `id` 回傳無法解析的內容
        fn broken_at(mut self, id: u64) -> Self {
            self.broken = Some(id);
            self
        }

        fn requests(&self) -> Vec<u64> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordFetcher for FakeFetcher {
        async fn fetch(&self, id: u64) -> Result<Option<DancerRecord>> {
            self.requests.lock().unwrap().push(id);
            if self.broken == Some(id) {
                let err = serde_json::from_str::<DancerRecord>("{\"dancer_wsdcid\": \"x\"}")
                    .unwrap_err();
                return Err(err.into());
            }
            Ok(self.present.contains(&id).then(|| dancer(id, "Leader")))
        }
    }

    fn active_dancer(id: u64, date: &str) -> DancerRecord {
        let mut record = dancer(id, "Leader");
        record.leader.placements = Some(tree(&[(
            "Novice",
            vec![competition(1, date, Some(1), "leader")],
        )]));
        record
    }

    #[tokio::test]
    async fn test_full_scan_stops_after_miss_limit() {
        for n in [0u64, 1, 7, 250] {
            let fetcher = FakeFetcher::with_ids(1..=n);
            let storage = MemoryStorage::new();
            let crawler = Crawler::new(&fetcher, &storage, "cache.zip", CrawlOptions::default());
            let mut cache = CacheStore::new();

            let report = crawler.full_scan(&mut cache, 1).await.unwrap();

            assert_eq!(report.requests_made, n + 200);
            assert_eq!(report.last_id, Some(n + 200));
            assert_eq!(report.records_fetched, n);
            assert_eq!(cache.len() as u64, n);
        }
    }

    #[tokio::test]
    async fn test_success_resets_miss_streak() {
        // 199 個空號之後又有資料，掃描必須繼續
        let fetcher = FakeFetcher::with_ids([1, 201]);
        let storage = MemoryStorage::new();
        let crawler = Crawler::new(&fetcher, &storage, "cache.zip", CrawlOptions::default());
        let mut cache = CacheStore::new();

        let report = crawler.full_scan(&mut cache, 1).await.unwrap();

        assert_eq!(report.records_fetched, 2);
        assert_eq!(report.last_id, Some(401));
        assert!(cache.get(201).is_some());
    }

    #[tokio::test]
    async fn test_undecodable_record_aborts_scan() {
        let fetcher = FakeFetcher::with_ids(1..=5).broken_at(3);
        let storage = MemoryStorage::new();
        let crawler = Crawler::new(&fetcher, &storage, "cache.zip", CrawlOptions::default());
        let mut cache = CacheStore::new();

        let result = crawler.full_scan(&mut cache, 1).await;

        assert!(matches!(result, Err(PointsError::SerializationError(_))));
        assert_eq!(fetcher.requests(), vec![1, 2, 3]);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_requests_are_sequential() {
        let fetcher = FakeFetcher::with_ids(5..=6);
        let storage = MemoryStorage::new();
        let options = CrawlOptions {
            miss_limit: 3,
            checkpoint_interval: 0,
        };
        let crawler = Crawler::new(&fetcher, &storage, "cache.zip", options);
        let mut cache = CacheStore::new();

        crawler.full_scan(&mut cache, 5).await.unwrap();

        assert_eq!(fetcher.requests(), vec![5, 6, 7, 8, 9]);
    }

    #[tokio::test]
    async fn test_checkpoint_writes_cache() {
        let fetcher = FakeFetcher::with_ids(1..=4);
        let storage = MemoryStorage::new();
        let options = CrawlOptions {
            miss_limit: 2,
            checkpoint_interval: 2,
        };
        let crawler = Crawler::new(&fetcher, &storage, "cache.zip", options);
        let mut cache = CacheStore::new();

        crawler.full_scan(&mut cache, 1).await.unwrap();

        let saved = storage.get_file("cache.zip").await.unwrap();
        assert_eq!(CacheStore::decode(&saved).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_refresh_boundary_is_strict() {
        let cutoff = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut cache = CacheStore::new();
        cache.put(3, active_dancer(3, "June 2024"));
        cache.put(4, active_dancer(4, "July 2024"));
        cache.put(5, active_dancer(5, "January 2019"));
        cache.put(6, dancer(6, "Follower"));

        let fetcher = FakeFetcher::with_ids([3, 4, 5, 6]);
        let storage = MemoryStorage::new();
        let options = CrawlOptions {
            miss_limit: 2,
            checkpoint_interval: 0,
        };
        let crawler = Crawler::new(&fetcher, &storage, "cache.zip", options);

        let report = crawler
            .abbreviated_refresh(&mut cache, &Normalizer::default(), cutoff)
            .await
            .unwrap();

        // 只有 4 需要重新抓取，接著從 7 開始掃描
        assert_eq!(fetcher.requests(), vec![4, 7, 8]);
        assert_eq!(report.refreshed, 1);
        assert_eq!(report.requests_made, 3);
        assert_eq!(report.last_id, Some(8));
    }

    #[tokio::test]
    async fn test_refresh_one_day_inside_window() {
        let mut cache = CacheStore::new();
        cache.put(3, active_dancer(3, "June 2024"));

        let fetcher = FakeFetcher::with_ids([3]);
        let storage = MemoryStorage::new();
        let options = CrawlOptions {
            miss_limit: 1,
            checkpoint_interval: 0,
        };
        let crawler = Crawler::new(&fetcher, &storage, "cache.zip", options);
        let cutoff = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();

        crawler
            .abbreviated_refresh(&mut cache, &Normalizer::default(), cutoff)
            .await
            .unwrap();

        assert_eq!(fetcher.requests(), vec![3, 4]);
    }

    #[tokio::test]
    async fn test_refresh_on_empty_cache_scans_from_one() {
        let fetcher = FakeFetcher::with_ids(std::iter::empty());
        let storage = MemoryStorage::new();
        let options = CrawlOptions {
            miss_limit: 2,
            checkpoint_interval: 0,
        };
        let crawler = Crawler::new(&fetcher, &storage, "cache.zip", options);
        let mut cache = CacheStore::new();
        let cutoff = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();

        crawler
            .abbreviated_refresh(&mut cache, &Normalizer::default(), cutoff)
            .await
            .unwrap();

        assert_eq!(fetcher.requests(), vec![1, 2]);
    }

    #[test]
    fn test_recency_cutoff() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        assert_eq!(
            recency_cutoff(today, 15),
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
        );
    }
}
