use crate::domain::model::DancerRecord;
use crate::domain::ports::Storage;
use crate::utils::archive::{compress_entry, decompress_entry};
use crate::utils::error::{PointsError, Result};
use std::collections::BTreeMap;

/// zip 內的檔名
pub const CACHE_ENTRY_NAME: &str = "raw_responses.json";

/// 舞者編號 → 最近一次抓到的原始紀錄。
///
/// 鍵以字串形式保存並依字串排序（"10" 排在 "9" 前面），
/// 讓每次寫出的檔案可以直接比對差異。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStore {
    records: BTreeMap<String, DancerRecord>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 讀取快取。檔案不存在視為第一次執行；無法讀取或格式錯誤一律回報錯誤
    pub async fn load<S: Storage>(storage: &S, path: &str) -> Result<Self> {
        let bytes = match storage.read_file(path).await {
            Ok(bytes) => bytes,
            Err(PointsError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("📂 No cache at '{}', starting empty", path);
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(PointsError::CacheCorrupt {
                    path: path.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        Self::decode(&bytes).map_err(|e| PointsError::CacheCorrupt {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn save<S: Storage>(&self, storage: &S, path: &str) -> Result<()> {
        let data = self.encode()?;
        tracing::debug!(
            "Writing cache with {} dancers ({} bytes) to '{}'",
            self.records.len(),
            data.len(),
            path
        );
        storage.write_file(path, &data).await
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(&self.records)?;
        compress_entry(CACHE_ENTRY_NAME, &json)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let json = decompress_entry(bytes, CACHE_ENTRY_NAME)?;
        let records = serde_json::from_slice(&json)?;
        Ok(Self { records })
    }

    /// 無條件覆蓋
    pub fn put(&mut self, id: u64, record: DancerRecord) {
        self.records.insert(id.to_string(), record);
    }

    pub fn get(&self, id: u64) -> Option<&DancerRecord> {
        self.records.get(&id.to_string())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &BTreeMap<String, DancerRecord> {
        &self.records
    }

    pub fn into_records(self) -> BTreeMap<String, DancerRecord> {
        self.records
    }

    /// 快取中最大的舞者編號（依紀錄本身的編號，而非字串鍵）
    pub fn max_id(&self) -> Option<u64> {
        self.records.values().map(|r| r.id).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{competition, dancer, tree, MemoryStorage};

    #[tokio::test]
    async fn test_missing_cache_loads_empty() {
        let storage = MemoryStorage::new();
        let cache = CacheStore::load(&storage, "raw_responses.json.zip").await.unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_fatal() {
        let storage = MemoryStorage::new();
        storage
            .write_file("raw_responses.json.zip", b"garbage")
            .await
            .unwrap();

        let result = CacheStore::load(&storage, "raw_responses.json.zip").await;
        assert!(matches!(result, Err(PointsError::CacheCorrupt { .. })));
    }

    #[tokio::test]
    async fn test_save_and_load_preserves_records() {
        let storage = MemoryStorage::new();
        let mut cache = CacheStore::new();
        let mut record = dancer(42, "Follower");
        record.follower.placements = Some(tree(&[(
            "Novice",
            vec![competition(3, "May 2022", Some(4), "follower")],
        )]));
        record
            .extra
            .insert("is_pro".to_string(), serde_json::json!(0));
        cache.put(42, record.clone());

        cache.save(&storage, "cache.zip").await.unwrap();
        let loaded = CacheStore::load(&storage, "cache.zip").await.unwrap();

        assert_eq!(loaded.get(42), Some(&record));
        assert_eq!(loaded, cache);
    }

    #[test]
    fn test_keys_sort_as_strings() {
        let mut cache = CacheStore::new();
        for id in [9, 10, 100, 2] {
            cache.put(id, dancer(id, "Leader"));
        }

        let keys: Vec<&str> = cache.records().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["10", "100", "2", "9"]);
        assert_eq!(cache.max_id(), Some(100));

        let json = String::from_utf8(
            decompress_entry(&cache.encode().unwrap(), CACHE_ENTRY_NAME).unwrap(),
        )
        .unwrap();
        let position = |key: &str| json.find(&format!("\"{}\":", key)).unwrap();
        assert!(position("10") < position("100"));
        assert!(position("100") < position("2"));
        assert!(position("2") < position("9"));
    }

    #[test]
    fn test_put_is_idempotent() {
        let mut cache = CacheStore::new();
        cache.put(5, dancer(5, "Leader"));
        let once = cache.clone();
        cache.put(5, dancer(5, "Leader"));
        assert_eq!(cache, once);
        assert_eq!(cache.len(), 1);
    }
}
