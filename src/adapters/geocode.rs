use crate::domain::model::UpcomingEvent;
use crate::domain::ports::Storage;
use crate::utils::error::{PointsError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_GEOCODING_ENDPOINT: &str = "http://api.openweathermap.org/geo/1.0/direct";
pub const DEFAULT_GEOCODING_DELAY_MS: u64 = 1100;

/// 官網上地點欄位空白的活動
const LOCATION_PATCHES: &[(&str, &str)] = &[
    ("Swing Fling", "Washington, D.C., US"),
    ("Monterey Swing Fest", "Monterey, CA"),
];

/// 地點 → `[lat, lon]`；空陣列代表查過但沒有結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationCache {
    entries: BTreeMap<String, Vec<f64>>,
}

impl LocationCache {
    pub async fn load<S: Storage>(storage: &S, path: &str) -> Result<Self> {
        match storage.read_file(path).await {
            Ok(bytes) => Ok(Self {
                entries: serde_json::from_slice(&bytes)?,
            }),
            Err(PointsError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("📂 No location cache at '{}', starting empty", path);
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn save<S: Storage>(&self, storage: &S, path: &str) -> Result<()> {
        let data = serde_json::to_vec(&self.entries)?;
        storage.write_file(path, &data).await
    }

    /// 外層 `None` 代表沒查過
    pub fn lookup(&self, location: &str) -> Option<Option<(f64, f64)>> {
        self.entries.get(location).map(|coords| match coords.as_slice() {
            [lat, lon, ..] => Some((*lat, *lon)),
            _ => None,
        })
    }

    pub fn insert(&mut self, location: &str, coords: Option<(f64, f64)>) {
        let value = coords.map(|(lat, lon)| vec![lat, lon]).unwrap_or_default();
        self.entries.insert(location.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 地點空白時依活動名稱補上
pub fn patched_location(name: &str, location: &str) -> String {
    if !location.trim().is_empty() {
        return location.to_string();
    }
    match LOCATION_PATCHES.iter().find(|(event, _)| *event == name) {
        Some((_, patch)) => patch.to_string(),
        None => {
            tracing::warn!("⚠️ Location patch miss for '{}'", name);
            location.to_string()
        }
    }
}

/// "Denver, CO" → "Denver,CO,US"。第二段是兩個大寫字母（UK 除外）時視為美國州名
pub fn requestable_location(location: &str) -> String {
    let mut parts: Vec<&str> = location.split(',').map(str::trim).collect();
    let is_us_state = parts.get(1).is_some_and(|state| {
        state.len() == 2 && state.chars().all(|c| c.is_ascii_uppercase()) && *state != "UK"
    });
    if is_us_state {
        if parts.len() < 3 {
            parts.push("US");
        } else {
            parts[2] = "US";
        }
    }
    parts.join(",")
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    lat: f64,
    lon: f64,
}

pub struct Geocoder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    delay: Duration,
    remote: bool,
}

impl Geocoder {
    pub fn new(endpoint: String, api_key: Option<String>, delay_ms: u64, remote: bool) -> Self {
        if remote && api_key.is_none() {
            tracing::warn!("⚠️ No geocoding API key, only cached locations will be used");
        }
        Self {
            client: Client::new(),
            endpoint,
            api_key,
            delay: Duration::from_millis(delay_ms),
            remote,
        }
    }

    /// 查詢座標。快取命中直接回傳；否則在允許連線時呼叫 API 並寫回快取
    pub async fn locate(&self, cache: &mut LocationCache, location: &str) -> Option<(f64, f64)> {
        if let Some(cached) = cache.lookup(location) {
            return cached;
        }
        let api_key = match (&self.api_key, self.remote) {
            (Some(key), true) => key,
            _ => return None,
        };

        tokio::time::sleep(self.delay).await;
        let coords = self.request(location, api_key).await;
        if coords.is_none() {
            tracing::warn!("⚠️ No results for location {}", location);
        }
        cache.insert(location, coords);
        coords
    }

    async fn request(&self, location: &str, api_key: &str) -> Option<(f64, f64)> {
        let query = requestable_location(location);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query.as_str()), ("limit", "1"), ("appid", api_key)])
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let hits: Vec<GeocodeHit> = response.json().await.ok()?;
        hits.first().map(|hit| (hit.lat, hit.lon))
    }

    /// 補上每個活動的經緯度
    pub async fn annotate(&self, cache: &mut LocationCache, events: &mut [UpcomingEvent]) {
        for event in events.iter_mut() {
            let location = patched_location(&event.name, &event.location);
            if let Some((lat, lon)) = self.locate(cache, &location).await {
                event.latitude = Some(lat);
                event.longitude = Some(lon);
            }
        }
    }
}
