use crate::domain::model::UpcomingEvent;
use crate::domain::ports::Storage;
use crate::utils::archive::{compress_entry, decompress_entry};
use crate::utils::error::{PointsError, Result};
use chrono::NaiveDate;
use regex::Regex;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

pub const DEFAULT_EVENTS_PAGE_URL: &str = "https://www.worldsdc.com/events/";
pub const EVENTS_ENTRY_NAME: &str = "raw_events.html";

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").unwrap());
static MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-zA-Z]{3}").unwrap());
static DAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,2}").unwrap());
static END_DAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s(\d{1,2})[,\s]").unwrap());

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

fn month_number(abbreviation: &str) -> Option<u32> {
    let lower = abbreviation.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == lower)
        .map(|i| i as u32 + 1)
}

fn date_from_parts(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month_number(month)?, day.parse().ok()?)
}

/// 解析 "May 3 - 5, 2024" 或 "Dec 29, 2023 - Jan 2, 2024" 這類日期區間。
///
/// 開始日取第一個年份、月份、日；結束日取最後一個年份、月份，
/// 以及最後一個後面接逗號或空白的日。
pub fn parse_date_range(text: &str) -> Option<(NaiveDate, NaiveDate)> {
    let years: Vec<&str> = YEAR.find_iter(text).map(|m| m.as_str()).collect();
    let months: Vec<&str> = MONTH.find_iter(text).map(|m| m.as_str()).collect();
    let first_day = DAY.find(text)?.as_str();
    let last_day = END_DAY
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .last()?
        .as_str();

    let start = date_from_parts(years.first()?, months.first()?, first_day)?;
    let end = date_from_parts(years.last()?, months.last()?, last_day)?;
    Some((start, end))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| PointsError::ProcessingError {
        message: format!("invalid selector '{}': {}", css, e),
    })
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn select_first_text(cell: &ElementRef, sel: &Selector) -> Option<String> {
    cell.select(sel)
        .next()
        .map(|n| n.text().collect::<String>().trim().to_string())
}

/// 解析活動列表頁。第一列是表頭；無法解析的列記錄警告後略過。
/// 經緯度留空，交給 geocoder 補上
pub fn parse_events_page(html: &str) -> Result<Vec<UpcomingEvent>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let name_sel = selector("div.event_name")?;
    let type_sel = selector("div.event_type")?;
    let link_sel = selector("a[href]")?;

    let Some(table) = document.select(&table_sel).next() else {
        tracing::warn!("⚠️ Events page has no table");
        return Ok(Vec::new());
    };

    let mut events = Vec::new();
    for (index, row) in table.select(&row_sel).enumerate().skip(1) {
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if cells.len() < 3 {
            tracing::warn!("⚠️ Events row {} has {} cells, skipping", index, cells.len());
            continue;
        }

        let date_text = cells[0].text().collect::<String>();
        let name = select_first_text(&cells[1], &name_sel);
        let url = cells[1]
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);
        let (Some(name), Some(url)) = (name, url) else {
            tracing::warn!("⚠️ Events row {} has no name or link, skipping", index);
            continue;
        };
        let Some((start_date, end_date)) = parse_date_range(&date_text) else {
            tracing::warn!(
                "⚠️ Could not parse dates '{}' for event '{}', skipping",
                date_text.trim(),
                name
            );
            continue;
        };

        events.push(UpcomingEvent {
            name,
            location: cell_text(&cells[2]),
            latitude: None,
            longitude: None,
            url,
            event_type: select_first_text(&cells[1], &type_sel).unwrap_or_default(),
            start_date,
            end_date,
        });
    }

    Ok(events)
}

/// 抓取活動列表頁並保存壓縮後的原始 HTML
pub struct EventsPageSource {
    client: Client,
    url: String,
}

impl EventsPageSource {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    /// 非 200 或連線失敗時回傳 `None`，沿用上次的快取
    pub async fn fetch_html(&self) -> Option<String> {
        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("⚠️ Failed to fetch events page: {}", e);
                return None;
            }
        };
        if response.status() != StatusCode::OK {
            tracing::warn!("⚠️ Events page returned {}", response.status());
            return None;
        }
        match response.text().await {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::warn!("⚠️ Failed to read events page body: {}", e);
                None
            }
        }
    }

    /// 先更新快取（若有需要），再從快取解析活動
    pub async fn upcoming_events<S: Storage>(
        &self,
        storage: &S,
        cache_path: &str,
        fetch_remote: bool,
    ) -> Result<Vec<UpcomingEvent>> {
        if fetch_remote {
            if let Some(html) = self.fetch_html().await {
                let archive = compress_entry(EVENTS_ENTRY_NAME, html.as_bytes())?;
                storage.write_file(cache_path, &archive).await?;
            }
        }

        let archive = match storage.read_file(cache_path).await {
            Ok(bytes) => bytes,
            Err(PointsError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("⚠️ No cached events page at '{}'", cache_path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let html = decompress_entry(&archive, EVENTS_ENTRY_NAME)?;
        parse_events_page(&String::from_utf8_lossy(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStorage;
    use httpmock::prelude::*;

    const PAGE: &str = r#"
        <html><body>
        <table>
          <tr><th>Date</th><th>Event</th><th>Location</th></tr>
          <tr>
            <td>May 3 - 5, 2024</td>
            <td><a href="https://swingfest.example"><div class="event_name"> Swing Fest </div></a>
                <div class="event_type">Registry</div></td>
            <td>Denver, CO</td>
          </tr>
          <tr>
            <td>Dec 29, 2023 - Jan 2, 2024</td>
            <td><a href="https://nye.example"><div class="event_name">New Year Swing</div></a>
                <div class="event_type">Invitational</div></td>
            <td>Paris, France</td>
          </tr>
          <tr>
            <td>TBA</td>
            <td><a href="https://tba.example"><div class="event_name">Mystery</div></a></td>
            <td></td>
          </tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_date_range() {
        assert_eq!(
            parse_date_range("May 3 - 5, 2024"),
            Some((
                NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 5).unwrap()
            ))
        );
        assert_eq!(
            parse_date_range("Dec 29, 2023 - Jan 2, 2024"),
            Some((
                NaiveDate::from_ymd_opt(2023, 12, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
            ))
        );
        assert_eq!(parse_date_range("TBA"), None);
    }

    #[test]
    fn test_parse_events_page_skips_header_and_bad_rows() {
        let events = parse_events_page(PAGE).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "Swing Fest");
        assert_eq!(events[0].url, "https://swingfest.example");
        assert_eq!(events[0].event_type, "Registry");
        assert_eq!(events[0].location, "Denver, CO");
        assert_eq!(events[1].end_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!(events.iter().all(|e| e.latitude.is_none()));
    }

    #[tokio::test]
    async fn test_fetch_caches_page_and_skip_fetch_reuses_it() {
        let server = MockServer::start();
        let page_mock = server.mock(|when, then| {
            when.method(GET).path("/events/");
            then.status(200).body(PAGE);
        });
        let storage = MemoryStorage::new();
        let source = EventsPageSource::new(server.url("/events/"));

        let fetched = source
            .upcoming_events(&storage, "raw_events.html.zip", true)
            .await
            .unwrap();
        page_mock.assert();
        assert_eq!(fetched.len(), 2);

        let cached = source
            .upcoming_events(&storage, "raw_events.html.zip", false)
            .await
            .unwrap();
        page_mock.assert_hits(1);
        assert_eq!(cached, fetched);
    }

    #[tokio::test]
    async fn test_missing_cache_gives_no_events() {
        let storage = MemoryStorage::new();
        let source = EventsPageSource::new("http://127.0.0.1:1/events/".to_string());
        let events = source
            .upcoming_events(&storage, "raw_events.html.zip", false)
            .await
            .unwrap();
        assert!(events.is_empty());
    }
}
