use crate::domain::model::DancerRecord;
use crate::domain::ports::RecordFetcher;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_API_ENDPOINT: &str = "https://points.worldsdc.com/lookup2020/find";

/// 上游以空值代表查無此人：null、false、0、""、[]、{}
fn is_falsy(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

/// 以表單 `num=<id>` POST 查詢單一舞者
pub struct HttpRecordFetcher {
    client: Client,
    endpoint: String,
}

impl HttpRecordFetcher {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    pub fn with_timeout(endpoint: String, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint,
        })
    }
}

#[async_trait]
impl RecordFetcher for HttpRecordFetcher {
    async fn fetch(&self, id: u64) -> Result<Option<DancerRecord>> {
        let response = match self
            .client
            .post(&self.endpoint)
            .form(&[("num", id.to_string())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Request for dancer {} failed: {}", id, e);
                return Ok(None);
            }
        };

        if response.status() != StatusCode::OK {
            tracing::debug!("Bad status code {} for dancer {}", response.status(), id);
            return Ok(None);
        }

        let payload: Value = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Unreadable payload for dancer {}: {}", id, e);
                return Ok(None);
            }
        };

        if is_falsy(&payload) {
            tracing::debug!("Received no record but no error status for dancer {}", id);
            return Ok(None);
        }

        // 上游格式變動不能當成空號，否則會悄悄吃掉舞者並提早結束掃描
        let record = serde_json::from_value(payload).map_err(|e| {
            tracing::error!("❌ Payload for dancer {} is not a dancer record: {}", id, e);
            e
        })?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::PointsError;
    use httpmock::prelude::*;

    fn record_json(id: u64) -> Value {
        serde_json::json!({
            "dancer_wsdcid": id,
            "dancer_first": "Sam",
            "dancer_last": "Swing",
            "short_dominate_role": "Leader",
            "leader": {
                "placements": {
                    "West Coast Swing": {
                        "NOV": {
                            "division": {"id": 4, "name": "Novice", "abbreviation": "NOV"},
                            "competitions": [{
                                "role": "leader",
                                "points": 3,
                                "result": "3",
                                "event": {
                                    "id": 77,
                                    "name": "Swing Fest",
                                    "location": "Denver, CO",
                                    "url": "https://example.com",
                                    "date": "April 2023"
                                }
                            }]
                        }
                    }
                }
            },
            "follower": {"placements": []},
            "is_pro": 0
        })
    }

    #[tokio::test]
    async fn test_fetch_posts_form_and_parses_record() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/find").body("num=12");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(record_json(12));
        });

        let fetcher = HttpRecordFetcher::new(server.url("/find"));
        let record = fetcher.fetch(12).await.unwrap().unwrap();

        api_mock.assert();
        assert_eq!(record.id, 12);
        assert_eq!(record.display_name(), "Sam Swing");
        assert_eq!(record.extra.get("is_pro"), Some(&serde_json::json!(0)));
    }

    #[tokio::test]
    async fn test_error_status_is_absence() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/find");
            then.status(500);
        });

        let fetcher = HttpRecordFetcher::new(server.url("/find"));
        assert!(fetcher.fetch(1).await.unwrap().is_none());
        api_mock.assert();
    }

    #[tokio::test]
    async fn test_empty_payloads_are_absence() {
        for body in ["[]", "{}", "null", "false", ""] {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST).path("/find");
                then.status(200).body(body);
            });

            let fetcher = HttpRecordFetcher::new(server.url("/find"));
            assert!(fetcher.fetch(1).await.unwrap().is_none(), "body {:?}", body);
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_absence() {
        let fetcher = HttpRecordFetcher::with_timeout(
            "http://127.0.0.1:1/find".to_string(),
            Some(Duration::from_secs(2)),
        )
        .unwrap();
        assert!(fetcher.fetch(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mismatched_record_is_an_error() {
        let mut null_role = record_json(12);
        null_role["short_dominate_role"] = Value::Null;
        let mut string_id = record_json(12);
        string_id["dancer_wsdcid"] = serde_json::json!("12");

        for body in [null_role, string_id] {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST).path("/find");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(body.clone());
            });

            let fetcher = HttpRecordFetcher::new(server.url("/find"));
            let result = fetcher.fetch(12).await;
            assert!(
                matches!(result, Err(PointsError::SerializationError(_))),
                "body {}",
                body
            );
        }
    }

    #[test]
    fn test_is_falsy() {
        assert!(is_falsy(&serde_json::json!(0)));
        assert!(!is_falsy(&serde_json::json!({"a": 1})));
        assert!(!is_falsy(&serde_json::json!(true)));
    }
}
