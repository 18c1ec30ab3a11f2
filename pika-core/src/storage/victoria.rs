use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::StorageSettings;
use crate::error::{PikaError, PikaResult};
use crate::storage::{MetricPoint, QueryData, TimeSeriesStore};

const IMPORT_PATH: &str = "/api/v1/import/prometheus";
const QUERY_PATH: &str = "/api/v1/query";
const QUERY_RANGE_PATH: &str = "/api/v1/query_range";
const DELETE_SERIES_PATH: &str = "/api/v1/admin/tsdb/delete_series";

/// VictoriaMetrics-backed [`TimeSeriesStore`].
///
/// Talks the Prometheus-compatible HTTP API, so a single-node VictoriaMetrics
/// or anything wire-compatible with it can sit behind this.
pub struct VictoriaMetricsStore {
    client: Client,
    base_url: String,
}

impl VictoriaMetricsStore {
    pub fn new(settings: &StorageSettings) -> PikaResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn ensure_success(response: reqwest::Response) -> PikaResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(PikaError::StorageBadStatus { status, body })
    }

    async fn read_query_data(response: reqwest::Response) -> PikaResult<QueryData> {
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;

        let parsed: QueryResponse = serde_json::from_str(&body)
            .map_err(|e| PikaError::StorageParseError(e.to_string()))?;

        if parsed.status != "success" {
            return Err(PikaError::StorageRequestFailed(
                parsed.error.unwrap_or_else(|| "query rejected".to_string()),
            ));
        }

        Ok(parsed.data.unwrap_or_default())
    }
}

/// Unix milliseconds rendered as the fractional seconds the API expects.
fn format_time(timestamp_ms: i64) -> String {
    format!("{:.3}", timestamp_ms as f64 / 1000.0)
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabelValuesResponse {
    status: String,
    #[serde(default)]
    data: Vec<String>,
}

#[async_trait]
impl TimeSeriesStore for VictoriaMetricsStore {
    async fn write(&self, points: &[MetricPoint]) -> PikaResult<()> {
        if points.is_empty() {
            return Ok(());
        }

        let mut body = String::new();
        for point in points {
            body.push_str(&point.to_string());
            body.push('\n');
        }

        let response = self
            .client
            .post(format!("{}{}", self.base_url, IMPORT_PATH))
            .body(body)
            .send()
            .await?;
        Self::ensure_success(response).await?;

        debug!(points = points.len(), "Wrote metric points");
        Ok(())
    }

    async fn query(&self, query: &str, time_ms: i64) -> PikaResult<QueryData> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, QUERY_PATH))
            .query(&[("query", query), ("time", format_time(time_ms).as_str())])
            .send()
            .await?;

        Self::read_query_data(response).await
    }

    async fn query_range(
        &self,
        query: &str,
        start_ms: i64,
        end_ms: i64,
        step_secs: Option<u64>,
    ) -> PikaResult<QueryData> {
        let mut params = vec![
            ("query", query.to_string()),
            ("start", format_time(start_ms)),
            ("end", format_time(end_ms)),
        ];
        if let Some(step) = step_secs {
            params.push(("step", format!("{step}s")));
        }

        let response = self
            .client
            .get(format!("{}{}", self.base_url, QUERY_RANGE_PATH))
            .query(&params)
            .send()
            .await?;

        Self::read_query_data(response).await
    }

    async fn delete_series(&self, matchers: &[String]) -> PikaResult<()> {
        if matchers.is_empty() {
            return Ok(());
        }

        let params: Vec<(&str, &str)> = matchers.iter().map(|m| ("match[]", m.as_str())).collect();
        let response = self
            .client
            .post(format!("{}{}", self.base_url, DELETE_SERIES_PATH))
            .query(&params)
            .send()
            .await?;
        Self::ensure_success(response).await?;

        info!(?matchers, "Deleted time series");
        Ok(())
    }

    async fn label_values(&self, label: &str, matchers: &[String]) -> PikaResult<Vec<String>> {
        let mut request = self
            .client
            .get(format!("{}/api/v1/label/{}/values", self.base_url, label));
        if !matchers.is_empty() {
            let params: Vec<(&str, &str)> =
                matchers.iter().map(|m| ("match[]", m.as_str())).collect();
            request = request.query(&params);
        }

        let response = request.send().await?;
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;

        let parsed: LabelValuesResponse = serde_json::from_str(&body)
            .map_err(|e| PikaError::StorageParseError(e.to_string()))?;

        if parsed.status != "success" {
            return Err(PikaError::StorageRequestFailed(format!(
                "label values query returned status '{}'",
                parsed.status
            )));
        }

        Ok(parsed.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time_renders_fractional_seconds() {
        assert_eq!(format_time(1_700_000_000_000), "1700000000.000");
        assert_eq!(format_time(1_700_000_000_123), "1700000000.123");
        assert_eq!(format_time(0), "0.000");
    }

    #[test]
    fn test_trailing_slash_trimmed_from_endpoint() {
        let store = VictoriaMetricsStore::new(&StorageSettings {
            endpoint: "http://vm:8428/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();

        assert_eq!(store.base_url, "http://vm:8428");
    }

    #[test]
    fn test_query_response_error_envelope() {
        let raw = r#"{"status": "error", "error": "cannot parse query"}"#;
        let parsed: QueryResponse = serde_json::from_str(raw).unwrap();

        assert_eq!(parsed.status, "error");
        assert_eq!(parsed.error.as_deref(), Some("cannot parse query"));
        assert!(parsed.data.is_none());
    }
}
