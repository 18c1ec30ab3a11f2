//! Time-series persistence.
//!
//! Samples go out as Prometheus exposition lines and come back in the
//! Prometheus query response shape, so any engine speaking that protocol
//! works. The shipped implementation targets VictoriaMetrics.

pub mod point;
pub mod victoria;

pub use point::MetricPoint;
pub use victoria::VictoriaMetricsStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PikaResult;

/// One `[timestamp_secs, "value"]` pair as the engine returns it. Kept raw
/// so a malformed pair skips one sample instead of failing the response.
pub type RawSample = Vec<serde_json::Value>;

/// Query response payload, matching the Prometheus API `data` object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<ResultSeries>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSeries {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RawSample>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<RawSample>,
}

impl ResultSeries {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.metric.get(name).map(String::as_str)
    }

    /// Most recent valid sample of the series, `(timestamp_ms, value)`.
    pub fn last_sample(&self) -> Option<(i64, f64)> {
        if let Some(sample) = self.values.last() {
            return decode_sample(sample);
        }
        self.value.as_deref().and_then(decode_sample)
    }
}

/// Decodes one raw sample into `(timestamp_ms, value)`.
///
/// Returns `None` for pairs that are not `[number, string]`, and for value
/// strings that do not parse as a float. Callers skip such samples.
pub fn decode_sample(sample: &[serde_json::Value]) -> Option<(i64, f64)> {
    if sample.len() != 2 {
        return None;
    }
    let timestamp_secs = sample[0].as_f64()?;
    let value = sample[1].as_str()?.parse::<f64>().ok()?;
    Some(((timestamp_secs * 1000.0) as i64, value))
}

/// Abstraction over the metric storage engine.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Persists a batch of points. An empty batch is a no-op.
    async fn write(&self, points: &[MetricPoint]) -> PikaResult<()>;

    /// Instant query evaluated at `time_ms`.
    async fn query(&self, query: &str, time_ms: i64) -> PikaResult<QueryData>;

    /// Range query over `[start_ms, end_ms]`. When `step_secs` is `None`
    /// the engine picks its default resolution.
    async fn query_range(
        &self,
        query: &str,
        start_ms: i64,
        end_ms: i64,
        step_secs: Option<u64>,
    ) -> PikaResult<QueryData>;

    /// Deletes every series matched by any of the selectors.
    async fn delete_series(&self, matchers: &[String]) -> PikaResult<()>;

    /// Distinct values of `label` across series matched by `matchers`.
    async fn label_values(&self, label: &str, matchers: &[String]) -> PikaResult<Vec<String>>;
}
