use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One reassembled point, timestamp in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDataPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// One named series of a query response. A single metric type can produce
/// several of these, one per interface, GPU, or sensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    pub data: Vec<MetricDataPoint>,
}

/// Query response shared by agent metric and monitor history lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    /// Empty for monitor history, which spans agents.
    pub agent_id: String,
    #[serde(rename = "type")]
    pub metric_type: String,
    /// `"{start_ms}-{end_ms}"` as queried.
    pub range: String,
    pub series: Vec<MetricSeries>,
}
