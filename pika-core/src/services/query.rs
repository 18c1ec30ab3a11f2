//! Read side of the metric pipeline.
//!
//! A metric type expands to one or more PromQL queries; each query runs
//! independently and the results are reassembled into [`MetricSeries`] rows.
//! A failing sub-query is logged and skipped, so callers always get the
//! series that could be fetched.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, warn};

use pika_protocol::MetricType;

use crate::error::{PikaError, PikaResult};
use crate::metric_names;
use crate::models::{
    MetricDataPoint, MetricSeries, MetricsResponse, MonitorAgentStat, MonitorStats, MonitorStatus,
};
use crate::storage::{decode_sample, QueryData, ResultSeries, TimeSeriesStore};

/// One PromQL query plus how its results are presented.
#[derive(Debug, Clone)]
pub struct QueryDefinition {
    /// Series name used when no per-instance label overrides it.
    pub name: String,
    pub query: String,
    /// Extra labels stamped onto every resulting series.
    pub labels: HashMap<String, String>,
}

impl QueryDefinition {
    pub fn new(name: &str, query: String) -> Self {
        Self {
            name: name.to_string(),
            query,
            labels: HashMap::new(),
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }
}

pub struct MetricQueryService {
    store: Arc<dyn TimeSeriesStore>,
}

impl MetricQueryService {
    pub fn new(store: Arc<dyn TimeSeriesStore>) -> Self {
        Self { store }
    }

    /// Expands a metric type into its query set.
    ///
    /// Multi-instance types fan out into several definitions (upload and
    /// download, read and write). Types with no range series, `host` and
    /// `monitor`, expand to an empty set.
    pub fn build_queries(
        agent_id: &str,
        metric_type: MetricType,
        interface: Option<&str>,
    ) -> Vec<QueryDefinition> {
        match metric_type {
            MetricType::Cpu => vec![QueryDefinition::new(
                "usage",
                agent_selector(metric_names::CPU_USAGE_PERCENT, agent_id),
            )],

            MetricType::Memory => vec![QueryDefinition::new(
                "usage",
                agent_selector(metric_names::MEMORY_USAGE_PERCENT, agent_id),
            )],

            // Only the summary series; per-mount data stays out of the chart.
            MetricType::Disk => vec![QueryDefinition::new(
                "usage",
                format!(
                    r#"{}{{agent_id="{agent_id}",mount_point=""}}"#,
                    metric_names::DISK_USAGE_PERCENT
                ),
            )],

            MetricType::Network => match interface {
                Some(name) if !name.is_empty() && name != "all" => vec![
                    QueryDefinition::new(
                        "upload",
                        format!(
                            r#"{}{{agent_id="{agent_id}",interface="{name}"}}"#,
                            metric_names::NETWORK_SENT_BYTES_RATE
                        ),
                    )
                    .with_label(metric_names::LABEL_INTERFACE, name),
                    QueryDefinition::new(
                        "download",
                        format!(
                            r#"{}{{agent_id="{agent_id}",interface="{name}"}}"#,
                            metric_names::NETWORK_RECV_BYTES_RATE
                        ),
                    )
                    .with_label(metric_names::LABEL_INTERFACE, name),
                ],
                _ => vec![
                    QueryDefinition::new(
                        "upload",
                        format!(
                            r#"sum({}{{agent_id="{agent_id}"}}) by (agent_id)"#,
                            metric_names::NETWORK_SENT_BYTES_RATE
                        ),
                    ),
                    QueryDefinition::new(
                        "download",
                        format!(
                            r#"sum({}{{agent_id="{agent_id}"}}) by (agent_id)"#,
                            metric_names::NETWORK_RECV_BYTES_RATE
                        ),
                    ),
                ],
            },

            MetricType::NetworkConnection => vec![
                QueryDefinition::new(
                    "established",
                    agent_selector(metric_names::NETWORK_CONN_ESTABLISHED, agent_id),
                ),
                QueryDefinition::new(
                    "time_wait",
                    agent_selector(metric_names::NETWORK_CONN_TIME_WAIT, agent_id),
                ),
                QueryDefinition::new(
                    "close_wait",
                    agent_selector(metric_names::NETWORK_CONN_CLOSE_WAIT, agent_id),
                ),
                // "listen" maps to the total-connections series.
                QueryDefinition::new(
                    "listen",
                    agent_selector(metric_names::NETWORK_CONN_TOTAL, agent_id),
                ),
            ],

            MetricType::DiskIo => vec![
                QueryDefinition::new(
                    "read",
                    agent_selector(metric_names::DISK_READ_BYTES_RATE, agent_id),
                ),
                QueryDefinition::new(
                    "write",
                    agent_selector(metric_names::DISK_WRITE_BYTES_RATE, agent_id),
                ),
            ],

            MetricType::Gpu => vec![
                QueryDefinition::new(
                    "utilization",
                    agent_selector(metric_names::GPU_UTILIZATION_PERCENT, agent_id),
                ),
                QueryDefinition::new(
                    "temperature",
                    agent_selector(metric_names::GPU_TEMPERATURE_CELSIUS, agent_id),
                ),
            ],

            MetricType::Temperature => vec![QueryDefinition::new(
                "temperature",
                agent_selector(metric_names::TEMPERATURE_CELSIUS, agent_id),
            )],

            MetricType::Host | MetricType::Monitor => Vec::new(),
        }
    }

    /// Range query over `[start_ms, end_ms]`, reassembled per query
    /// definition. The storage engine picks the step.
    pub async fn get_metrics(
        &self,
        agent_id: &str,
        metric_type: MetricType,
        start_ms: i64,
        end_ms: i64,
        interface: Option<&str>,
    ) -> PikaResult<MetricsResponse> {
        let queries = Self::build_queries(agent_id, metric_type, interface);
        if queries.is_empty() {
            return Err(PikaError::Unsupported(format!(
                "metric type '{metric_type}' has no range series"
            )));
        }

        let mut series = Vec::new();
        for definition in &queries {
            let data = match self
                .store
                .query_range(&definition.query, start_ms, end_ms, None)
                .await
            {
                Ok(data) => data,
                Err(err) => {
                    error!(query = %definition.query, error = %err, "Range query failed");
                    continue;
                }
            };
            series.extend(convert_query_data(&data, definition));
        }

        Ok(MetricsResponse {
            agent_id: agent_id.to_string(),
            metric_type: metric_type.to_string(),
            range: format!("{start_ms}-{end_ms}"),
            series,
        })
    }

    /// Interface names the agent has reported traffic for. Empty label
    /// values are filtered out. Lookup failures degrade to an empty list.
    pub async fn available_network_interfaces(&self, agent_id: &str) -> Vec<String> {
        let matcher = format!(
            r#"{}{{agent_id="{agent_id}"}}"#,
            metric_names::NETWORK_SENT_BYTES_RATE
        );

        match self
            .store
            .label_values(metric_names::LABEL_INTERFACE, &[matcher])
            .await
        {
            Ok(values) => values.into_iter().filter(|v| !v.is_empty()).collect(),
            Err(err) => {
                error!(agent_id, error = %err, "Interface lookup failed");
                Vec::new()
            }
        }
    }

    /// Aggregate view of one monitor across every agent probing it.
    ///
    /// Status reduces as up if any agent is up, else down if any is down,
    /// else unknown. Response time is the mean across agents that reported
    /// one. Certificate expiry is the earliest reported, carrying its paired
    /// days-left value. Last check is the newest across agents.
    pub async fn monitor_stats(&self, monitor_id: &str) -> PikaResult<MonitorStats> {
        let per_agent = self.collect_monitor_stats(monitor_id).await;

        let mut result = MonitorStats {
            agent_count: per_agent.len(),
            ..Default::default()
        };
        if per_agent.is_empty() {
            return Ok(result);
        }

        let mut response_sum: i64 = 0;
        let mut response_count: i64 = 0;
        let mut has_up = false;
        let mut has_down = false;
        let mut earliest_expiry: Option<(i64, Option<i64>)> = None;

        for stat in per_agent.values() {
            if let Some(response_time) = stat.response_time {
                response_sum += response_time;
                response_count += 1;
            }

            result.last_check_time = result.last_check_time.max(stat.last_check_time);

            match stat.status {
                MonitorStatus::Up => has_up = true,
                MonitorStatus::Down => has_down = true,
                MonitorStatus::Unknown => {}
            }

            if let Some(expiry) = stat.cert_expiry_date {
                if expiry > 0 && earliest_expiry.map_or(true, |(current, _)| expiry < current) {
                    earliest_expiry = Some((expiry, stat.cert_expiry_days));
                }
            }
        }

        if response_count > 0 {
            result.response_time = response_sum / response_count;
        }
        result.status = if has_up {
            MonitorStatus::Up
        } else if has_down {
            MonitorStatus::Down
        } else {
            MonitorStatus::Unknown
        };
        if let Some((expiry, days)) = earliest_expiry {
            result.cert_expiry_date = Some(expiry);
            result.cert_expiry_days = days;
        }

        Ok(result)
    }

    /// Per-agent rows behind [`Self::monitor_stats`], unreduced, sorted by
    /// agent id.
    pub async fn monitor_agent_stats(&self, monitor_id: &str) -> PikaResult<Vec<MonitorAgentStat>> {
        let per_agent = self.collect_monitor_stats(monitor_id).await;

        let mut rows: Vec<MonitorAgentStat> = per_agent.into_values().collect();
        rows.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(rows)
    }

    /// Response-time trend of one monitor over `[start_ms, end_ms]`, one
    /// series per probing agent.
    pub async fn monitor_history(
        &self,
        monitor_id: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> PikaResult<MetricsResponse> {
        let query = format!(
            r#"{}{{monitor_id="{monitor_id}"}}"#,
            metric_names::MONITOR_RESPONSE_TIME_MS
        );

        let mut series = Vec::new();
        match self.store.query_range(&query, start_ms, end_ms, None).await {
            Ok(data) => {
                let definition = QueryDefinition::new("response_time", query);
                series.extend(convert_query_data(&data, &definition));
            }
            Err(err) => warn!(%query, error = %err, "Monitor history query failed"),
        }

        Ok(MetricsResponse {
            agent_id: String::new(),
            metric_type: MetricType::Monitor.to_string(),
            range: format!("{start_ms}-{end_ms}"),
            series,
        })
    }

    /// Runs the four instant monitor queries and merges them into one row
    /// per agent. An agent appears once it shows up in any sub-query.
    async fn collect_monitor_stats(&self, monitor_id: &str) -> HashMap<String, MonitorAgentStat> {
        let now_ms = Utc::now().timestamp_millis();
        let mut stats: HashMap<String, MonitorAgentStat> = HashMap::new();

        if let Some(data) = self
            .monitor_query(metric_names::MONITOR_RESPONSE_TIME_MS, monitor_id, now_ms)
            .await
        {
            for series in &data.result {
                let Some(stat) = stat_entry(&mut stats, series) else {
                    continue;
                };
                if let Some((timestamp, value)) = series.last_sample() {
                    stat.response_time = Some(value as i64);
                    stat.last_check_time = timestamp;
                }
            }
        }

        if let Some(data) = self
            .monitor_query(metric_names::MONITOR_STATUS, monitor_id, now_ms)
            .await
        {
            for series in &data.result {
                let Some(stat) = stat_entry(&mut stats, series) else {
                    continue;
                };
                if series.last_sample().is_none() {
                    continue;
                }
                // The verdict rides on the series label, not the sample value.
                if let Some(verdict) = series
                    .label(metric_names::LABEL_STATUS)
                    .filter(|v| !v.is_empty())
                {
                    stat.status = MonitorStatus::from_label(verdict);
                }
            }
        }

        if let Some(data) = self
            .monitor_query(metric_names::MONITOR_CERT_DAYS_LEFT, monitor_id, now_ms)
            .await
        {
            for series in &data.result {
                let Some(stat) = stat_entry(&mut stats, series) else {
                    continue;
                };
                if let Some((_, value)) = series.last_sample() {
                    stat.cert_expiry_days = Some(value as i64);
                }
            }
        }

        if let Some(data) = self
            .monitor_query(
                metric_names::MONITOR_CERT_EXPIRY_TIMESTAMP_MS,
                monitor_id,
                now_ms,
            )
            .await
        {
            for series in &data.result {
                let Some(stat) = stat_entry(&mut stats, series) else {
                    continue;
                };
                if let Some((_, value)) = series.last_sample() {
                    stat.cert_expiry_date = Some(value as i64);
                }
            }
        }

        stats
    }

    async fn monitor_query(
        &self,
        series_name: &str,
        monitor_id: &str,
        time_ms: i64,
    ) -> Option<QueryData> {
        let query = format!(r#"{series_name}{{monitor_id="{monitor_id}"}}"#);
        match self.store.query(&query, time_ms).await {
            Ok(data) => Some(data),
            Err(err) => {
                warn!(%query, error = %err, "Monitor status query failed");
                None
            }
        }
    }
}

fn agent_selector(series: &str, agent_id: &str) -> String {
    format!(r#"{series}{{agent_id="{agent_id}"}}"#)
}

/// Row for the agent named on the series, created on first sight. Series
/// without an `agent_id` label are ignored.
fn stat_entry<'a>(
    stats: &'a mut HashMap<String, MonitorAgentStat>,
    series: &ResultSeries,
) -> Option<&'a mut MonitorAgentStat> {
    let agent_id = series.label(metric_names::LABEL_AGENT_ID)?;
    if agent_id.is_empty() {
        return None;
    }
    Some(
        stats
            .entry(agent_id.to_string())
            .or_insert_with(|| MonitorAgentStat::new(agent_id)),
    )
}

fn convert_query_data(data: &QueryData, definition: &QueryDefinition) -> Vec<MetricSeries> {
    let mut all_series = Vec::with_capacity(data.result.len());

    for result_series in &data.result {
        let mut points = Vec::with_capacity(result_series.values.len());
        for sample in &result_series.values {
            if let Some((timestamp, value)) = decode_sample(sample) {
                points.push(MetricDataPoint { timestamp, value });
            }
        }

        let mut labels: HashMap<String, String> = result_series
            .metric
            .iter()
            .filter(|(key, _)| key.as_str() != metric_names::LABEL_SERIES_NAME)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for (key, value) in &definition.labels {
            labels.insert(key.clone(), value.clone());
        }

        // Per-instance labels become the display name.
        let name = if let Some(sensor_label) = labels.remove(metric_names::LABEL_SENSOR_LABEL) {
            sensor_label
        } else if let Some(gpu_index) = labels.remove(metric_names::LABEL_GPU_INDEX) {
            format!("GPU_{gpu_index}")
        } else {
            definition.name.clone()
        };

        all_series.push(MetricSeries {
            name,
            labels,
            data: points,
        });
    }

    all_series
}

/// Aligns `[start_ms, end_ms)` to `bucket_ms` boundaries so that ranges of
/// equal duration always resolve to the same bucket count regardless of
/// phase. A non-positive bucket returns the range unchanged; an inverted
/// range collapses to the aligned start.
pub fn align_time_range_to_bucket(start_ms: i64, end_ms: i64, bucket_ms: i64) -> (i64, i64) {
    if bucket_ms <= 0 {
        return (start_ms, end_ms);
    }

    let aligned_start = (start_ms / bucket_ms) * bucket_ms;
    let end_bucket = ((end_ms - 1) / bucket_ms) * bucket_ms;
    let mut aligned_end = end_bucket + bucket_ms - 1;
    if aligned_end < aligned_start {
        aligned_end = aligned_start;
    }

    (aligned_start, aligned_end)
}
