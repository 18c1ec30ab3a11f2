//! Write side of the metric pipeline.
//!
//! One report fans out three ways: the latest-value cache slot for its
//! category, time-series points for the storage engine, and, for network
//! reports, traffic accounting. The cache is updated before the storage
//! write, so a storage outage never blinds the latest-value reads.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use pika_protocol::{
    CpuData, DiskData, DiskIoData, GpuData, HostInfoData, MemoryData, MetricType, MonitorData,
    NetworkConnectionData, NetworkData, TemperatureData,
};

use crate::cache::TtlCache;
use crate::error::PikaResult;
use crate::metric_names;
use crate::models::{
    CpuMetric, DiskSummary, GpuMetric, HostMetric, LatestMetrics, MemoryMetric,
    NetworkConnectionMetric, NetworkSummary, TemperatureMetric,
};
use crate::repo::HostMetricRepository;
use crate::services::TrafficService;
use crate::storage::{MetricPoint, TimeSeriesStore};

/// How long a latest-metrics entry survives without any report.
const LATEST_TTL: Duration = Duration::from_secs(60 * 60);

pub struct MetricIngestService {
    store: Arc<dyn TimeSeriesStore>,
    host_metric_repo: HostMetricRepository,
    traffic: Arc<TrafficService>,
    latest_cache: TtlCache<String, LatestMetrics>,
}

impl MetricIngestService {
    pub fn new(
        store: Arc<dyn TimeSeriesStore>,
        host_metric_repo: HostMetricRepository,
        traffic: Arc<TrafficService>,
    ) -> Self {
        Self {
            store,
            host_metric_repo,
            traffic,
            latest_cache: TtlCache::new(),
        }
    }

    /// Spawns the sweep that evicts cache entries of silent agents.
    pub fn spawn_cache_reaper(&self, every: Duration) -> JoinHandle<()> {
        self.latest_cache.spawn_reaper(every)
    }

    /// Routes one agent report by its metric type.
    ///
    /// An unknown type string is logged and skipped so a newer agent never
    /// breaks this server. A payload that fails to decode is an error to the
    /// caller, as is a storage write failure; the cache slot is refreshed
    /// regardless of how the storage write goes.
    pub async fn handle_metric_data(
        &self,
        agent_id: &str,
        metric_type: &str,
        data: &serde_json::Value,
    ) -> PikaResult<()> {
        let Ok(metric_type) = MetricType::from_str(metric_type) else {
            warn!(agent_id, metric_type, "Unknown metric type, report skipped");
            return Ok(());
        };
        let now_ms = Utc::now().timestamp_millis();

        match metric_type {
            MetricType::Cpu => {
                let cpu: CpuData = decode(data)?;
                let metric = CpuMetric::from_report(agent_id, &cpu, now_ms);
                self.update_latest(agent_id, |latest| latest.cpu = Some(metric))
                    .await;
                self.store.write(&cpu_points(agent_id, &cpu, now_ms)).await
            }

            MetricType::Memory => {
                let memory: MemoryData = decode(data)?;
                let metric = MemoryMetric::from_report(agent_id, &memory, now_ms);
                self.update_latest(agent_id, |latest| latest.memory = Some(metric))
                    .await;
                self.store
                    .write(&memory_points(agent_id, &memory, now_ms))
                    .await
            }

            MetricType::Disk => {
                let disks: Vec<DiskData> = decode(data)?;
                let summary = DiskSummary::from_disks(&disks);
                let points = disk_points(agent_id, &disks, &summary, now_ms);
                self.update_latest(agent_id, |latest| latest.disk = Some(summary))
                    .await;
                self.store.write(&points).await
            }

            MetricType::Network => {
                let interfaces: Vec<NetworkData> = decode(data)?;
                let summary = NetworkSummary::from_interfaces(&interfaces);
                let recv_total = summary.total_bytes_recv_total;
                self.update_latest(agent_id, |latest| latest.network = Some(summary))
                    .await;
                // Traffic accounting must see the counter even if the
                // storage write fails afterwards.
                if let Err(err) = self.traffic.update(agent_id, recv_total).await {
                    error!(agent_id, error = %err, "Failed to update traffic accounting");
                }
                self.store
                    .write(&network_points(agent_id, &interfaces, now_ms))
                    .await
            }

            MetricType::NetworkConnection => {
                let connections: NetworkConnectionData = decode(data)?;
                let metric = NetworkConnectionMetric::from_report(agent_id, &connections, now_ms);
                self.update_latest(agent_id, |latest| latest.network_connection = Some(metric))
                    .await;
                self.store
                    .write(&connection_points(agent_id, &connections, now_ms))
                    .await
            }

            MetricType::DiskIo => {
                let devices: Vec<DiskIoData> = decode(data)?;
                self.store
                    .write(&disk_io_points(agent_id, &devices, now_ms))
                    .await
            }

            MetricType::Host => {
                // Host facts change rarely; they go to the relational store
                // as a snapshot, never to the time-series engine.
                let host: HostInfoData = decode(data)?;
                let metric = HostMetric::from_report(agent_id, &host, now_ms);
                let cached = metric.clone();
                self.update_latest(agent_id, |latest| latest.host = Some(cached))
                    .await;
                self.host_metric_repo.upsert(&metric).await?;
                Ok(())
            }

            MetricType::Gpu => {
                let gpus: Vec<GpuData> = decode(data)?;
                let metrics: Vec<GpuMetric> = gpus
                    .iter()
                    .map(|gpu| GpuMetric::from_report(agent_id, gpu, now_ms))
                    .collect();
                self.update_latest(agent_id, |latest| latest.gpu = metrics)
                    .await;
                self.store.write(&gpu_points(agent_id, &gpus, now_ms)).await
            }

            MetricType::Temperature => {
                let sensors: Vec<TemperatureData> = decode(data)?;
                let metrics: Vec<TemperatureMetric> = sensors
                    .iter()
                    .map(|sensor| TemperatureMetric::from_report(agent_id, sensor, now_ms))
                    .collect();
                self.update_latest(agent_id, |latest| latest.temperature = metrics)
                    .await;
                self.store
                    .write(&temperature_points(agent_id, &sensors, now_ms))
                    .await
            }

            MetricType::Monitor => {
                let checks: Vec<MonitorData> = decode(data)?;
                self.store
                    .write(&monitor_points(agent_id, &checks, now_ms))
                    .await
            }
        }
    }

    /// Cached snapshot, or `None` when the agent has been silent past the
    /// TTL. Never reaches out to the store.
    pub async fn latest_metrics(&self, agent_id: &str) -> Option<LatestMetrics> {
        self.latest_cache.get(&agent_id.to_string()).await
    }

    /// Removes everything recorded for an agent: the relational host
    /// snapshot, every time series tagged with it, and the cache entry.
    ///
    /// The relational delete is best-effort; a series-delete failure is
    /// returned since leftover series would resurface in queries.
    pub async fn delete_agent_data(&self, agent_id: &str) -> PikaResult<()> {
        if let Err(err) = self.host_metric_repo.delete_by_agent(agent_id).await {
            error!(agent_id, error = %err, "Failed to delete host metric snapshot");
        }

        let matcher = format!(
            r#"{{__name__=~"{}.*",agent_id="{agent_id}"}}"#,
            metric_names::SERIES_PREFIX
        );
        if let Err(err) = self.store.delete_series(&[matcher]).await {
            error!(agent_id, error = %err, "Failed to delete agent time series");
            return Err(err);
        }

        self.latest_cache.remove(&agent_id.to_string()).await;
        info!(agent_id, "Deleted all metric data for agent");
        Ok(())
    }

    /// Removes every series belonging to one monitor across all agents.
    pub async fn delete_monitor_data(&self, monitor_id: &str) -> PikaResult<()> {
        let matcher = format!(
            r#"{{__name__=~"{}.*",monitor_id="{monitor_id}"}}"#,
            metric_names::MONITOR_SERIES_PREFIX
        );
        if let Err(err) = self.store.delete_series(&[matcher]).await {
            error!(monitor_id, error = %err, "Failed to delete monitor time series");
            return Err(err);
        }

        info!(monitor_id, "Deleted all metric data for monitor");
        Ok(())
    }

    async fn update_latest<F>(&self, agent_id: &str, f: F)
    where
        F: FnOnce(&mut LatestMetrics),
    {
        self.latest_cache
            .update_with(agent_id.to_string(), LATEST_TTL, f)
            .await;
    }
}

fn decode<T: DeserializeOwned>(data: &serde_json::Value) -> PikaResult<T> {
    Ok(serde_json::from_value(data.clone())?)
}

fn cpu_points(agent_id: &str, data: &CpuData, timestamp: i64) -> Vec<MetricPoint> {
    vec![MetricPoint::new(
        metric_names::CPU_USAGE_PERCENT,
        agent_id,
        data.usage_percent,
        timestamp,
    )]
}

fn memory_points(agent_id: &str, data: &MemoryData, timestamp: i64) -> Vec<MetricPoint> {
    vec![MetricPoint::new(
        metric_names::MEMORY_USAGE_PERCENT,
        agent_id,
        data.usage_percent,
        timestamp,
    )]
}

fn disk_points(
    agent_id: &str,
    disks: &[DiskData],
    summary: &DiskSummary,
    timestamp: i64,
) -> Vec<MetricPoint> {
    let mut points = Vec::with_capacity(disks.len() + 1);
    for disk in disks {
        points.push(
            MetricPoint::new(
                metric_names::DISK_USAGE_PERCENT,
                agent_id,
                disk.usage_percent,
                timestamp,
            )
            .with_label(metric_names::LABEL_MOUNT_POINT, &disk.mount_point),
        );
    }
    // The whole-host rollup rides on an empty mount_point label; the usage
    // chart selects exactly this series.
    points.push(
        MetricPoint::new(
            metric_names::DISK_USAGE_PERCENT,
            agent_id,
            summary.usage_percent,
            timestamp,
        )
        .with_label(metric_names::LABEL_MOUNT_POINT, ""),
    );
    points
}

// No whole-host series here: the chart sums the per-interface series, so an
// extra rollup series would be counted twice.
fn network_points(agent_id: &str, interfaces: &[NetworkData], timestamp: i64) -> Vec<MetricPoint> {
    let mut points = Vec::with_capacity(interfaces.len() * 4);
    for net in interfaces {
        points.push(
            MetricPoint::new(
                metric_names::NETWORK_SENT_BYTES_RATE,
                agent_id,
                net.bytes_sent_rate,
                timestamp,
            )
            .with_label(metric_names::LABEL_INTERFACE, &net.interface),
        );
        points.push(
            MetricPoint::new(
                metric_names::NETWORK_RECV_BYTES_RATE,
                agent_id,
                net.bytes_recv_rate,
                timestamp,
            )
            .with_label(metric_names::LABEL_INTERFACE, &net.interface),
        );
        points.push(
            MetricPoint::new(
                metric_names::NETWORK_SENT_BYTES_TOTAL,
                agent_id,
                net.bytes_sent_total as f64,
                timestamp,
            )
            .with_label(metric_names::LABEL_INTERFACE, &net.interface),
        );
        points.push(
            MetricPoint::new(
                metric_names::NETWORK_RECV_BYTES_TOTAL,
                agent_id,
                net.bytes_recv_total as f64,
                timestamp,
            )
            .with_label(metric_names::LABEL_INTERFACE, &net.interface),
        );
    }
    points
}

fn connection_points(
    agent_id: &str,
    data: &NetworkConnectionData,
    timestamp: i64,
) -> Vec<MetricPoint> {
    vec![
        MetricPoint::new(
            metric_names::NETWORK_CONN_ESTABLISHED,
            agent_id,
            f64::from(data.established),
            timestamp,
        ),
        MetricPoint::new(
            metric_names::NETWORK_CONN_TIME_WAIT,
            agent_id,
            f64::from(data.time_wait),
            timestamp,
        ),
        MetricPoint::new(
            metric_names::NETWORK_CONN_CLOSE_WAIT,
            agent_id,
            f64::from(data.close_wait),
            timestamp,
        ),
        MetricPoint::new(
            metric_names::NETWORK_CONN_LISTEN,
            agent_id,
            f64::from(data.listen),
            timestamp,
        ),
        MetricPoint::new(
            metric_names::NETWORK_CONN_TOTAL,
            agent_id,
            f64::from(data.total),
            timestamp,
        ),
    ]
}

fn disk_io_points(agent_id: &str, devices: &[DiskIoData], timestamp: i64) -> Vec<MetricPoint> {
    let mut points = Vec::with_capacity(devices.len() * 2);
    for device in devices {
        points.push(
            MetricPoint::new(
                metric_names::DISK_READ_BYTES_RATE,
                agent_id,
                device.read_bytes_rate,
                timestamp,
            )
            .with_label(metric_names::LABEL_DEVICE, &device.device),
        );
        points.push(
            MetricPoint::new(
                metric_names::DISK_WRITE_BYTES_RATE,
                agent_id,
                device.write_bytes_rate,
                timestamp,
            )
            .with_label(metric_names::LABEL_DEVICE, &device.device),
        );
    }
    points
}

fn gpu_points(agent_id: &str, gpus: &[GpuData], timestamp: i64) -> Vec<MetricPoint> {
    let mut points = Vec::with_capacity(gpus.len() * 4);
    for gpu in gpus {
        let index = gpu.index.to_string();
        points.push(
            MetricPoint::new(
                metric_names::GPU_UTILIZATION_PERCENT,
                agent_id,
                gpu.utilization,
                timestamp,
            )
            .with_label(metric_names::LABEL_GPU_INDEX, &index),
        );
        points.push(
            MetricPoint::new(
                metric_names::GPU_TEMPERATURE_CELSIUS,
                agent_id,
                gpu.temperature,
                timestamp,
            )
            .with_label(metric_names::LABEL_GPU_INDEX, &index),
        );
        points.push(
            MetricPoint::new(
                metric_names::GPU_MEMORY_USED_BYTES,
                agent_id,
                gpu.memory_used as f64,
                timestamp,
            )
            .with_label(metric_names::LABEL_GPU_INDEX, &index),
        );
        points.push(
            MetricPoint::new(
                metric_names::GPU_MEMORY_TOTAL_BYTES,
                agent_id,
                gpu.memory_total as f64,
                timestamp,
            )
            .with_label(metric_names::LABEL_GPU_INDEX, &index),
        );
    }
    points
}

fn temperature_points(
    agent_id: &str,
    sensors: &[TemperatureData],
    timestamp: i64,
) -> Vec<MetricPoint> {
    let mut points = Vec::with_capacity(sensors.len());
    for sensor in sensors {
        let label = if sensor.label.is_empty() {
            &sensor.sensor_key
        } else {
            &sensor.label
        };
        points.push(
            MetricPoint::new(
                metric_names::TEMPERATURE_CELSIUS,
                agent_id,
                sensor.temperature,
                timestamp,
            )
            .with_label(metric_names::LABEL_SENSOR_KEY, &sensor.sensor_key)
            .with_label(metric_names::LABEL_SENSOR_LABEL, label),
        );
    }
    points
}

fn monitor_points(agent_id: &str, checks: &[MonitorData], timestamp: i64) -> Vec<MetricPoint> {
    let mut points = Vec::new();
    for check in checks {
        points.push(
            MetricPoint::new(
                metric_names::MONITOR_RESPONSE_TIME_MS,
                agent_id,
                check.response_time as f64,
                timestamp,
            )
            .with_label(metric_names::LABEL_MONITOR_ID, &check.monitor_id),
        );

        let status_value = if check.status == "up" { 1.0 } else { 0.0 };
        points.push(
            MetricPoint::new(metric_names::MONITOR_STATUS, agent_id, status_value, timestamp)
                .with_label(metric_names::LABEL_MONITOR_ID, &check.monitor_id)
                .with_label(metric_names::LABEL_STATUS, &check.status),
        );

        // Targets without a certificate report an expiry of zero; writing
        // that would show up as an expiry in 1970.
        if check.cert_expiry_time > 0 {
            points.push(
                MetricPoint::new(
                    metric_names::MONITOR_CERT_DAYS_LEFT,
                    agent_id,
                    check.cert_days_left as f64,
                    timestamp,
                )
                .with_label(metric_names::LABEL_MONITOR_ID, &check.monitor_id),
            );
            points.push(
                MetricPoint::new(
                    metric_names::MONITOR_CERT_EXPIRY_TIMESTAMP_MS,
                    agent_id,
                    check.cert_expiry_time as f64,
                    timestamp,
                )
                .with_label(metric_names::LABEL_MONITOR_ID, &check.monitor_id),
            );
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_points_include_summary_series() {
        let disks = vec![
            DiskData {
                mount_point: "/".to_string(),
                total: 100,
                used: 40,
                free: 60,
                usage_percent: 40.0,
                ..Default::default()
            },
            DiskData {
                mount_point: "/data".to_string(),
                total: 300,
                used: 60,
                free: 240,
                usage_percent: 20.0,
                ..Default::default()
            },
        ];
        let summary = DiskSummary::from_disks(&disks);

        let points = disk_points("a-1", &disks, &summary, 1_700_000_000_000);

        assert_eq!(points.len(), 3);
        assert_eq!(
            points[0].labels.get("mount_point").map(String::as_str),
            Some("/")
        );
        let rollup = &points[2];
        assert_eq!(rollup.labels.get("mount_point").map(String::as_str), Some(""));
        assert_eq!(rollup.value, 25.0);
    }

    #[test]
    fn test_network_points_skip_rollup_series() {
        let interfaces = vec![
            NetworkData {
                interface: "eth0".to_string(),
                bytes_sent_rate: 10.0,
                bytes_recv_rate: 20.0,
                bytes_sent_total: 1_000,
                bytes_recv_total: 2_000,
            },
            NetworkData {
                interface: "eth1".to_string(),
                bytes_sent_rate: 1.0,
                bytes_recv_rate: 2.0,
                bytes_sent_total: 100,
                bytes_recv_total: 200,
            },
        ];

        let points = network_points("a-1", &interfaces, 1_700_000_000_000);

        assert_eq!(points.len(), 8);
        assert!(points
            .iter()
            .all(|p| !p.labels.get("interface").map_or(true, String::is_empty)));
    }

    #[test]
    fn test_gpu_points_labeled_by_index() {
        let gpus = vec![GpuData {
            index: 1,
            utilization: 80.0,
            temperature: 65.0,
            memory_total: 8_000,
            memory_used: 6_000,
            ..Default::default()
        }];

        let points = gpu_points("a-1", &gpus, 0);

        assert_eq!(points.len(), 4);
        assert!(points
            .iter()
            .all(|p| p.labels.get("gpu_index").map(String::as_str) == Some("1")));
        assert_eq!(points[0].name, "pika_gpu_utilization_percent");
        assert_eq!(points[2].value, 6_000.0);
    }

    #[test]
    fn test_temperature_points_fall_back_to_sensor_key() {
        let sensors = vec![TemperatureData {
            sensor_key: "coretemp_core_0".to_string(),
            label: String::new(),
            temperature: 55.5,
        }];

        let points = temperature_points("a-1", &sensors, 0);

        assert_eq!(
            points[0].labels.get("sensor_label").map(String::as_str),
            Some("coretemp_core_0")
        );
    }

    #[test]
    fn test_monitor_points_omit_missing_certificate() {
        let checks = vec![
            MonitorData {
                monitor_id: "m-1".to_string(),
                status: "up".to_string(),
                response_time: 120,
                cert_expiry_time: 1_800_000_000_000,
                cert_days_left: 42,
            },
            MonitorData {
                monitor_id: "m-2".to_string(),
                status: "down".to_string(),
                response_time: 0,
                cert_expiry_time: 0,
                cert_days_left: 0,
            },
        ];

        let points = monitor_points("a-1", &checks, 0);

        // m-1 has four points, the certificate-less m-2 only two.
        assert_eq!(points.len(), 6);
        let status_point = points
            .iter()
            .find(|p| p.name == "pika_monitor_status" && p.labels["monitor_id"] == "m-1")
            .unwrap();
        assert_eq!(status_point.value, 1.0);
        assert_eq!(status_point.labels.get("status").map(String::as_str), Some("up"));
        assert!(!points
            .iter()
            .any(|p| p.name.contains("cert") && p.labels["monitor_id"] == "m-2"));
    }

    #[test]
    fn test_connection_points_cover_tracked_states() {
        let data = NetworkConnectionData {
            established: 10,
            time_wait: 5,
            close_wait: 2,
            listen: 7,
            total: 30,
            ..Default::default()
        };

        let points = connection_points("a-1", &data, 0);

        let names: Vec<&str> = points.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "pika_network_conn_established",
                "pika_network_conn_time_wait",
                "pika_network_conn_close_wait",
                "pika_network_conn_listen",
                "pika_network_conn_total",
            ]
        );
        assert_eq!(points[4].value, 30.0);
    }

    #[test]
    fn test_decode_rejects_mismatched_payload() {
        let result: PikaResult<CpuData> = decode(&serde_json::json!(["not", "an", "object"]));
        assert!(result.is_err());

        let cpu: CpuData = decode(&serde_json::json!({
            "usagePercent": 42.5,
            "logicalCores": 8,
            "physicalCores": 4
        }))
        .unwrap();
        assert_eq!(cpu.usage_percent, 42.5);
        assert_eq!(cpu.model_name, "");
    }
}
