//! Metric payload types and the closed metric-type registry.
//!
//! Adding a metric category is a deliberate act: add a variant here, a
//! payload struct, and the server-side routing arm. Unknown strings coming
//! off the wire fail [`MetricType::from_str`] and are skipped by the server,
//! so a newer agent never breaks an older server.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Every metric category the platform understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Cpu,
    Memory,
    Disk,
    Network,
    NetworkConnection,
    DiskIo,
    Host,
    Gpu,
    Temperature,
    Monitor,
}

#[derive(Debug, Error)]
#[error("unknown metric type: {0}")]
pub struct ParseMetricTypeError(String);

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Cpu => "cpu",
            MetricType::Memory => "memory",
            MetricType::Disk => "disk",
            MetricType::Network => "network",
            MetricType::NetworkConnection => "network_connection",
            MetricType::DiskIo => "disk_io",
            MetricType::Host => "host",
            MetricType::Gpu => "gpu",
            MetricType::Temperature => "temperature",
            MetricType::Monitor => "monitor",
        }
    }
}

impl FromStr for MetricType {
    type Err = ParseMetricTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(MetricType::Cpu),
            "memory" => Ok(MetricType::Memory),
            "disk" => Ok(MetricType::Disk),
            "network" => Ok(MetricType::Network),
            "network_connection" => Ok(MetricType::NetworkConnection),
            "disk_io" => Ok(MetricType::DiskIo),
            "host" => Ok(MetricType::Host),
            "gpu" => Ok(MetricType::Gpu),
            "temperature" => Ok(MetricType::Temperature),
            "monitor" => Ok(MetricType::Monitor),
            other => Err(ParseMetricTypeError(other.to_string())),
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole-host CPU sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuData {
    pub usage_percent: f64,
    pub logical_cores: u32,
    pub physical_cores: u32,
    #[serde(default)]
    pub model_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryData {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub available: u64,
    pub usage_percent: f64,
    #[serde(default)]
    pub swap_total: u64,
    #[serde(default)]
    pub swap_used: u64,
    #[serde(default)]
    pub swap_free: u64,
}

/// One mounted filesystem. Reports carry a list of these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskData {
    pub mount_point: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub fstype: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub usage_percent: f64,
}

/// One network interface. Rates are bytes/second over the agent's sampling
/// interval; totals are the kernel's cumulative counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkData {
    pub interface: String,
    pub bytes_sent_rate: f64,
    pub bytes_recv_rate: f64,
    pub bytes_sent_total: u64,
    pub bytes_recv_total: u64,
}

/// TCP connection counts by state, plus the total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConnectionData {
    pub established: u32,
    #[serde(default)]
    pub syn_sent: u32,
    #[serde(default)]
    pub syn_recv: u32,
    #[serde(default)]
    pub fin_wait1: u32,
    #[serde(default)]
    pub fin_wait2: u32,
    pub time_wait: u32,
    #[serde(default)]
    pub close: u32,
    pub close_wait: u32,
    #[serde(default)]
    pub last_ack: u32,
    pub listen: u32,
    #[serde(default)]
    pub closing: u32,
    pub total: u32,
}

/// One block device's throughput. Reports carry a list of these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskIoData {
    pub device: String,
    pub read_bytes_rate: f64,
    pub write_bytes_rate: f64,
}

/// Static-ish host facts, refreshed on every report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfoData {
    pub os: String,
    pub platform: String,
    #[serde(default)]
    pub platform_version: String,
    #[serde(default)]
    pub kernel_version: String,
    #[serde(default)]
    pub kernel_arch: String,
    /// Seconds since boot.
    pub uptime: u64,
    /// Unix seconds of the last boot.
    pub boot_time: u64,
    pub procs: u64,
}

/// One GPU. Reports carry a list of these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuData {
    pub index: u32,
    #[serde(default)]
    pub name: String,
    pub utilization: f64,
    #[serde(default)]
    pub memory_total: u64,
    #[serde(default)]
    pub memory_used: u64,
    #[serde(default)]
    pub memory_free: u64,
    #[serde(default)]
    pub temperature: f64,
    /// Watts.
    #[serde(default)]
    pub power_usage: f64,
    /// Percent of maximum.
    #[serde(default)]
    pub fan_speed: f64,
}

/// One temperature sensor. Reports carry a list of these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureData {
    pub sensor_key: String,
    /// Human-readable sensor name; becomes the series name on the query side.
    #[serde(default)]
    pub label: String,
    pub temperature: f64,
}

/// One service-check result produced by an agent on behalf of a monitor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorData {
    pub monitor_id: String,
    /// "up" or "down".
    pub status: String,
    /// Milliseconds.
    pub response_time: i64,
    /// Unix milliseconds; 0 when the target has no certificate.
    #[serde(default)]
    pub cert_expiry_time: i64,
    #[serde(default)]
    pub cert_days_left: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_type_round_trip() {
        let all = [
            MetricType::Cpu,
            MetricType::Memory,
            MetricType::Disk,
            MetricType::Network,
            MetricType::NetworkConnection,
            MetricType::DiskIo,
            MetricType::Host,
            MetricType::Gpu,
            MetricType::Temperature,
            MetricType::Monitor,
        ];
        for t in all {
            assert_eq!(MetricType::from_str(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn test_metric_type_unknown() {
        assert!(MetricType::from_str("bogus").is_err());
        assert!(MetricType::from_str("").is_err());
    }

    #[test]
    fn test_metric_type_wire_names() {
        assert_eq!(MetricType::NetworkConnection.as_str(), "network_connection");
        assert_eq!(MetricType::DiskIo.as_str(), "disk_io");
        assert_eq!(
            serde_json::to_string(&MetricType::NetworkConnection).unwrap(),
            "\"network_connection\""
        );
    }

    #[test]
    fn test_network_payload_wire_fields() {
        let data = NetworkData {
            interface: "eth0".to_string(),
            bytes_sent_rate: 10.0,
            bytes_recv_rate: 20.0,
            bytes_sent_total: 1000,
            bytes_recv_total: 2000,
        };
        let v = serde_json::to_value(&data).unwrap();
        assert_eq!(v["bytesRecvTotal"], 2000);
        assert_eq!(v["interface"], "eth0");
    }
}
