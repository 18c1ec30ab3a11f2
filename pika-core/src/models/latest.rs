//! Per-agent latest-value snapshots served straight from memory.
//!
//! Each category slot is refreshed independently as reports arrive; the
//! whole entry lives in the TTL cache and disappears after an hour without
//! reports. Consumers treat absence as "no recent data".

use serde::{Deserialize, Serialize};

use pika_protocol::{
    CpuData, DiskData, GpuData, MemoryData, NetworkConnectionData, NetworkData, TemperatureData,
};

use crate::models::HostMetric;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuMetric {
    pub agent_id: String,
    pub usage_percent: f64,
    pub logical_cores: u32,
    pub physical_cores: u32,
    pub model_name: String,
    pub timestamp: i64,
}

impl CpuMetric {
    pub fn from_report(agent_id: impl Into<String>, data: &CpuData, timestamp: i64) -> Self {
        Self {
            agent_id: agent_id.into(),
            usage_percent: data.usage_percent,
            logical_cores: data.logical_cores,
            physical_cores: data.physical_cores,
            model_name: data.model_name.clone(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetric {
    pub agent_id: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub available: u64,
    pub usage_percent: f64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_free: u64,
    pub timestamp: i64,
}

impl MemoryMetric {
    pub fn from_report(agent_id: impl Into<String>, data: &MemoryData, timestamp: i64) -> Self {
        Self {
            agent_id: agent_id.into(),
            total: data.total,
            used: data.used,
            free: data.free,
            available: data.available,
            usage_percent: data.usage_percent,
            swap_total: data.swap_total,
            swap_used: data.swap_used,
            swap_free: data.swap_free,
            timestamp,
        }
    }
}

/// Whole-host rollup across all reported mounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSummary {
    pub usage_percent: f64,
    pub total_disks: usize,
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

impl DiskSummary {
    pub fn from_disks(disks: &[DiskData]) -> Self {
        let mut total = 0u64;
        let mut used = 0u64;
        let mut free = 0u64;
        for disk in disks {
            total += disk.total;
            used += disk.used;
            free += disk.free;
        }
        let usage_percent = if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            usage_percent,
            total_disks: disks.len(),
            total,
            used,
            free,
        }
    }
}

/// Whole-host rollup across all reported interfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub total_bytes_sent_rate: f64,
    pub total_bytes_recv_rate: f64,
    pub total_bytes_sent_total: u64,
    pub total_bytes_recv_total: u64,
    pub total_interfaces: usize,
}

impl NetworkSummary {
    pub fn from_interfaces(interfaces: &[NetworkData]) -> Self {
        let mut summary = Self {
            total_interfaces: interfaces.len(),
            ..Default::default()
        };
        for net in interfaces {
            summary.total_bytes_sent_rate += net.bytes_sent_rate;
            summary.total_bytes_recv_rate += net.bytes_recv_rate;
            summary.total_bytes_sent_total += net.bytes_sent_total;
            summary.total_bytes_recv_total += net.bytes_recv_total;
        }
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConnectionMetric {
    pub agent_id: String,
    pub established: u32,
    pub syn_sent: u32,
    pub syn_recv: u32,
    pub fin_wait1: u32,
    pub fin_wait2: u32,
    pub time_wait: u32,
    pub close: u32,
    pub close_wait: u32,
    pub last_ack: u32,
    pub listen: u32,
    pub closing: u32,
    pub total: u32,
    pub timestamp: i64,
}

impl NetworkConnectionMetric {
    pub fn from_report(
        agent_id: impl Into<String>,
        data: &NetworkConnectionData,
        timestamp: i64,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            established: data.established,
            syn_sent: data.syn_sent,
            syn_recv: data.syn_recv,
            fin_wait1: data.fin_wait1,
            fin_wait2: data.fin_wait2,
            time_wait: data.time_wait,
            close: data.close,
            close_wait: data.close_wait,
            last_ack: data.last_ack,
            listen: data.listen,
            closing: data.closing,
            total: data.total,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuMetric {
    pub agent_id: String,
    pub index: u32,
    pub name: String,
    pub utilization: f64,
    pub memory_total: u64,
    pub memory_used: u64,
    pub memory_free: u64,
    pub temperature: f64,
    pub power_draw: f64,
    pub fan_speed: f64,
    pub timestamp: i64,
}

impl GpuMetric {
    pub fn from_report(agent_id: impl Into<String>, data: &GpuData, timestamp: i64) -> Self {
        Self {
            agent_id: agent_id.into(),
            index: data.index,
            name: data.name.clone(),
            utilization: data.utilization,
            memory_total: data.memory_total,
            memory_used: data.memory_used,
            memory_free: data.memory_free,
            temperature: data.temperature,
            power_draw: data.power_usage,
            fan_speed: data.fan_speed,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureMetric {
    pub agent_id: String,
    pub sensor_key: String,
    pub sensor_label: String,
    pub temperature: f64,
    pub timestamp: i64,
}

impl TemperatureMetric {
    /// The label falls back to the sensor key when the agent did not supply
    /// a human-readable name.
    pub fn from_report(agent_id: impl Into<String>, data: &TemperatureData, timestamp: i64) -> Self {
        let sensor_label = if data.label.is_empty() {
            data.sensor_key.clone()
        } else {
            data.label.clone()
        };
        Self {
            agent_id: agent_id.into(),
            sensor_key: data.sensor_key.clone(),
            sensor_label,
            temperature: data.temperature,
            timestamp,
        }
    }
}

/// The per-agent cache entry. Every slot is optional; a slot is only ever
/// replaced wholesale by a newer report of its own category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_connection: Option<NetworkConnectionMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<HostMetric>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub gpu: Vec<GpuMetric>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub temperature: Vec<TemperatureMetric>,
}
