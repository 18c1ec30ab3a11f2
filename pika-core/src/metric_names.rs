//! Canonical time-series names and label keys.
//!
//! Every series written by the ingest path and read back by the query path
//! goes through these constants, so the two sides cannot drift apart. All
//! series carry an `agent_id` label; the per-item labels are noted on each
//! name.

/// Prefix shared by every series Pika writes. Used to build delete matchers
/// that wipe all data for an agent in one call.
pub const SERIES_PREFIX: &str = "pika_";

/// Prefix of the monitor-scoped series, keyed by `monitor_id` rather than
/// only `agent_id`.
pub const MONITOR_SERIES_PREFIX: &str = "pika_monitor_";

// ============================================================================
// Series names
// ============================================================================

/// Overall CPU usage percentage (0-100).
pub const CPU_USAGE_PERCENT: &str = "pika_cpu_usage_percent";

/// Physical memory usage percentage (0-100).
pub const MEMORY_USAGE_PERCENT: &str = "pika_memory_usage_percent";

/// Per-mount disk usage percentage. Labelled with `mount_point`; the
/// aggregate summary point carries `mount_point=""`.
pub const DISK_USAGE_PERCENT: &str = "pika_disk_usage_percent";

/// Per-interface transmit rate in bytes per second. Labelled with
/// `interface`. Whole-host rates are computed at query time with `sum()`.
pub const NETWORK_SENT_BYTES_RATE: &str = "pika_network_sent_bytes_rate";

/// Per-interface receive rate in bytes per second. Labelled with
/// `interface`. Whole-host rates are computed at query time with `sum()`.
pub const NETWORK_RECV_BYTES_RATE: &str = "pika_network_recv_bytes_rate";

/// Cumulative bytes transmitted since interface counters last reset.
pub const NETWORK_SENT_BYTES_TOTAL: &str = "pika_network_sent_bytes_total";

/// Cumulative bytes received since interface counters last reset.
pub const NETWORK_RECV_BYTES_TOTAL: &str = "pika_network_recv_bytes_total";

pub const NETWORK_CONN_ESTABLISHED: &str = "pika_network_conn_established";
pub const NETWORK_CONN_TIME_WAIT: &str = "pika_network_conn_time_wait";
pub const NETWORK_CONN_CLOSE_WAIT: &str = "pika_network_conn_close_wait";
pub const NETWORK_CONN_LISTEN: &str = "pika_network_conn_listen";
pub const NETWORK_CONN_TOTAL: &str = "pika_network_conn_total";

/// Per-device read throughput in bytes per second. Labelled with `device`.
pub const DISK_READ_BYTES_RATE: &str = "pika_disk_read_bytes_rate";

/// Per-device write throughput in bytes per second. Labelled with `device`.
pub const DISK_WRITE_BYTES_RATE: &str = "pika_disk_write_bytes_rate";

/// GPU compute utilization percentage. Labelled with `gpu_index`.
pub const GPU_UTILIZATION_PERCENT: &str = "pika_gpu_utilization_percent";

/// GPU core temperature in degrees Celsius. Labelled with `gpu_index`.
pub const GPU_TEMPERATURE_CELSIUS: &str = "pika_gpu_temperature_celsius";

/// GPU memory in use, bytes. Labelled with `gpu_index`.
pub const GPU_MEMORY_USED_BYTES: &str = "pika_gpu_memory_used_bytes";

/// Total GPU memory, bytes. Labelled with `gpu_index`.
pub const GPU_MEMORY_TOTAL_BYTES: &str = "pika_gpu_memory_total_bytes";

/// Hardware sensor temperature. Labelled with `sensor_key` and
/// `sensor_label`.
pub const TEMPERATURE_CELSIUS: &str = "pika_temperature_celsius";

/// HTTP monitor probe latency in milliseconds. Labelled with `monitor_id`.
pub const MONITOR_RESPONSE_TIME_MS: &str = "pika_monitor_response_time_ms";

/// Monitor probe outcome: 1 = up, 0 = down. Labelled with `monitor_id`.
pub const MONITOR_STATUS: &str = "pika_monitor_status";

/// Days until the probed certificate expires. Labelled with `monitor_id`.
pub const MONITOR_CERT_DAYS_LEFT: &str = "pika_monitor_cert_days_left";

/// Certificate expiry instant as Unix milliseconds. Labelled with
/// `monitor_id`.
pub const MONITOR_CERT_EXPIRY_TIMESTAMP_MS: &str = "pika_monitor_cert_expiry_timestamp_ms";

// ============================================================================
// Label keys
// ============================================================================

pub const LABEL_AGENT_ID: &str = "agent_id";
pub const LABEL_MOUNT_POINT: &str = "mount_point";
pub const LABEL_INTERFACE: &str = "interface";
pub const LABEL_DEVICE: &str = "device";
pub const LABEL_GPU_INDEX: &str = "gpu_index";
pub const LABEL_SENSOR_KEY: &str = "sensor_key";
pub const LABEL_SENSOR_LABEL: &str = "sensor_label";
pub const LABEL_MONITOR_ID: &str = "monitor_id";

/// Carried on [`MONITOR_STATUS`] series so the probe verdict survives as a
/// string alongside the numeric sample.
pub const LABEL_STATUS: &str = "status";

/// Label the storage engine itself attaches to identify the series; stripped
/// during reassembly because the query definition already names the series.
pub const LABEL_SERIES_NAME: &str = "__name__";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_series_share_the_prefix() {
        let names = [
            CPU_USAGE_PERCENT,
            MEMORY_USAGE_PERCENT,
            DISK_USAGE_PERCENT,
            NETWORK_SENT_BYTES_RATE,
            NETWORK_RECV_BYTES_RATE,
            NETWORK_SENT_BYTES_TOTAL,
            NETWORK_RECV_BYTES_TOTAL,
            NETWORK_CONN_ESTABLISHED,
            NETWORK_CONN_TIME_WAIT,
            NETWORK_CONN_CLOSE_WAIT,
            NETWORK_CONN_LISTEN,
            NETWORK_CONN_TOTAL,
            DISK_READ_BYTES_RATE,
            DISK_WRITE_BYTES_RATE,
            GPU_UTILIZATION_PERCENT,
            GPU_TEMPERATURE_CELSIUS,
            GPU_MEMORY_USED_BYTES,
            GPU_MEMORY_TOTAL_BYTES,
            TEMPERATURE_CELSIUS,
            MONITOR_RESPONSE_TIME_MS,
            MONITOR_STATUS,
            MONITOR_CERT_DAYS_LEFT,
            MONITOR_CERT_EXPIRY_TIMESTAMP_MS,
        ];
        for name in names {
            assert!(name.starts_with(SERIES_PREFIX), "{name}");
        }
    }

    #[test]
    fn test_monitor_series_share_the_monitor_prefix() {
        for name in [
            MONITOR_RESPONSE_TIME_MS,
            MONITOR_STATUS,
            MONITOR_CERT_DAYS_LEFT,
            MONITOR_CERT_EXPIRY_TIMESTAMP_MS,
        ] {
            assert!(name.starts_with(MONITOR_SERIES_PREFIX), "{name}");
        }
    }
}
