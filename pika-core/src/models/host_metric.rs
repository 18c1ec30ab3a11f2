use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use pika_protocol::HostInfoData;

/// Low-frequency host facts, kept relationally (one row per agent) rather
/// than in the time-series store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HostMetric {
    pub agent_id: String,
    pub os: String,
    pub platform: String,
    pub platform_version: String,
    pub kernel_version: String,
    pub kernel_arch: String,
    /// Seconds since boot.
    pub uptime: i64,
    /// Unix seconds of the last boot.
    pub boot_time: i64,
    pub procs: i64,
    /// When the server received this snapshot, Unix ms.
    pub timestamp: i64,
}

impl HostMetric {
    pub fn from_report(agent_id: impl Into<String>, data: &HostInfoData, timestamp: i64) -> Self {
        Self {
            agent_id: agent_id.into(),
            os: data.os.clone(),
            platform: data.platform.clone(),
            platform_version: data.platform_version.clone(),
            kernel_version: data.kernel_version.clone(),
            kernel_arch: data.kernel_arch.clone(),
            uptime: data.uptime as i64,
            boot_time: data.boot_time as i64,
            procs: data.procs as i64,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_report() {
        let data = HostInfoData {
            os: "linux".to_string(),
            platform: "debian".to_string(),
            platform_version: "12".to_string(),
            kernel_version: "6.1.0".to_string(),
            kernel_arch: "x86_64".to_string(),
            uptime: 3600,
            boot_time: 1_700_000_000,
            procs: 142,
        };

        let metric = HostMetric::from_report("agent-1", &data, 1_700_003_600_000);

        assert_eq!(metric.agent_id, "agent-1");
        assert_eq!(metric.os, "linux");
        assert_eq!(metric.uptime, 3600);
        assert_eq!(metric.procs, 142);
        assert_eq!(metric.timestamp, 1_700_003_600_000);
    }
}
