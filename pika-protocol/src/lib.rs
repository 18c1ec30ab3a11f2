//! Wire types shared by the Pika agent and server.
//!
//! Everything that crosses the agent/server connection is an
//! [`OutboundMessage`] envelope: a stable string tag plus a JSON body. The
//! tags and field names are part of the wire contract and must not change
//! between releases; agents and servers of different versions interoperate
//! through them.

pub mod metrics;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use metrics::{
    CpuData, DiskData, DiskIoData, GpuData, HostInfoData, MemoryData, MetricType, MonitorData,
    NetworkConnectionData, NetworkData, ParseMetricTypeError, TemperatureData,
};

/// Stable message tags. Serialized as kebab-case strings on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    /// Agent -> server: one metric payload of a given [`MetricType`].
    MetricReport,
    /// Server -> agent: incremental tamper-protection path update.
    TamperProtectConfig,
    /// Agent -> server: a file-tampering observation.
    TamperEvent,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::MetricReport => write!(f, "metric-report"),
            MessageType::TamperProtectConfig => write!(f, "tamper-protect-config"),
            MessageType::TamperEvent => write!(f, "tamper-event"),
        }
    }
}

/// The envelope for every message either side sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub data: serde_json::Value,
}

impl OutboundMessage {
    pub fn new(kind: MessageType, data: impl Serialize) -> serde_json::Result<Self> {
        Ok(Self {
            kind,
            data: serde_json::to_value(data)?,
        })
    }

    pub fn metric_report(report: &MetricReport) -> serde_json::Result<Self> {
        Self::new(MessageType::MetricReport, report)
    }

    pub fn tamper_protect_config(push: &TamperConfigPush) -> serde_json::Result<Self> {
        Self::new(MessageType::TamperProtectConfig, push)
    }

    /// Decodes the body into a concrete type. The caller is expected to have
    /// matched on [`Self::kind`] first.
    pub fn decode_data<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.data.clone())
    }
}

/// Body of a `metric-report` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReport {
    pub agent_id: String,
    /// Kept as a plain string so an older server can still route or skip
    /// types it does not know about.
    pub metric_type: String,
    pub data: serde_json::Value,
}

impl MetricReport {
    pub fn new(agent_id: impl Into<String>, metric_type: MetricType, data: impl Serialize) -> serde_json::Result<Self> {
        Ok(Self {
            agent_id: agent_id.into(),
            metric_type: metric_type.as_str().to_string(),
            data: serde_json::to_value(data)?,
        })
    }
}

/// Body of a `tamper-protect-config` push: only the paths that changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TamperConfigPush {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl TamperConfigPush {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_wire_tags() {
        assert_eq!(
            serde_json::to_string(&MessageType::MetricReport).unwrap(),
            "\"metric-report\""
        );
        assert_eq!(
            serde_json::to_string(&MessageType::TamperProtectConfig).unwrap(),
            "\"tamper-protect-config\""
        );
        assert_eq!(
            serde_json::to_string(&MessageType::TamperEvent).unwrap(),
            "\"tamper-event\""
        );
    }

    #[test]
    fn test_envelope_round_trip() {
        let report = MetricReport::new("agent-1", MetricType::Cpu, serde_json::json!({"usagePercent": 12.5}))
            .unwrap();
        let msg = OutboundMessage::metric_report(&report).unwrap();

        let encoded = serde_json::to_string(&msg).unwrap();
        assert!(encoded.contains("\"type\":\"metric-report\""));

        let decoded: OutboundMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, msg);

        let body: MetricReport = decoded.decode_data().unwrap();
        assert_eq!(body.agent_id, "agent-1");
        assert_eq!(body.metric_type, "cpu");
    }

    #[test]
    fn test_tamper_push_empty() {
        assert!(TamperConfigPush::default().is_empty());
        let push = TamperConfigPush {
            added: vec!["/etc/passwd".to_string()],
            removed: vec![],
        };
        assert!(!push.is_empty());
    }
}
