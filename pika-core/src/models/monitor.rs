use serde::{Deserialize, Serialize};
use std::fmt;

/// Reachability verdict of a service check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

impl MonitorStatus {
    /// Status as carried on the series label. Anything unrecognized maps to
    /// `Unknown` rather than failing the row.
    pub fn from_label(value: &str) -> Self {
        match value {
            "up" => MonitorStatus::Up,
            "down" => MonitorStatus::Down,
            _ => MonitorStatus::Unknown,
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStatus::Up => write!(f, "up"),
            MonitorStatus::Down => write!(f, "down"),
            MonitorStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Aggregate of one monitor across every agent probing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStats {
    pub status: MonitorStatus,
    /// Mean of the response times reported this round, in milliseconds.
    pub response_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_expiry_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_expiry_days: Option<i64>,
    pub agent_count: usize,
    /// Unix milliseconds of the newest observation across agents.
    pub last_check_time: i64,
}

/// One agent's latest view of a monitor, before aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorAgentStat {
    pub agent_id: String,
    pub status: MonitorStatus,
    /// `None` when the agent reported no response time this round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<i64>,
    pub last_check_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_expiry_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_expiry_days: Option<i64>,
}

impl MonitorAgentStat {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_label() {
        assert_eq!(MonitorStatus::from_label("up"), MonitorStatus::Up);
        assert_eq!(MonitorStatus::from_label("down"), MonitorStatus::Down);
        assert_eq!(MonitorStatus::from_label(""), MonitorStatus::Unknown);
        assert_eq!(MonitorStatus::from_label("flapping"), MonitorStatus::Unknown);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MonitorStatus::Up).unwrap(), "\"up\"");
        assert_eq!(MonitorStatus::Down.to_string(), "down");
    }

    #[test]
    fn test_stats_default_is_unknown() {
        let stats = MonitorStats::default();
        assert_eq!(stats.status, MonitorStatus::Unknown);
        assert_eq!(stats.agent_count, 0);

        let v = serde_json::to_value(&stats).unwrap();
        assert!(v.get("certExpiryDate").is_none());
        assert_eq!(v["lastCheckTime"], 0);
    }
}
