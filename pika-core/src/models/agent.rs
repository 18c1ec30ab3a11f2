use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::{TamperProtectConfig, TrafficStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "agent_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Online,
    Offline,
    Unknown,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Online => write!(f, "online"),
            AgentStatus::Offline => write!(f, "offline"),
            AgentStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// One registered probe host. Traffic accounting state and the tamper
/// protection config ride along as JSONB columns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub os: String,
    pub arch: String,
    pub version: String,
    pub ip: String,
    pub hostname: String,
    pub status: AgentStatus,
    /// Unix ms of the last report or heartbeat; 0 before first contact.
    pub last_seen_at: i64,
    /// Unix ms.
    pub created_at: i64,
    pub traffic_stats: Json<TrafficStats>,
    pub tamper_protect_config: Json<TamperProtectConfig>,
}

impl Agent {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            os: String::new(),
            arch: String::new(),
            version: String::new(),
            ip: String::new(),
            hostname: String::new(),
            status: AgentStatus::Unknown,
            last_seen_at: 0,
            created_at: Utc::now().timestamp_millis(),
            traffic_stats: Json(TrafficStats::default()),
            tamper_protect_config: Json(TamperProtectConfig::default()),
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == AgentStatus::Online
    }
}
