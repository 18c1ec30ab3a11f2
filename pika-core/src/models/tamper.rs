use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// File-tamper protection settings, stored as JSONB on the agent row. The
/// full path set lives here; agents only ever receive incremental diffs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TamperProtectConfig {
    pub enabled: bool,
    pub paths: Vec<String>,
}

/// Filesystem operation an agent's watcher observed on a protected path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tamper_operation", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TamperOperation {
    Write,
    Remove,
    Rename,
    Chmod,
    Create,
}

impl std::fmt::Display for TamperOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TamperOperation::Write => write!(f, "write"),
            TamperOperation::Remove => write!(f, "remove"),
            TamperOperation::Rename => write!(f, "rename"),
            TamperOperation::Chmod => write!(f, "chmod"),
            TamperOperation::Create => write!(f, "create"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TamperEvent {
    pub id: Uuid,
    pub agent_id: String,
    pub path: String,
    pub operation: TamperOperation,
    pub details: String,
    /// When the operation happened on the agent, Unix ms.
    pub timestamp: i64,
    /// When the server recorded it, Unix ms.
    pub created_at: i64,
}

impl TamperEvent {
    pub fn new(
        agent_id: impl Into<String>,
        path: impl Into<String>,
        operation: TamperOperation,
        details: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            path: path.into(),
            operation,
            details: details.into(),
            timestamp,
            created_at: Utc::now().timestamp_millis(),
        }
    }
}
