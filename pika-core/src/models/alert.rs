use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "alert_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "info"),
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

/// A fired alert, persisted for the notification pipeline to pick up.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: Uuid,
    pub agent_id: String,
    pub agent_name: String,
    /// Category of the alert, e.g. "traffic".
    pub alert_type: String,
    pub message: String,
    /// Configured trigger threshold, percent.
    pub threshold: f64,
    /// Measured value at firing time, percent.
    pub actual_value: f64,
    pub level: AlertLevel,
    /// Lifecycle state; records are created "firing".
    pub status: String,
    /// Unix ms.
    pub fired_at: i64,
    /// Unix ms.
    pub created_at: i64,
}

impl AlertRecord {
    /// A traffic-limit alert for the given agent, stamped with the current
    /// time.
    pub fn traffic(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        message: impl Into<String>,
        threshold: u32,
        actual_value: f64,
        level: AlertLevel,
    ) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            alert_type: "traffic".to_string(),
            message: message.into(),
            threshold: f64::from(threshold),
            actual_value,
            level,
            status: "firing".to_string(),
            fired_at: now,
            created_at: now,
        }
    }
}
