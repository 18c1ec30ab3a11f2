//! Relational persistence over PostgreSQL.
//!
//! Expected schema (timestamps are Unix milliseconds in BIGINT columns):
//!
//! ```sql
//! CREATE TYPE agent_status AS ENUM ('online', 'offline', 'unknown');
//! CREATE TYPE alert_level AS ENUM ('info', 'warning', 'critical');
//! CREATE TYPE tamper_operation AS ENUM ('write', 'remove', 'rename', 'chmod', 'create');
//!
//! CREATE TABLE agents (
//!     id                    TEXT PRIMARY KEY,
//!     name                  TEXT NOT NULL,
//!     os                    TEXT NOT NULL DEFAULT '',
//!     arch                  TEXT NOT NULL DEFAULT '',
//!     version               TEXT NOT NULL DEFAULT '',
//!     ip                    TEXT NOT NULL DEFAULT '',
//!     hostname              TEXT NOT NULL DEFAULT '',
//!     status                agent_status NOT NULL DEFAULT 'unknown',
//!     last_seen_at          BIGINT NOT NULL DEFAULT 0,
//!     created_at            BIGINT NOT NULL,
//!     traffic_stats         JSONB NOT NULL DEFAULT '{}',
//!     tamper_protect_config JSONB NOT NULL DEFAULT '{}'
//! );
//!
//! CREATE TABLE alert_records (
//!     id           UUID PRIMARY KEY,
//!     agent_id     TEXT NOT NULL,
//!     agent_name   TEXT NOT NULL,
//!     alert_type   TEXT NOT NULL,
//!     message      TEXT NOT NULL,
//!     threshold    DOUBLE PRECISION NOT NULL,
//!     actual_value DOUBLE PRECISION NOT NULL,
//!     level        alert_level NOT NULL,
//!     status       TEXT NOT NULL,
//!     fired_at     BIGINT NOT NULL,
//!     created_at   BIGINT NOT NULL
//! );
//! CREATE INDEX idx_alert_records_agent ON alert_records (agent_id, fired_at DESC);
//!
//! CREATE TABLE host_metrics (
//!     agent_id         TEXT PRIMARY KEY,
//!     os               TEXT NOT NULL DEFAULT '',
//!     platform         TEXT NOT NULL DEFAULT '',
//!     platform_version TEXT NOT NULL DEFAULT '',
//!     kernel_version   TEXT NOT NULL DEFAULT '',
//!     kernel_arch      TEXT NOT NULL DEFAULT '',
//!     uptime           BIGINT NOT NULL DEFAULT 0,
//!     boot_time        BIGINT NOT NULL DEFAULT 0,
//!     procs            BIGINT NOT NULL DEFAULT 0,
//!     timestamp        BIGINT NOT NULL
//! );
//!
//! CREATE TABLE tamper_events (
//!     id         UUID PRIMARY KEY,
//!     agent_id   TEXT NOT NULL,
//!     path       TEXT NOT NULL,
//!     operation  tamper_operation NOT NULL,
//!     details    TEXT NOT NULL DEFAULT '',
//!     timestamp  BIGINT NOT NULL,
//!     created_at BIGINT NOT NULL
//! );
//! CREATE INDEX idx_tamper_events_agent ON tamper_events (agent_id, timestamp DESC);
//! CREATE INDEX idx_tamper_events_timestamp ON tamper_events (timestamp);
//! ```

pub mod agent_repo;
pub mod alert_repo;
pub mod host_metric_repo;
pub mod tamper_event_repo;

pub use agent_repo::AgentRepository;
pub use alert_repo::AlertRepository;
pub use host_metric_repo::HostMetricRepository;
pub use tamper_event_repo::TamperEventRepository;

use crate::db::DatabaseError;
use async_trait::async_trait;

#[async_trait]
pub trait Repository {
    type Entity;
    type Id;

    async fn get_by_id(&self, id: Self::Id) -> Result<Option<Self::Entity>, DatabaseError>;
    async fn get_all(&self) -> Result<Vec<Self::Entity>, DatabaseError>;
    async fn delete(&self, id: Self::Id) -> Result<bool, DatabaseError>;
}
