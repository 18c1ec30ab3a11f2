use crate::db::DatabaseError;
use crate::models::{Agent, AgentStatus, TamperProtectConfig, TrafficStats};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use super::Repository;

pub struct AgentRepository {
    pool: PgPool,
}

impl AgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, agent: &Agent) -> Result<Agent, DatabaseError> {
        let record = sqlx::query_as::<_, Agent>(
            r#"
            INSERT INTO agents (id, name, os, arch, version, ip, hostname, status,
                                last_seen_at, created_at, traffic_stats, tamper_protect_config)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, name, os, arch, version, ip, hostname, status,
                      last_seen_at, created_at, traffic_stats, tamper_protect_config
            "#,
        )
        .bind(&agent.id)
        .bind(&agent.name)
        .bind(&agent.os)
        .bind(&agent.arch)
        .bind(&agent.version)
        .bind(&agent.ip)
        .bind(&agent.hostname)
        .bind(agent.status)
        .bind(agent.last_seen_at)
        .bind(agent.created_at)
        .bind(&agent.traffic_stats)
        .bind(&agent.tamper_protect_config)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn update_status(
        &self,
        agent_id: &str,
        status: AgentStatus,
        last_seen_at: i64,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE agents SET status = $2, last_seen_at = $3 WHERE id = $1")
            .bind(agent_id)
            .bind(status)
            .bind(last_seen_at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Overwrites the agent's traffic accounting state with `stats`.
    pub async fn update_traffic_stats(
        &self,
        agent_id: &str,
        stats: &TrafficStats,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE agents SET traffic_stats = $2 WHERE id = $1")
            .bind(agent_id)
            .bind(Json(stats))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns `None` when the agent row does not exist.
    pub async fn get_tamper_protect_config(
        &self,
        agent_id: &str,
    ) -> Result<Option<TamperProtectConfig>, DatabaseError> {
        let record: Option<(Json<TamperProtectConfig>,)> =
            sqlx::query_as("SELECT tamper_protect_config FROM agents WHERE id = $1")
                .bind(agent_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(record.map(|(config,)| config.0))
    }

    pub async fn update_tamper_protect_config(
        &self,
        agent_id: &str,
        config: &TamperProtectConfig,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE agents SET tamper_protect_config = $2 WHERE id = $1")
            .bind(agent_id)
            .bind(Json(config))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM agents")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[async_trait]
impl Repository for AgentRepository {
    type Entity = Agent;
    type Id = String;

    async fn get_by_id(&self, id: String) -> Result<Option<Agent>, DatabaseError> {
        let record = sqlx::query_as::<_, Agent>(
            r#"
            SELECT id, name, os, arch, version, ip, hostname, status,
                   last_seen_at, created_at, traffic_stats, tamper_protect_config
            FROM agents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_all(&self) -> Result<Vec<Agent>, DatabaseError> {
        let records = sqlx::query_as::<_, Agent>(
            r#"
            SELECT id, name, os, arch, version, ip, hostname, status,
                   last_seen_at, created_at, traffic_stats, tamper_protect_config
            FROM agents
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn delete(&self, id: String) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
