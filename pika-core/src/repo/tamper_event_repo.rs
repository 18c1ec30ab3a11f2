use crate::db::DatabaseError;
use crate::models::TamperEvent;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::Repository;

pub struct TamperEventRepository {
    pool: PgPool,
}

impl TamperEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create(&self, event: &TamperEvent) -> Result<TamperEvent, DatabaseError> {
        let record = sqlx::query_as::<_, TamperEvent>(
            r#"
            INSERT INTO tamper_events (id, agent_id, path, operation, details, timestamp, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, agent_id, path, operation, details, timestamp, created_at
            "#,
        )
        .bind(event.id)
        .bind(&event.agent_id)
        .bind(&event.path)
        .bind(event.operation)
        .bind(&event.details)
        .bind(event.timestamp)
        .bind(event.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    /// Newest events first. `limit` and `offset` are applied as given.
    pub async fn get_page_by_agent(
        &self,
        agent_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TamperEvent>, DatabaseError> {
        let records = sqlx::query_as::<_, TamperEvent>(
            r#"
            SELECT id, agent_id, path, operation, details, timestamp, created_at
            FROM tamper_events
            WHERE agent_id = $1
            ORDER BY timestamp DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(agent_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn count_by_agent(&self, agent_id: &str) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tamper_events WHERE agent_id = $1")
            .bind(agent_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    /// Removes events with `timestamp` strictly before `before_ms`.
    pub async fn delete_before(&self, before_ms: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM tamper_events WHERE timestamp < $1")
            .bind(before_ms)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Repository for TamperEventRepository {
    type Entity = TamperEvent;
    type Id = Uuid;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<TamperEvent>, DatabaseError> {
        let record = sqlx::query_as::<_, TamperEvent>(
            r#"
            SELECT id, agent_id, path, operation, details, timestamp, created_at
            FROM tamper_events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_all(&self) -> Result<Vec<TamperEvent>, DatabaseError> {
        let records = sqlx::query_as::<_, TamperEvent>(
            r#"
            SELECT id, agent_id, path, operation, details, timestamp, created_at
            FROM tamper_events
            ORDER BY timestamp DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM tamper_events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TamperOperation;

    #[test]
    fn test_tamper_event_fields() {
        let event = TamperEvent::new(
            "agent-1".to_string(),
            "/etc/passwd".to_string(),
            TamperOperation::Write,
            "mode 0644 -> 0666".to_string(),
            1_700_000_000_000,
        );

        assert_eq!(event.agent_id, "agent-1");
        assert_eq!(event.operation, TamperOperation::Write);
        assert!(event.created_at > 0);
    }
}
