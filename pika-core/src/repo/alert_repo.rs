use crate::db::DatabaseError;
use crate::models::AlertRecord;
use sqlx::PgPool;

pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, alert: &AlertRecord) -> Result<AlertRecord, DatabaseError> {
        let record = sqlx::query_as::<_, AlertRecord>(
            r#"
            INSERT INTO alert_records (id, agent_id, agent_name, alert_type, message,
                                       threshold, actual_value, level, status, fired_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, agent_id, agent_name, alert_type, message,
                      threshold, actual_value, level, status, fired_at, created_at
            "#,
        )
        .bind(alert.id)
        .bind(&alert.agent_id)
        .bind(&alert.agent_name)
        .bind(&alert.alert_type)
        .bind(&alert.message)
        .bind(alert.threshold)
        .bind(alert.actual_value)
        .bind(alert.level)
        .bind(&alert.status)
        .bind(alert.fired_at)
        .bind(alert.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_by_agent(
        &self,
        agent_id: &str,
        limit: i64,
    ) -> Result<Vec<AlertRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, AlertRecord>(
            r#"
            SELECT id, agent_id, agent_name, alert_type, message,
                   threshold, actual_value, level, status, fired_at, created_at
            FROM alert_records
            WHERE agent_id = $1
            ORDER BY fired_at DESC
            LIMIT $2
            "#,
        )
        .bind(agent_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
