use crate::db::DatabaseError;
use crate::models::HostMetric;
use sqlx::PgPool;

pub struct HostMetricRepository {
    pool: PgPool,
}

impl HostMetricRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One row per agent. Repeated reports overwrite the previous snapshot.
    pub async fn upsert(&self, metric: &HostMetric) -> Result<HostMetric, DatabaseError> {
        let record = sqlx::query_as::<_, HostMetric>(
            r#"
            INSERT INTO host_metrics (agent_id, os, platform, platform_version, kernel_version,
                                      kernel_arch, uptime, boot_time, procs, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (agent_id) DO UPDATE SET
                os = EXCLUDED.os,
                platform = EXCLUDED.platform,
                platform_version = EXCLUDED.platform_version,
                kernel_version = EXCLUDED.kernel_version,
                kernel_arch = EXCLUDED.kernel_arch,
                uptime = EXCLUDED.uptime,
                boot_time = EXCLUDED.boot_time,
                procs = EXCLUDED.procs,
                timestamp = EXCLUDED.timestamp
            RETURNING agent_id, os, platform, platform_version, kernel_version,
                      kernel_arch, uptime, boot_time, procs, timestamp
            "#,
        )
        .bind(&metric.agent_id)
        .bind(&metric.os)
        .bind(&metric.platform)
        .bind(&metric.platform_version)
        .bind(&metric.kernel_version)
        .bind(&metric.kernel_arch)
        .bind(metric.uptime)
        .bind(metric.boot_time)
        .bind(metric.procs)
        .bind(metric.timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_by_agent(&self, agent_id: &str) -> Result<Option<HostMetric>, DatabaseError> {
        let record = sqlx::query_as::<_, HostMetric>(
            r#"
            SELECT agent_id, os, platform, platform_version, kernel_version,
                   kernel_arch, uptime, boot_time, procs, timestamp
            FROM host_metrics
            WHERE agent_id = $1
            "#,
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn delete_by_agent(&self, agent_id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM host_metrics WHERE agent_id = $1")
            .bind(agent_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::HostMetric;
    use pika_protocol::HostInfoData;

    #[test]
    fn test_host_metric_from_report() {
        let report = HostInfoData {
            os: "linux".to_string(),
            platform: "debian".to_string(),
            platform_version: "12".to_string(),
            kernel_version: "6.1.0".to_string(),
            kernel_arch: "x86_64".to_string(),
            uptime: 3600,
            boot_time: 1_700_000_000,
            procs: 214,
        };

        let metric = HostMetric::from_report("agent-1", &report, 1_700_003_600_000);

        assert_eq!(metric.agent_id, "agent-1");
        assert_eq!(metric.procs, 214);
        assert_eq!(metric.timestamp, 1_700_003_600_000);
    }
}
