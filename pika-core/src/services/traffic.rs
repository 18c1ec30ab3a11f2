//! Applies receive-counter samples to per-agent traffic accounting and
//! records threshold alerts.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::error::PikaResult;
use crate::models::{Agent, AlertRecord, ThresholdCrossing, TrafficObservation, TrafficStats};
use crate::repo::{AgentRepository, AlertRepository, Repository};

pub struct TrafficService {
    agent_repo: AgentRepository,
    alert_repo: AlertRepository,
}

impl TrafficService {
    pub fn new(agent_repo: AgentRepository, alert_repo: AlertRepository) -> Self {
        Self {
            agent_repo,
            alert_repo,
        }
    }

    /// Folds one cumulative receive-counter sample into the agent's traffic
    /// accounting and records an alert per threshold crossed.
    ///
    /// Samples for unknown agents and agents with accounting unconfigured are
    /// skipped. A failed alert write is logged but does not re-arm the
    /// threshold; the crossing stays latched for the period.
    pub async fn update(&self, agent_id: &str, current_recv_total: u64) -> PikaResult<()> {
        let Some(agent) = self.agent_repo.get_by_id(agent_id.to_string()).await? else {
            debug!(agent_id, "Traffic sample for unknown agent");
            return Ok(());
        };

        let mut stats = agent.traffic_stats.0.clone();
        let now_ms = Utc::now().timestamp_millis();

        match stats.observe(now_ms, current_recv_total) {
            TrafficObservation::Disabled => return Ok(()),
            TrafficObservation::Anchored => {
                debug!(agent_id, baseline = current_recv_total, "Traffic baseline anchored");
            }
            TrafficObservation::Accounted {
                rolled_over,
                counter_reset,
                crossings,
            } => {
                if rolled_over {
                    info!(agent_id, period_start = stats.period_start, "Traffic period rolled over");
                }
                if counter_reset {
                    info!(agent_id, "Receive counter went backwards, baseline re-anchored");
                }
                for crossing in &crossings {
                    self.record_crossing(&agent, &stats, crossing).await;
                }
            }
        }

        self.agent_repo.update_traffic_stats(agent_id, &stats).await?;
        Ok(())
    }

    async fn record_crossing(
        &self,
        agent: &Agent,
        stats: &TrafficStats,
        crossing: &ThresholdCrossing,
    ) {
        let record = AlertRecord::traffic(
            agent.id.as_str(),
            agent.name.as_str(),
            traffic_alert_message(crossing, stats),
            crossing.threshold,
            crossing.percent,
            crossing.level,
        );

        match self.alert_repo.create(&record).await {
            Ok(_) => warn!(
                agent_id = %agent.id,
                threshold = crossing.threshold,
                percent = format!("{:.2}", crossing.percent),
                "Traffic threshold crossed"
            ),
            Err(err) => error!(
                agent_id = %agent.id,
                threshold = crossing.threshold,
                error = %err,
                "Failed to record traffic alert"
            ),
        }
    }
}

fn traffic_alert_message(crossing: &ThresholdCrossing, stats: &TrafficStats) -> String {
    format!(
        "Traffic usage reached {}%, currently at {:.2}% ({}/{})",
        crossing.threshold,
        crossing.percent,
        format_bytes(stats.used),
        format_bytes(stats.limit)
    )
}

/// Binary units, two decimals from KiB upward.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const SUFFIXES: [&str; 6] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.2} {}", bytes as f64 / div as f64, SUFFIXES[exp])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertLevel;

    const GIB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn test_format_bytes_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KiB");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MiB");
        assert_eq!(format_bytes(100 * GIB), "100.00 GiB");
        assert_eq!(format_bytes(3 * 1024 * GIB), "3.00 TiB");
    }

    #[test]
    fn test_alert_message_shows_usage_and_limit() {
        let stats = TrafficStats {
            limit: 100 * GIB,
            used: 85 * GIB,
            ..Default::default()
        };
        let crossing = ThresholdCrossing {
            threshold: 80,
            level: AlertLevel::Info,
            percent: 85.0,
        };

        assert_eq!(
            traffic_alert_message(&crossing, &stats),
            "Traffic usage reached 80%, currently at 85.00% (85.00 GiB/100.00 GiB)"
        );
    }
}
