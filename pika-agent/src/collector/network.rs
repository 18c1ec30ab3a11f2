use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use sysinfo::Networks;
use tokio::sync::Mutex;

use pika_protocol::{MetricType, NetworkData};

use crate::collector::Collector;
use crate::error::AgentResult;

struct Sample {
    at: Instant,
    /// interface -> (sent_total, recv_total), cumulative kernel counters.
    totals: HashMap<String, (u64, u64)>,
}

/// Reports per-interface cumulative counters plus rates derived from the
/// previous sample. The first cycle has no previous sample and reports zero
/// rates.
pub struct NetworkCollector {
    last: Mutex<Option<Sample>>,
}

impl NetworkCollector {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Collector for NetworkCollector {
    fn metric_type(&self) -> MetricType {
        MetricType::Network
    }

    async fn collect(&self) -> AgentResult<serde_json::Value> {
        let networks = Networks::new_with_refreshed_list();
        let now = Instant::now();

        let mut totals: HashMap<String, (u64, u64)> = HashMap::new();
        for (name, data) in networks.iter() {
            totals.insert(name.clone(), (data.total_transmitted(), data.total_received()));
        }

        let mut last = self.last.lock().await;
        let elapsed_secs = last
            .as_ref()
            .map(|sample| now.duration_since(sample.at).as_secs_f64());

        let mut out = Vec::with_capacity(totals.len());
        for (name, (sent_total, recv_total)) in &totals {
            let (sent_rate, recv_rate) = match (last.as_ref(), elapsed_secs) {
                (Some(prev), Some(secs)) if secs > 0.0 => match prev.totals.get(name) {
                    Some((prev_sent, prev_recv)) => (
                        sent_total.saturating_sub(*prev_sent) as f64 / secs,
                        recv_total.saturating_sub(*prev_recv) as f64 / secs,
                    ),
                    None => (0.0, 0.0),
                },
                _ => (0.0, 0.0),
            };

            out.push(NetworkData {
                interface: name.clone(),
                bytes_sent_rate: sent_rate,
                bytes_recv_rate: recv_rate,
                bytes_sent_total: *sent_total,
                bytes_recv_total: *recv_total,
            });
        }
        out.sort_by(|a, b| a.interface.cmp(&b.interface));

        *last = Some(Sample { at: now, totals });
        Ok(serde_json::to_value(out)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_sample_has_zero_rates() {
        let collector = NetworkCollector::new();
        let value = collector.collect().await.unwrap();
        let data: Vec<NetworkData> = serde_json::from_value(value).unwrap();

        for iface in &data {
            assert_eq!(iface.bytes_sent_rate, 0.0);
            assert_eq!(iface.bytes_recv_rate, 0.0);
        }
    }

    #[tokio::test]
    async fn test_second_sample_reports_totals() {
        let collector = NetworkCollector::new();
        collector.collect().await.unwrap();
        let value = collector.collect().await.unwrap();
        let data: Vec<NetworkData> = serde_json::from_value(value).unwrap();

        // totals are cumulative, rates can never be negative
        for iface in &data {
            assert!(iface.bytes_sent_rate >= 0.0);
            assert!(iface.bytes_recv_rate >= 0.0);
        }
    }
}
