//! Metric collectors backed by [`sysinfo`]. Each one produces the wire
//! payload for a single metric category once per reporting cycle.

mod disk;
mod network;
mod system;

pub use disk::DiskCollector;
pub use network::NetworkCollector;
pub use system::{CpuCollector, HostCollector, MemoryCollector};

use std::sync::Arc;

use async_trait::async_trait;

use pika_protocol::MetricType;

use crate::config::AgentConfig;
use crate::error::AgentResult;

/// Produces one metric payload per reporting cycle.
#[async_trait]
pub trait Collector: Send + Sync {
    fn metric_type(&self) -> MetricType;

    /// The payload exactly as it goes into a `metric-report` body.
    async fn collect(&self) -> AgentResult<serde_json::Value>;
}

/// The standard collector set for a host agent. CPU, memory, and host info
/// share one [`sysinfo::System`] behind a lock.
pub fn default_collectors(config: &AgentConfig) -> Vec<Arc<dyn Collector>> {
    let system = system::shared_system();
    vec![
        Arc::new(CpuCollector::new(Arc::clone(&system))),
        Arc::new(MemoryCollector::new(Arc::clone(&system))),
        Arc::new(HostCollector::new(system)),
        Arc::new(DiskCollector::new(config.disk_include.clone())),
        Arc::new(NetworkCollector::new()),
    ]
}
