use std::sync::Arc;

use async_trait::async_trait;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};
use tokio::sync::RwLock;

use pika_protocol::{CpuData, HostInfoData, MemoryData, MetricType};

use crate::collector::Collector;
use crate::error::AgentResult;

pub(crate) fn shared_system() -> Arc<RwLock<System>> {
    Arc::new(RwLock::new(System::new_with_specifics(
        RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything()),
    )))
}

pub struct CpuCollector {
    system: Arc<RwLock<System>>,
}

impl CpuCollector {
    pub fn new(system: Arc<RwLock<System>>) -> Self {
        Self { system }
    }
}

#[async_trait]
impl Collector for CpuCollector {
    fn metric_type(&self) -> MetricType {
        MetricType::Cpu
    }

    async fn collect(&self) -> AgentResult<serde_json::Value> {
        let mut system = self.system.write().await;
        system.refresh_cpu_all();

        let data = CpuData {
            usage_percent: system.global_cpu_usage() as f64,
            logical_cores: system.cpus().len() as u32,
            physical_cores: system.physical_core_count().unwrap_or(0) as u32,
            model_name: system
                .cpus()
                .first()
                .map(|cpu| cpu.brand().to_string())
                .unwrap_or_default(),
        };
        Ok(serde_json::to_value(data)?)
    }
}

pub struct MemoryCollector {
    system: Arc<RwLock<System>>,
}

impl MemoryCollector {
    pub fn new(system: Arc<RwLock<System>>) -> Self {
        Self { system }
    }
}

#[async_trait]
impl Collector for MemoryCollector {
    fn metric_type(&self) -> MetricType {
        MetricType::Memory
    }

    async fn collect(&self) -> AgentResult<serde_json::Value> {
        let mut system = self.system.write().await;
        system.refresh_memory();

        let total = system.total_memory();
        let used = system.used_memory();
        let data = MemoryData {
            total,
            used,
            free: system.free_memory(),
            available: system.available_memory(),
            usage_percent: if total > 0 {
                used as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            swap_total: system.total_swap(),
            swap_used: system.used_swap(),
            swap_free: system.free_swap(),
        };
        Ok(serde_json::to_value(data)?)
    }
}

pub struct HostCollector {
    system: Arc<RwLock<System>>,
}

impl HostCollector {
    pub fn new(system: Arc<RwLock<System>>) -> Self {
        Self { system }
    }
}

#[async_trait]
impl Collector for HostCollector {
    fn metric_type(&self) -> MetricType {
        MetricType::Host
    }

    async fn collect(&self) -> AgentResult<serde_json::Value> {
        let mut system = self.system.write().await;
        system.refresh_all();

        let data = HostInfoData {
            os: std::env::consts::OS.to_string(),
            platform: System::name().unwrap_or_default(),
            platform_version: System::os_version().unwrap_or_default(),
            kernel_version: System::kernel_version().unwrap_or_default(),
            kernel_arch: std::env::consts::ARCH.to_string(),
            uptime: System::uptime(),
            boot_time: System::boot_time(),
            procs: system.processes().len() as u64,
        };
        Ok(serde_json::to_value(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cpu_collector_produces_payload() {
        let collector = CpuCollector::new(shared_system());
        let value = collector.collect().await.unwrap();
        let data: CpuData = serde_json::from_value(value).unwrap();

        assert!(data.usage_percent >= 0.0);
        assert!(data.logical_cores > 0);
    }

    #[tokio::test]
    async fn test_memory_collector_produces_payload() {
        let collector = MemoryCollector::new(shared_system());
        let value = collector.collect().await.unwrap();
        let data: MemoryData = serde_json::from_value(value).unwrap();

        assert!(data.total > 0);
        assert!(data.used <= data.total);
        assert!(data.usage_percent >= 0.0 && data.usage_percent <= 100.0);
    }

    #[tokio::test]
    async fn test_host_collector_produces_payload() {
        let collector = HostCollector::new(shared_system());
        let value = collector.collect().await.unwrap();
        let data: HostInfoData = serde_json::from_value(value).unwrap();

        assert!(!data.os.is_empty());
        assert!(!data.kernel_arch.is_empty());
    }
}
