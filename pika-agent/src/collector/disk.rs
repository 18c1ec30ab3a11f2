use async_trait::async_trait;
use sysinfo::Disks;

use pika_protocol::{DiskData, MetricType};

use crate::collector::Collector;
use crate::error::AgentResult;

/// Pseudo-filesystem mounts that are noise on every box. Only consulted when
/// no explicit include list is configured.
const EXCLUDED_MOUNT_PREFIXES: &[&str] = &["/proc", "/sys", "/dev", "/run", "/snap", "/var/lib/docker"];

pub struct DiskCollector {
    include: Vec<String>,
}

impl DiskCollector {
    /// `include` limits reporting to the given mount points; empty means
    /// every real filesystem.
    pub fn new(include: Vec<String>) -> Self {
        Self { include }
    }

    fn included(&self, mount_point: &str) -> bool {
        if !self.include.is_empty() {
            return self.include.iter().any(|m| m == mount_point);
        }
        !EXCLUDED_MOUNT_PREFIXES
            .iter()
            .any(|prefix| mount_point.starts_with(prefix))
    }
}

#[async_trait]
impl Collector for DiskCollector {
    fn metric_type(&self) -> MetricType {
        MetricType::Disk
    }

    async fn collect(&self) -> AgentResult<serde_json::Value> {
        let disks = Disks::new_with_refreshed_list();
        let mut out = Vec::new();

        for disk in disks.list() {
            let mount_point = disk.mount_point().to_string_lossy().into_owned();
            if !self.included(&mount_point) {
                continue;
            }
            let total = disk.total_space();
            if total == 0 {
                continue;
            }
            let free = disk.available_space();
            let used = total.saturating_sub(free);

            out.push(DiskData {
                mount_point,
                device: disk.name().to_string_lossy().into_owned(),
                fstype: disk.file_system().to_string_lossy().into_owned(),
                total,
                used,
                free,
                usage_percent: used as f64 / total as f64 * 100.0,
            });
        }

        out.sort_by(|a, b| a.mount_point.cmp(&b.mount_point));
        Ok(serde_json::to_value(out)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_list_wins_over_exclusions() {
        let collector = DiskCollector::new(vec!["/run/media/usb".to_string()]);
        assert!(collector.included("/run/media/usb"));
        assert!(!collector.included("/"));
    }

    #[test]
    fn test_default_exclusions() {
        let collector = DiskCollector::new(Vec::new());
        assert!(collector.included("/"));
        assert!(collector.included("/home"));
        assert!(!collector.included("/proc/self"));
        assert!(!collector.included("/dev/shm"));
        assert!(!collector.included("/snap/core/1234"));
    }

    #[tokio::test]
    async fn test_collect_produces_list_payload() {
        let collector = DiskCollector::new(Vec::new());
        let value = collector.collect().await.unwrap();
        let data: Vec<DiskData> = serde_json::from_value(value).unwrap();

        for disk in &data {
            assert!(disk.total > 0);
            assert!(disk.used <= disk.total);
            assert!(disk.usage_percent <= 100.0);
        }
    }
}
