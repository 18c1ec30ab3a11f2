mod agent;
mod alert;
mod host_metric;
mod latest;
mod monitor;
mod series;
mod tamper;
mod traffic;

pub use agent::{Agent, AgentStatus};
pub use alert::{AlertLevel, AlertRecord};
pub use host_metric::HostMetric;
pub use latest::{
    CpuMetric, DiskSummary, GpuMetric, LatestMetrics, MemoryMetric, NetworkConnectionMetric,
    NetworkSummary, TemperatureMetric,
};
pub use monitor::{MonitorAgentStat, MonitorStats, MonitorStatus};
pub use series::{MetricDataPoint, MetricSeries, MetricsResponse};
pub use tamper::{TamperEvent, TamperOperation, TamperProtectConfig};
pub use traffic::{ThresholdCrossing, TrafficObservation, TrafficStats};
