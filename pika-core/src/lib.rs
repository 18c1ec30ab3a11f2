pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod metric_names;
pub mod models;
pub mod repo;
pub mod services;
pub mod storage;
pub mod telemetry;
pub mod transport;

pub use cache::TtlCache;
pub use config::{
    DatabaseSettings, LoggingSettings, PikaConfig, StorageSettings, TamperSettings,
};
pub use db::{init_database, Database, DatabaseConfig, DatabaseError};
pub use error::{PikaError, PikaResult};
pub use models::{
    Agent, AgentStatus, AlertLevel, AlertRecord, CpuMetric, DiskSummary, GpuMetric, HostMetric,
    LatestMetrics, MemoryMetric, MetricDataPoint, MetricSeries, MetricsResponse, MonitorAgentStat,
    MonitorStats, MonitorStatus, NetworkConnectionMetric, NetworkSummary, TamperEvent,
    TamperOperation, TamperProtectConfig, TemperatureMetric, ThresholdCrossing,
    TrafficObservation, TrafficStats,
};
pub use repo::{
    AgentRepository, AlertRepository, HostMetricRepository, Repository, TamperEventRepository,
};
pub use services::{
    align_time_range_to_bucket, format_bytes, MetricIngestService, MetricQueryService,
    QueryDefinition, TamperService, TrafficService,
};
pub use storage::{
    decode_sample, MetricPoint, QueryData, ResultSeries, TimeSeriesStore, VictoriaMetricsStore,
};
pub use telemetry::init_tracing;
pub use transport::AgentTransport;
